// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, debug, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use tmxstream::app_config::{self, Config};
use tmxstream::database::{DatabaseConnection, Repository, TransMemoryRecord, TransMemorySource};
use tmxstream::locale::LocaleId;
use tmxstream::model::Corpus;
use tmxstream::tmx::{stream_export, ExportBody, ExportCancellation, ExportOptions, TmxStreamingOutput};
use tmxstream::validation::{
    enabled_rule_ids, error_rule_ids, DefaultValidationService, ValidationService,
};

/// Chunks buffered between the export task and the output writer
const EXPORT_CHANNEL_CAPACITY: usize = 16;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export documents or translation memories as TMX
    Export(ExportArgs),

    /// Import a JSON corpus into a translation memory
    Import(ImportArgs),

    /// Run translation validations over a JSON corpus
    Validate(ValidateArgs),

    /// List stored translation memories
    List,

    /// Delete a stored translation memory
    Delete {
        /// Slug of the translation memory
        #[arg(long)]
        tm: String,
    },

    /// Generate shell completions for tmxstream
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// JSON corpus to export; translation memories are exported when omitted
    #[arg(long, conflicts_with = "tm")]
    corpus: Option<PathBuf>,

    /// Translation memory to export (repeatable, default: all)
    #[arg(long)]
    tm: Vec<String>,

    /// Only export translations into this locale (e.g., 'es', 'fr-CA')
    #[arg(short, long)]
    target_locale: Option<String>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// JSON corpus to import
    #[arg(long)]
    corpus: PathBuf,

    /// Slug of the translation memory, created when missing
    #[arg(long)]
    tm: String,

    /// Display name used when the translation memory is created
    #[arg(long)]
    name: Option<String>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// JSON corpus to validate
    #[arg(long)]
    corpus: PathBuf,

    /// Locale of the translations to validate
    #[arg(long)]
    locale: String,

    /// Project whose rule states apply
    #[arg(long)]
    project: String,

    /// Project version whose rule states override the project's
    #[arg(long)]
    version: Option<String>,
}

/// tmxstream - Streaming TMX export
///
/// Exports translation documents and stored translation memories as TMX 1.4
/// without holding the exported content in memory.
#[derive(Parser, Debug)]
#[command(name = "tmxstream")]
#[command(version)]
#[command(about = "Streaming TMX export for translation memories")]
#[command(long_about = "tmxstream writes translation documents and translation memories as TMX 1.4.

EXAMPLES:
    tmxstream export --corpus docs.json -o all.tmx          # Export every translation
    tmxstream export --corpus docs.json -t es -o es.tmx     # Export Spanish translations only
    tmxstream import --corpus docs.json --tm my-tm          # Store a corpus in a translation memory
    tmxstream export --tm my-tm -o my-tm.tmx                # Export a stored translation memory
    tmxstream validate --corpus docs.json --locale es --project web
    tmxstream completions bash > tmxstream.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }
    
    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "‚ùå ",
            Level::Warn => "üöß ",
            Level::Info => " ",
            Level::Debug => "üîç ",
            Level::Trace => "üìã ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            
            let mut stderr = std::io::stderr();
            let _ = match record.level() {
                Level::Error => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr, 
                        "\x1B[1;31m{} {} {}\x1B[0m", 
                        now, emoji, record.args()
                    )
                },
                Level::Warn => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr, 
                        "\x1B[1;33m{} {} {}\x1B[0m", 
                        now, emoji, record.args()
                    )
                },
                Level::Info => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr, 
                        "\x1B[1;32m{} {} {}\x1B[0m", 
                        now, emoji, record.args()
                    )
                },
                Level::Debug => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr, 
                        "\x1B[1;36m{} {} {}\x1B[0m", 
                        now, emoji, record.args()
                    )
                },
                Level::Trace => {
                    let emoji = Self::get_emoji_for_level(record.level());
                    writeln!(
                        stderr, 
                        "\x1B[1;35m{} {} {}\x1B[0m", 
                        now, emoji, record.args()
                    )
                },
            };
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "tmxstream", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config_path, cli.log_level.clone())?;

    match cli.command {
        Commands::Export(args) => run_export(args, &config).await,
        Commands::Import(args) => run_import(args, &config).await,
        Commands::Validate(args) => run_validate(args, &config),
        Commands::List => run_list(&config).await,
        Commands::Delete { tm } => run_delete(&tm, &config).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load or create the configuration, apply the CLI log level and validate
fn load_config(config_path: &str, cli_log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config.save(config_path)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    // Update log level in config if specified via command line
    if let Some(log_level) = cli_log_level {
        config.log_level = log_level.into();
    }

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    // Just update the max level without reinitializing the logger
    log::set_max_level(config.log_level.to_level_filter());

    Ok(config)
}

fn load_corpus(path: &Path) -> Result<Corpus> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {:?}", path))?;
    Corpus::from_json(&json)
        .with_context(|| format!("Failed to parse corpus file: {:?}", path))
}

fn open_database(config: &Config) -> Result<DatabaseConnection> {
    DatabaseConnection::new(config.resolved_database_path()?)
}

async fn run_export(args: ExportArgs, config: &Config) -> Result<()> {
    let target_locale = args.target_locale.as_deref()
        .map(LocaleId::new)
        .transpose()
        .context("Invalid target locale")?;
    let options = ExportOptions::from(&config.export);
    let (canceller, cancellation) = ExportCancellation::channel();

    let body = match &args.corpus {
        Some(path) => {
            let corpus = load_corpus(path)?;
            info!("Exporting {} documents from {:?}", corpus.documents.len(), path);
            let output = TmxStreamingOutput::new(corpus, target_locale)
                .with_options(options)
                .with_cancellation(cancellation);
            stream_export(output, EXPORT_CHANNEL_CAPACITY)
        }
        None => {
            let db = open_database(config)?;
            let source = if args.tm.is_empty() {
                TransMemorySource::all(db, config.export.page_size)?
            } else {
                TransMemorySource::new(db, args.tm.clone(), config.export.page_size)
            };
            info!("Exporting translation memories: {}", source.slugs().join(", "));
            let output = TmxStreamingOutput::new(source, target_locale)
                .with_options(options)
                .with_cancellation(cancellation);
            stream_export(output, EXPORT_CHANNEL_CAPACITY)
        }
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling export");
            canceller.cancel();
        }
    });

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)
            .with_context(|| format!("Failed to create output file: {:?}", path))?),
        None => Box::new(std::io::stdout().lock()),
    };

    let progress = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner} [{elapsed_precise}] {bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    progress.set_style(style);
    progress.set_message("Exporting TMX");
    progress.enable_steady_tick(Duration::from_millis(100));

    match copy_body(body, sink, &progress).await {
        Ok(stats) => {
            progress.finish_with_message(format!("Exported {}", stats));
            if let Some(path) = &args.output {
                info!("Success: {:?}", path);
            }
            Ok(())
        }
        Err(e) => {
            progress.abandon_with_message("Export failed");
            error!("Export failed: {:#}", e);
            Err(e)
        }
    }
}

/// Drain the export stream into the sink
async fn copy_body(
    mut body: ExportBody,
    mut sink: Box<dyn Write>,
    progress: &ProgressBar,
) -> Result<tmxstream::ExportStats> {
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).context("Failed to write export output")?;
        progress.inc(chunk.len() as u64);
    }
    sink.flush().context("Failed to flush export output")?;

    body.stats().ok_or_else(|| anyhow!("Export ended without statistics"))
}

async fn run_import(args: ImportArgs, config: &Config) -> Result<()> {
    let corpus = load_corpus(&args.corpus)?;
    let repository = Repository::new(open_database(config)?);

    if repository.get_trans_memory(&args.tm).await?.is_none() {
        let name = args.name.clone().unwrap_or_else(|| args.tm.clone());
        info!("Creating translation memory '{}'", args.tm);
        repository.create_trans_memory(&TransMemoryRecord::new(&args.tm, name)).await?;
    }

    let stats = repository.import_documents(&args.tm, &corpus.documents).await?;
    info!("Success: {}", stats);
    Ok(())
}

fn run_validate(args: ValidateArgs, config: &Config) -> Result<()> {
    let corpus = load_corpus(&args.corpus)?;
    let locale = LocaleId::new(&args.locale).context("Invalid locale")?;
    let service = DefaultValidationService::new(config.validation.clone());

    let actions = match &args.version {
        Some(version) => service.get_validation_actions_for_version(&args.project, version),
        None => service.get_validation_actions(&args.project),
    };
    debug!("Active validations: {:?}", actions);

    let report: BTreeMap<_, _> = service
        .run_validations_full_report(&corpus, &enabled_rule_ids(&actions), &locale)?
        .into_iter()
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);

    let failing: Vec<String> = service
        .run_validations(&corpus, &error_rule_ids(&actions), &locale)?
        .into_iter()
        .filter(|(_, has_error)| *has_error)
        .map(|(doc_id, _)| doc_id)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    if failing.is_empty() {
        info!("No validation errors for {}", locale);
        return Ok(());
    }

    for doc_id in &failing {
        error!("Validation errors in {}", doc_id);
    }
    Err(anyhow!("{} documents failed validation", failing.len()))
}

async fn run_list(config: &Config) -> Result<()> {
    let repository = Repository::new(open_database(config)?);

    for tm in repository.list_trans_memories().await? {
        println!("{}\t{}", tm.slug, tm.name);
    }
    info!("{}", repository.connection().stats()?);
    Ok(())
}

async fn run_delete(slug: &str, config: &Config) -> Result<()> {
    let repository = Repository::new(open_database(config)?);

    if !repository.delete_trans_memory(slug).await? {
        return Err(anyhow!("Translation memory not found: {}", slug));
    }
    info!("Deleted translation memory '{}'", slug);
    Ok(())
}
