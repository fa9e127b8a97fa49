/*!
 * Async byte-stream body for an export.
 *
 * The export itself is synchronous. `stream_export` runs it on a blocking
 * thread and hands the produced bytes to async code through a bounded
 * channel, so a slow consumer applies back-pressure to the export and a
 * dropped consumer stops it at the next write.
 */

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::ExportError;

use super::streaming::{ExportStats, StreamingOutput};

/// Sink that forwards every write as one chunk over a bounded channel
pub struct ChannelWriter {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "export body was dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `output` on the blocking pool and expose its bytes as a stream.
///
/// `capacity` is the number of chunks that may be in flight before the export
/// waits for the consumer. Must be called from within a tokio runtime.
pub fn stream_export<O>(output: O, capacity: usize) -> ExportBody
where
    O: StreamingOutput + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter::new(tx);
        output.write(&mut writer)
    });

    ExportBody {
        rx,
        task: Some(task),
        stats: None,
    }
}

/// Stream of TMX bytes produced by a running export.
///
/// Yields chunks as they are written. A failed export ends the stream with
/// its error as the last item.
pub struct ExportBody {
    rx: mpsc::Receiver<Bytes>,
    task: Option<JoinHandle<Result<ExportStats, ExportError>>>,
    stats: Option<ExportStats>,
}

impl ExportBody {
    /// Statistics of the export, available once the stream has ended successfully
    pub fn stats(&self) -> Option<ExportStats> {
        self.stats
    }

    /// Drain the stream into memory
    pub async fn collect_to_vec(mut self) -> Result<(Vec<u8>, ExportStats), ExportError> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok((bytes, self.stats.unwrap_or_default()))
    }
}

impl Stream for ExportBody {
    type Item = Result<Bytes, ExportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(chunk) = ready!(this.rx.poll_recv(cx)) {
            return Poll::Ready(Some(Ok(chunk)));
        }

        // Channel closed: the export has returned, collect its outcome once
        let Some(task) = this.task.as_mut() else {
            return Poll::Ready(None);
        };
        let joined = ready!(Pin::new(task).poll(cx));
        this.task = None;

        match joined {
            Ok(Ok(stats)) => {
                debug!("Export body complete: {}", stats);
                this.stats = Some(stats);
                Poll::Ready(None)
            }
            Ok(Err(error)) => Poll::Ready(Some(Err(error))),
            Err(join_error) => Poll::Ready(Some(Err(ExportError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("export task failed: {}", join_error),
            ))))),
        }
    }
}
