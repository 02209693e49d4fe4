//! The coordinating loop.
//!
//! One task owns the [`Dispatcher`] and handles every inbound frame and
//! every background completion in arrival order. A reader task turns the
//! byte stream into JSON frames, a writer task serializes everything that
//! goes out, and the workspace walk and slow-path jobs run on the blocking
//! pool.

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::codec::{FrameReader, FrameWriter};
use crate::dispatch::{Dispatcher, ReindexResult, SlowPathResult, Step};
use crate::protocol::{Response, error_codes};

const INBOUND_CHANNEL_CAPACITY: usize = 64;

const WRITER_CHANNEL_CAPACITY: usize = 64;

const COMPLETION_CHANNEL_CAPACITY: usize = 4;

enum Completion {
    Reindex(ReindexResult),
    SlowPath(SlowPathResult),
}

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// `exit` after a completed `shutdown`.
    AfterShutdown,
    /// `exit` without `shutdown` first.
    WithoutShutdown,
    /// The input closed or became unreadable.
    EndOfInput,
}

impl Exit {
    /// Process exit code expected by LSP clients.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::AfterShutdown => 0,
            Self::WithoutShutdown | Self::EndOfInput => 1,
        }
    }
}

/// Serve one client over `input`/`output` until `exit` or end of input.
pub async fn run<R, W>(input: R, output: W, mut dispatcher: Dispatcher) -> Result<Exit>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
    let writer_handle = tokio::spawn(async move {
        let mut writer = FrameWriter::new(output);
        while let Some(cmd) = writer_rx.recv().await {
            match cmd {
                WriterCommand::Send(frame) => {
                    if let Err(e) = writer.write_frame(&frame).await {
                        warn!("Write error: {e:#}");
                        break;
                    }
                }
                WriterCommand::Shutdown => break,
            }
        }
    });

    let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
    let reader_writer_tx = writer_tx.clone();
    let max_frame_bytes = dispatcher.config().max_frame_bytes;
    let reader_handle = tokio::spawn(async move {
        let mut reader = FrameReader::with_max_frame_bytes(input, max_frame_bytes);
        loop {
            match reader.read_frame().await {
                Ok(Some(body)) => match serde_json::from_slice::<serde_json::Value>(&body) {
                    Ok(frame) => {
                        if inbound_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Unparseable frame: {e}");
                        let response = Response::error(
                            serde_json::Value::Null,
                            error_codes::PARSE_ERROR,
                            format!("Parse error: {e}"),
                        );
                        if let Ok(frame) = serde_json::to_value(response) {
                            let _ = reader_writer_tx.send(WriterCommand::Send(frame)).await;
                        }
                    }
                },
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    warn!("Read error: {e:#}");
                    break;
                }
            }
        }
    });

    let (done_tx, mut done_rx) = mpsc::channel::<Completion>(COMPLETION_CHANNEL_CAPACITY);

    let exit = loop {
        let step = tokio::select! {
            frame = inbound_rx.recv() => match frame {
                Some(frame) => dispatcher.handle_frame(&frame),
                None => break Exit::EndOfInput,
            },
            Some(done) = done_rx.recv() => match done {
                Completion::Reindex(result) => dispatcher.finish_reindex(result),
                Completion::SlowPath(result) => dispatcher.finish_slow_path(result),
            },
        };

        let Step {
            outgoing,
            reindex,
            slow_path,
            exit,
        } = step;
        for message in outgoing {
            match message.to_frame() {
                Ok(frame) => {
                    if writer_tx.send(WriterCommand::Send(frame)).await.is_err() {
                        warn!("Writer closed");
                    }
                }
                Err(e) => warn!("Dropping unserializable message: {e}"),
            }
        }
        if let Some(job) = reindex {
            let done_tx = done_tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = Completion::Reindex(job.run());
                if done_tx.blocking_send(result).is_err() {
                    debug!("Reindex finished after the loop stopped");
                }
            });
        }
        if let Some(job) = slow_path {
            let engine = dispatcher.engine();
            let done_tx = done_tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = Completion::SlowPath(job.run(engine.as_ref()));
                if done_tx.blocking_send(result).is_err() {
                    debug!("Slow path finished after the loop stopped");
                }
            });
        }
        if exit {
            break if dispatcher.is_shut_down() {
                Exit::AfterShutdown
            } else {
                Exit::WithoutShutdown
            };
        }
    };

    info!(?exit, "Server loop stopped");
    reader_handle.abort();
    let _ = writer_tx.send(WriterCommand::Shutdown).await;
    let _ = writer_handle.await;
    Ok(exit)
}
