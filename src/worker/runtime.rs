//! The worker thread.
//!
//! A worker is one OS thread that owns a [`Transcoder`] and handles one command at a
//! time. Every request it receives is answered exactly once, even if the pipeline
//! panics. A supervisor around the whole loop turns any fault outside a request into a
//! diagnostic reply and keeps serving.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::core::TranscodeRequest;
use crate::processing::{RasterCodec, Transcoder};
use crate::utils::{CompressorError, CompressorResult};
use super::error::{WorkerError, WorkerResult};
use super::protocol::{ControlMessage, InitStatus, TranscodeReply, WorkerCommand, WorkerEvent};

const WORKER_THREAD_NAME: &str = "transcode-worker";

/// Owning handle to a running worker thread.
///
/// Dropping the handle asks the worker to shut down once its current request is done.
#[derive(Debug)]
pub struct WorkerHandle {
    commands: Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Starts a worker that posts everything it produces into `events`.
    pub fn spawn(codec: Arc<dyn RasterCodec>, events: UnboundedSender<WorkerEvent>) -> WorkerResult<Self> {
        let (commands, inbox) = crossbeam_channel::unbounded();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(codec, inbox, events))?;

        debug!("Worker thread spawned");
        Ok(Self {
            commands,
            thread: Some(thread),
        })
    }

    /// Queues a command. Fails only if the worker thread is gone.
    pub fn post(&self, command: WorkerCommand) -> WorkerResult<()> {
        self.commands.send(command).map_err(|_| WorkerError::Disconnected)
    }

    /// Whether the worker thread is still alive.
    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Asks the worker to stop. In-flight work is not preempted; the thread exits after it.
    pub fn terminate(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.thread.take().is_some() {
            // Already-dead workers have dropped their inbox
            let _ = self.commands.send(WorkerCommand::Shutdown);
            debug!("Worker shutdown requested");
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Worker thread body ────────────────────────────────────────────────────────────

fn run(codec: Arc<dyn RasterCodec>, inbox: Receiver<WorkerCommand>, events: UnboundedSender<WorkerEvent>) {
    let init_error = self_check(codec.as_ref()).err().map(|e| e.to_string());
    let status = match &init_error {
        None => InitStatus::ready("Worker ready"),
        Some(err) => InitStatus::failed(err.clone()),
    };
    if events.send(WorkerEvent::Control(ControlMessage::Init(status))).is_err() {
        return;
    }

    let mut transcoder = Transcoder::new(codec);

    loop {
        let served = panic::catch_unwind(AssertUnwindSafe(|| {
            serve(&mut transcoder, &inbox, &events, init_error.as_deref())
        }));

        match served {
            Ok(()) => break,
            Err(payload) => {
                let message = format!("Unhandled worker fault: {}", panic_message(payload.as_ref()));
                error!("{message}");
                if events.send(WorkerEvent::Reply(TranscodeReply::failure(None, message))).is_err() {
                    break;
                }
            }
        }
    }

    debug!("Worker thread exiting");
}

/// Verifies the host provides every primitive the pipeline needs.
fn self_check(codec: &dyn RasterCodec) -> CompressorResult<()> {
    let missing = codec.missing_primitives();
    if missing.is_empty() {
        info!("Worker initialized");
        return Ok(());
    }

    let err = CompressorError::capability(format!(
        "Host is missing required primitives: {}",
        missing.join(", ")
    ));
    error!("Worker initialization failed: {err}");
    Err(err)
}

/// Handles commands until shutdown or until either channel closes.
fn serve(
    transcoder: &mut Transcoder,
    inbox: &Receiver<WorkerCommand>,
    events: &UnboundedSender<WorkerEvent>,
    init_error: Option<&str>,
) {
    while let Ok(command) = inbox.recv() {
        let event = match command {
            WorkerCommand::Shutdown => break,
            WorkerCommand::Transcode(request) => {
                WorkerEvent::Reply(handle(transcoder, &request, init_error))
            }
            WorkerCommand::Test(request) => {
                WorkerEvent::Control(ControlMessage::Test(handle(transcoder, &request, init_error)))
            }
        };

        if events.send(event).is_err() {
            warn!("Coordinator went away, stopping worker");
            break;
        }
    }
}

/// Produces exactly one reply for `request`.
fn handle(transcoder: &mut Transcoder, request: &TranscodeRequest, init_error: Option<&str>) -> TranscodeReply {
    let id = Some(request.correlation_id.clone());

    if let Some(err) = init_error {
        return TranscodeReply::failure(id, format!("Worker not initialized: {err}"));
    }

    match panic::catch_unwind(AssertUnwindSafe(|| transcoder.transcode(request))) {
        Ok(Ok(image)) => TranscodeReply::success(request, image),
        Ok(Err(e)) => {
            debug!("[{}] transcode failed: {}", request.correlation_id, e);
            TranscodeReply::failure(id, e.to_string())
        }
        Err(payload) => {
            let message = format!("Image processing failed: {}", panic_message(payload.as_ref()));
            warn!("[{}] {}", request.correlation_id, message);
            TranscodeReply::failure(id, message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
