//! The processing coordinator.
//!
//! Turns the worker's fire-and-forget message protocol into awaitable calls with
//! per-request correlation ids and timeouts, and adds the server-side AVIF detour.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::{
    new_correlation_id, BatchItem, CoordinatorConfig, Outcome, Progress, TranscodeRequest,
    TranscodeResult,
};
use crate::processing::{NativeCodec, RasterCodec};
use crate::utils::{CompressorError, CompressorResult, ImageFormat};
use crate::worker::{ControlMessage, InitStatus, WorkerCommand, WorkerEvent, WorkerHandle};
use super::pending::PendingCalls;
use super::remote::RemoteConverter;

/// Settings shared by every item of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    pub quality: u8,
    pub target_format: ImageFormat,
    pub degrade: bool,
}

struct ActiveWorker {
    handle: WorkerHandle,
    pending: PendingCalls,
    dispatcher: JoinHandle<()>,
}

/// Owns one worker and bridges its message protocol into async calls.
///
/// The worker is created lazily on first use and shared by all calls. Calls may be
/// issued concurrently; the worker still transcodes one request at a time.
pub struct Coordinator {
    config: CoordinatorConfig,
    codec: Arc<dyn RasterCodec>,
    remote: Option<RemoteConverter>,
    worker: Mutex<Option<ActiveWorker>>,
    init_status: Arc<Mutex<Option<InitStatus>>>,
}

impl Coordinator {
    /// Coordinator backed by the native codec.
    pub fn new(config: CoordinatorConfig) -> CompressorResult<Self> {
        Self::with_codec(config, Arc::new(NativeCodec::new()))
    }

    /// Coordinator backed by a custom host codec.
    pub fn with_codec(config: CoordinatorConfig, codec: Arc<dyn RasterCodec>) -> CompressorResult<Self> {
        let remote = if config.remote.enabled {
            info!("Server-side AVIF conversion enabled at {}", config.remote.endpoint);
            Some(RemoteConverter::new(config.remote.clone())?)
        } else {
            None
        };

        Ok(Self {
            config,
            codec,
            remote,
            worker: Mutex::new(None),
            init_status: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────────

    /// Starts the worker if none is running. A no-op when one already is.
    pub async fn init_worker(&self) -> CompressorResult<()> {
        self.worker_lock().await.map(|_| ())
    }

    /// Whether a live worker is attached.
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|w| w.handle.is_alive())
    }

    /// Terminates the worker. The next call creates a fresh one.
    ///
    /// Calls still waiting are rejected immediately; replies the old worker still
    /// produces are discarded.
    pub async fn dispose(&self) {
        let Some(active) = self.worker.lock().await.take() else {
            return;
        };

        debug!("Disposing worker");
        retire(active, "worker was disposed").await;
        *self.init_status.lock().await = None;
    }

    /// Last init status reported by the worker, if any.
    pub async fn init_status(&self) -> Option<InitStatus> {
        self.init_status.lock().await.clone()
    }

    /// Posts the built-in 1x1 self-test. The echo is logged, not returned.
    pub async fn test_worker(&self) -> CompressorResult<()> {
        let worker = self.worker_lock().await?;
        let active = worker.as_ref().ok_or_else(|| CompressorError::crashed("worker unavailable"))?;
        active.handle.post(WorkerCommand::Test(TranscodeRequest::create_test_request()))?;
        debug!("Test message sent to worker");
        Ok(())
    }

    /// Locks the worker slot, replacing a dead worker and spawning one if the slot is empty.
    async fn worker_lock(&self) -> CompressorResult<MutexGuard<'_, Option<ActiveWorker>>> {
        let mut worker = self.worker.lock().await;

        let stale = match worker.as_ref() {
            Some(active) => !active.handle.is_alive() || active.pending.is_closed().await,
            None => false,
        };
        if stale {
            warn!("Worker has stopped, replacing it");
            if let Some(old) = worker.take() {
                retire(old, "worker stopped responding").await;
            }
        }

        if worker.is_none() {
            *worker = Some(self.spawn_worker()?);
        }
        Ok(worker)
    }

    fn spawn_worker(&self) -> CompressorResult<ActiveWorker> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = WorkerHandle::spawn(Arc::clone(&self.codec), events_tx)?;
        let pending = PendingCalls::new();
        let dispatcher = tokio::spawn(dispatch_events(
            events_rx,
            pending.clone(),
            Arc::clone(&self.init_status),
        ));

        info!("Transcode worker started");
        Ok(ActiveWorker { handle, pending, dispatcher })
    }

    // ── Transcoding ──────────────────────────────────────────────────────────────

    /// Re-encodes one image.
    ///
    /// AVIF requests try the remote service first when it is enabled (and degrade mode is
    /// off); any remote failure falls through to the worker. Worker failure replies,
    /// worker crashes and timeouts reject the call with distinct errors.
    pub async fn transcode_one(
        &self,
        source_image: &str,
        quality: u8,
        target_format: ImageFormat,
        original_size: u64,
        degrade: bool,
    ) -> CompressorResult<TranscodeResult> {
        if target_format == ImageFormat::AVIF && !degrade {
            if let Some(remote) = &self.remote {
                match remote.convert(source_image, quality).await {
                    Ok(image) => {
                        debug!("Server-side AVIF conversion succeeded");
                        return Ok(TranscodeResult::success(new_correlation_id(), original_size, image));
                    }
                    Err(e) => warn!("Server-side AVIF failed, falling back to local processing: {e}"),
                }
            }
        }

        let request = TranscodeRequest::new(source_image, quality, target_format, original_size, degrade);
        let mut result = self.dispatch(request).await?;

        if target_format == ImageFormat::AVIF {
            if let Outcome::Success(image) = &mut result.outcome {
                if image.actual_format != ImageFormat::AVIF {
                    image.downgrade_notice = Some(format!(
                        "AVIF is not supported here, downgraded to {} format",
                        image.actual_format.as_str().to_uppercase()
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Sends `request` to the worker and waits for its reply, a worker crash, or the timeout.
    async fn dispatch(&self, request: TranscodeRequest) -> CompressorResult<TranscodeResult> {
        let id = request.correlation_id.clone();
        let original_size = request.original_size;

        // Register and post against the same worker, under one hold of the slot
        let (pending, listener) = {
            let mut worker = self.worker_lock().await?;
            let active = worker.as_ref().ok_or_else(|| CompressorError::crashed("worker unavailable"))?;
            let pending = active.pending.clone();
            let listener = pending.register(&id).await;

            if let Err(e) = active.handle.post(WorkerCommand::Transcode(request)) {
                pending.deregister(&id).await;
                if let Some(dead) = worker.take() {
                    retire(dead, "worker stopped responding").await;
                }
                return Err(e.into());
            }
            (pending, listener)
        };
        debug!("[{id}] posted to worker");

        let timeout = self.config.worker_timeout();
        match tokio::time::timeout(timeout, listener).await {
            Ok(Ok(Ok(reply))) => reply.into_result(original_size),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(CompressorError::crashed("worker dropped the call")),
            Err(_) => {
                pending.deregister(&id).await;
                warn!("[{id}] no reply within {} ms", timeout.as_millis());
                Err(CompressorError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Transcodes `items` one after another, in order.
    ///
    /// Failures become failure results rather than aborting the batch. After each item
    /// `on_item_done` receives its result and `on_progress` the cumulative progress.
    pub async fn transcode_many<P, D>(
        &self,
        items: Vec<BatchItem>,
        settings: BatchSettings,
        mut on_progress: P,
        mut on_item_done: D,
    ) -> Vec<TranscodeResult>
    where
        P: FnMut(Progress),
        D: FnMut(&TranscodeResult),
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        info!("Processing batch of {} images as {}", total, settings.target_format);

        for (idx, item) in items.into_iter().enumerate() {
            let outcome = self
                .transcode_one(&item.data, settings.quality, settings.target_format, item.original_size, settings.degrade)
                .await;

            let result = match outcome {
                Ok(result) => result.with_source_name(&item.name),
                Err(e) => {
                    warn!("Image processing failed for {}: {}", item.name, e);
                    TranscodeResult::failure(new_correlation_id(), item.original_size, e.to_string())
                        .with_source_name(&item.name)
                }
            };

            on_item_done(&result);

            let completed = idx + 1;
            let status = if completed == total { "complete" } else { "processing" };
            let mut progress = Progress::new(completed, total, status).with_task_id(&item.name);
            if let Some(error) = result.error_message() {
                progress = progress.with_error(error);
            }
            on_progress(progress);

            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!("Batch completed with {} failed items out of {}", failed, total);
        } else {
            info!("Batch completed successfully: {} images processed", total);
        }

        results
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(active) = self.worker.get_mut().take() {
            active.handle.terminate();
        }
    }
}

/// Stops the dispatcher, rejects whatever is still waiting, and asks the thread to exit.
async fn retire(active: ActiveWorker, reason: &str) {
    active.dispatcher.abort();
    let rejected = active.pending.fail_all(CompressorError::crashed(reason)).await;
    if rejected > 0 {
        debug!("Rejected {} pending calls: {}", rejected, reason);
    }
    active.handle.terminate();
}

/// Routes worker events to waiting calls until the worker's event stream closes.
async fn dispatch_events(
    mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    pending: PendingCalls,
    init_status: Arc<Mutex<Option<InitStatus>>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Reply(reply) => match reply.id.clone() {
                Some(id) => {
                    if !pending.resolve(reply).await {
                        debug!("[{id}] dropping reply with no waiting call");
                    }
                }
                None => warn!(
                    "Worker diagnostic: {}",
                    reply.error.as_deref().unwrap_or("unspecified fault")
                ),
            },
            WorkerEvent::Control(ControlMessage::Init(status)) => {
                if status.success {
                    debug!("Worker initialization successful: {}", status.message.as_deref().unwrap_or(""));
                } else {
                    error!("Worker initialization failed: {}", status.error.as_deref().unwrap_or(""));
                }
                *init_status.lock().await = Some(status);
            }
            WorkerEvent::Control(ControlMessage::Test(reply)) => {
                info!(
                    "Worker test response: success={} format={:?} size={:?} error={:?}",
                    reply.success, reply.format, reply.size, reply.error
                );
            }
        }
    }

    let rejected = pending.fail_all(CompressorError::crashed("worker stopped responding")).await;
    if rejected > 0 {
        warn!("Worker exited with {} calls pending", rejected);
    }
}
