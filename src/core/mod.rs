//! Core types and configuration.
//!
//! This module contains the fundamental types used throughout the crate:
//! - [`TranscodeRequest`]: one unit of work for the worker
//! - [`TranscodeResult`]: the outcome of one request
//! - [`BatchItem`]: an input to batch processing
//! - [`Progress`]: progress tracking for batch operations
//! - [`CoordinatorConfig`]: timeouts and remote conversion settings

mod types;
mod task;
mod progress;
mod config;

pub use types::{EncodedImage, Outcome, TranscodeResult};
pub use task::{BatchItem, TranscodeRequest, TEST_PIXEL_PNG, new_correlation_id};
pub use progress::{Progress, ProgressType};
pub use config::{
    CoordinatorConfig, RemoteConfig, DEFAULT_AVIF_ENDPOINT, DEFAULT_REMOTE_TIMEOUT_MS,
    DEFAULT_WORKER_TIMEOUT_MS, REMOTE_MAX_PAYLOAD_BYTES,
};
