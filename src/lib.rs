// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;
pub mod worker;
pub mod coordinator;

// Public exports for external consumers
pub use core::{BatchItem, CoordinatorConfig, EncodedImage, Outcome, Progress, TranscodeResult};
pub use coordinator::{BatchSettings, Coordinator};
pub use utils::{CompressorError, CompressorResult, ImageFormat};

// This library file is the public API of the crate.
// The command-line entry point is in main.rs.
