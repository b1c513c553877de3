//! Image processing: host codec access, capability probes, degrade pass and the pipeline.
//!
//! # Architecture
//!
//! - [`codec`]: the [`RasterCodec`] seam and the `image`-crate backed [`NativeCodec`].
//! - [`capability`]: memoised encoder probes and the avif → webp → jpeg fallback chain.
//! - [`degrade`]: degrade-mode dimensions, posterization and noise.
//! - [`transcoder`]: the pipeline a worker runs for each request.

pub mod codec;
pub mod capability;
pub mod degrade;
pub mod transcoder;

pub use codec::{EncodedBlob, NativeCodec, RasterCodec};
pub use capability::{fallback_chain, FormatSupport};
pub use transcoder::Transcoder;
