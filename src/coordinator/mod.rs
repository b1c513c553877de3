//! Processing coordinator: worker lifecycle, correlated calls, remote AVIF detour.

mod pending;
mod processor;
mod remote;

pub use pending::PendingCalls;
pub use processor::{BatchSettings, Coordinator};
pub use remote::{RemoteConverter, REMOTE_SUCCESS_MESSAGE};
