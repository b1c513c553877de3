mod runtime;
mod protocol;
mod error;

pub use runtime::WorkerHandle;
pub use protocol::{ControlMessage, InitStatus, TranscodeReply, WorkerCommand, WorkerEvent};
pub use error::{WorkerError, WorkerResult};
