//! Two ways of chaining processing stages over a finite, in-memory sequence:
//! lazy pull-based iteration ([`pull`]) and push-based listener fan-out
//! ([`push`]). The [`Engine`] drives either kind of pipeline to completion.

mod engine;
mod error;
pub mod pull;
pub mod push;
mod sink;

pub use engine::{Engine, EngineBuilder, EngineSource, PullDriver};
pub use error::{PipelineError, Result};
pub use pull::{Merge, Producer, Pull, Transform};
pub use push::{Listener, NodeState, Receiver, RegistrationPolicy};
pub use sink::{Journal, Printer, Recorder, Sink};
