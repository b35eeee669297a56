//! CLI session engine.
//!
//! A [`CliSession`] runs the mode state machine of a
//! [`DriverDefinition`](crate::platform::DriverDefinition) over a
//! [`Channel`](crate::channel::Channel): login and elevation macros, paged
//! commands, interactive viewers and prompt locking.

mod normalize;
mod response;
mod session;
mod state;
mod transcript;

pub use response::Response;
pub use session::{CliSession, CommandOptions, SessionSettings};
pub use state::{ModeTracker, SessionState};
pub use transcript::{Direction, MASK, Transcript, TranscriptEntry};
