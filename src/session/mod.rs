//! Streaming recording session
//!
//! One logical session against the recording server:
//! - channel lifecycle (connect, reconnect after unexpected drops,
//!   deliberate close after a final result)
//! - the two transcript tracks (source text, translated text)
//! - audio frame batching and upload cadence
//!
//! The state machine in [`state`] is pure and event-driven; [`runner`]
//! binds it to a real WebSocket, microphone and timers.

mod reconnect;
mod runner;
mod state;
mod transcript;

pub use reconnect::ReconnectPolicy;
pub use runner::{RunnerConfig, SessionOutcome, SessionRunner};
pub use state::{Action, ChannelState, Session, SessionEvent, SessionParams, Status};
pub use transcript::TranscriptBuffer;
