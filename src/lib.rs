pub mod audio;
pub mod config;
pub mod protocol;
pub mod session;
pub mod topics;

pub use audio::{FrameQueue, MicCapture, WavArchive, TARGET_SAMPLE_RATE};
pub use config::Config;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{
    Action, ChannelState, Session, SessionEvent, SessionOutcome, SessionParams, SessionRunner,
    Status, TranscriptBuffer,
};
pub use topics::{Topic, TopicDetail, TopicsClient};
