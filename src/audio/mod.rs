pub mod archive;
pub mod capture;
pub mod queue;
pub mod resample;

pub use archive::WavArchive;
pub use capture::{CaptureConfig, MicCapture};
pub use queue::FrameQueue;
pub use resample::{downsample_to_pcm16, pcm16_to_bytes, quantize, TARGET_SAMPLE_RATE};
