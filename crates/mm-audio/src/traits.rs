//! Audio sink trait and error types.

use mm_ir::Frame;

/// Error type for the audio boundary. Failures here are fatal to the
/// unit; there is nothing to play into.
#[derive(Debug)]
pub enum AudioError {
    /// No output device available
    NoDevice,
    /// Failed to initialize the device
    DeviceInit(String),
    /// Failed to create the stream
    StreamCreate(String),
    /// Playback error
    Playback(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoDevice => write!(f, "no audio device available"),
            AudioError::DeviceInit(msg) => write!(f, "device init error: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "stream create error: {}", msg),
            AudioError::Playback(msg) => write!(f, "playback error: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// An audio sink consuming rendered frames in blocks.
pub trait AudioOutput {
    /// Device sample rate.
    fn sample_rate(&self) -> u32;

    /// Queue a block of frames, blocking (spinning) until there is room.
    fn write_block(&mut self, frames: &[Frame]);

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}
