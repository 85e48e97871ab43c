//! Recording domain module

mod file_name;
mod media;
mod session;

pub use file_name::{local_now, output_file_name, timestamp_stem};
pub use media::{
    human_readable_size, Codec, Container, MediaBlob, MediaChunk, DEFAULT_BITS_PER_SECOND,
};
pub use session::{InvalidStateTransition, RecorderState, RecordingSession};
