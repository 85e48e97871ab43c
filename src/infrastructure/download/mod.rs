//! Download sink adapters

mod directory;

pub use directory::DirectoryDownloadSink;
