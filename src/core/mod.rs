pub mod downloader;
pub mod error;
pub mod metadata;
pub mod muxer;
pub mod selector;

pub use downloader::Downloader;
pub use error::DriveError;
pub use metadata::{QualityPolicy, RawManifest, SelectionResult, StreamDescriptor};
pub use muxer::{FfmpegMuxer, Muxer};
pub use selector::{classify_adaptive, select};
