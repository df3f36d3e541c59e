pub mod cli;
pub mod config;
pub mod cookies;
pub mod core;
pub mod extractors;
pub mod utils;

pub use crate::core::{Downloader, QualityPolicy, RawManifest, SelectionResult, StreamDescriptor};
pub use crate::extractors::DriveExtractor;
