pub mod drive;
pub mod fallback;

pub use drive::{build_session, decode_manifest, DriveExtractor};
