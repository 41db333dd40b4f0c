#![forbid(unsafe_code)]

pub mod config;
pub mod error;

pub mod codec;

pub mod intake;
pub mod minify;
pub mod package;
pub mod progress;
pub mod session;
pub mod stats;

// Re-exports: stable API surface
pub use config::Config;
pub use intake::{Blob, SourceFile, collect_blobs};
pub use minify::{BlockComments, Minifier, minify};
pub use package::{BUNDLE_NAME, Download, artifact_name};
pub use progress::ProgressStatus;
pub use session::{CompressionResult, Session};
pub use stats::{SizeSummary, format_size};
