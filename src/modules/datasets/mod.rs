//! Input dataset management: locate, download, unzip and clean up the files
//! each stage reads from its data directory.

pub mod downloader;
pub mod files;

pub use downloader::DatasetDownloader;
pub use files::{find_files, remove_stage_dir, stage_dir};
