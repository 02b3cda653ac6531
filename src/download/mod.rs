//! Downloading feed media into stream directories.

pub mod media;

pub use media::{Downloader, HttpDownloader};
