//! HTTP access shared by the feed reader and the downloader.

pub mod client;

pub use client::HttpClient;
