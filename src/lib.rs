/// Image Downloader: paste an image URL, preview it, save it to Photos.
///
/// The screen is an iced application (see `main.rs`); everything it drives
/// lives here so it can be tested without a window.

pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod state;
pub mod storage;
pub mod ui;
pub mod workflow;

pub use workflow::{DownloadStep, DownloadWorkflow, Surface};
