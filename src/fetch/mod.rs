/// Image fetching module
///
/// This module handles:
/// - The `ImageLoader` seam the workflow fetches through
/// - An HTTP implementation backed by reqwest, decoding with the image crate

pub mod loader;

pub use loader::{HttpImageLoader, ImageLoader, LoadFuture};
