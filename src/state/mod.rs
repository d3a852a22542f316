/// State management module
///
/// This module holds the screen's data model:
/// - Requests and decoded images that flow through a download (data.rs)
/// - The URL text field and its enabled/disabled Download action (url_field.rs)
/// - The storage permission state machine (permission.rs)

pub mod data;
pub mod permission;
pub mod url_field;
