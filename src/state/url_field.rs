/// URL text field state
///
/// Tracks the raw text the user typed or pasted and whether the
/// Download action is currently enabled.
use super::data::ImageRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlField {
    text: String,
}

impl UrlField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw text, exactly as shown in the input
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text (user typed into the field)
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Download is enabled iff the trimmed text is non-empty
    pub fn download_enabled(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Validated request for the current text, None if blank
    pub fn request(&self) -> Option<ImageRequest> {
        ImageRequest::new(&self.text)
    }

    /// Populate the field from clipboard contents.
    ///
    /// The clip is trimmed; an absent or blank clip leaves the field unchanged.
    /// Returns true when the field was updated.
    pub fn paste(&mut self, clip: Option<String>) -> bool {
        let Some(clip) = clip else {
            return false;
        };
        let trimmed = clip.trim();
        // keep what the user typed rather than blanking it
        if trimmed.is_empty() {
            return false;
        }
        self.text = trimmed.to_string();
        true
    }
}
