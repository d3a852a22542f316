/// Screen state drawn by the app's view
///
/// This is the surface the download workflow writes to: the displayed
/// image, the progress flag and the toast queue.
use std::time::Duration;

use iced::widget::image::Handle;

use super::toast::Toasts;
use crate::state::data::DecodedImage;
use crate::workflow::Surface;

#[derive(Debug, Clone)]
pub struct Screen {
    image: Option<Handle>,
    image_size: Option<(u32, u32)>,
    progress_visible: bool,
    pub toasts: Toasts,
}

impl Screen {
    pub fn new(toast_duration: Duration) -> Self {
        Self {
            image: None,
            image_size: None,
            progress_visible: false,
            toasts: Toasts::new(toast_duration),
        }
    }

    pub fn image(&self) -> Option<&Handle> {
        self.image.as_ref()
    }

    /// Pixel size of the displayed image
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn progress_visible(&self) -> bool {
        self.progress_visible
    }
}

impl Surface for Screen {
    fn set_progress_visible(&mut self, visible: bool) {
        self.progress_visible = visible;
    }

    fn show_image(&mut self, image: &DecodedImage) {
        // last write wins when downloads overlap
        self.image = Some(Handle::from_rgba(
            image.width(),
            image.height(),
            image.rgba_pixels(),
        ));
        self.image_size = Some((image.width(), image.height()));
    }

    fn notify(&mut self, message: &str) {
        self.toasts.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn test_surface_updates() {
        let mut screen = Screen::new(Duration::from_secs(2));
        assert!(screen.image().is_none());

        screen.set_progress_visible(true);
        assert!(screen.progress_visible());

        let img = DecodedImage::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            6,
            4,
            Rgba([0, 0, 0, 255]),
        )));
        screen.show_image(&img);
        assert!(screen.image().is_some());
        assert_eq!(screen.image_size(), Some((6, 4)));

        screen.notify("Saved to Photos");
        assert_eq!(screen.toasts.len(), 1);
    }
}
