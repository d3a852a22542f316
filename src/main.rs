use std::sync::Arc;
use std::time::{Duration, Instant};

use iced::widget::{button, column, container, image, row, text, text_input, Column};
use iced::{Alignment, Element, Length, Subscription, Task, Theme};

use image_downloader::config::Settings;
use image_downloader::error::FetchError;
use image_downloader::fetch::HttpImageLoader;
use image_downloader::logging;
use image_downloader::state::data::DecodedImage;
use image_downloader::storage::PhotoStorage;
use image_downloader::ui::consent::ConsentGate;
use image_downloader::ui::screen::Screen;
use image_downloader::{DownloadStep, DownloadWorkflow};

/// How often toasts are checked for expiry while any are showing
const TOAST_TICK: Duration = Duration::from_millis(250);

/// Main application state
struct ImageDownloader {
    workflow: DownloadWorkflow<Screen>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User edited the URL field
    UrlChanged(String),
    /// User clicked "Paste"
    PastePressed,
    /// Clipboard contents arrived
    ClipboardRead(Option<String>),
    /// User clicked "Download" (or pressed Enter in the field)
    DownloadPressed,
    /// The storage permission prompt was answered
    PermissionAnswered(bool),
    /// Background fetch completed
    FetchFinished(Result<DecodedImage, FetchError>),
    /// Expire old toasts
    Tick,
}

impl ImageDownloader {
    /// Create a new instance of the application
    fn new(settings: Settings, loader: HttpImageLoader) -> (Self, Task<Message>) {
        let storage = PhotoStorage::from_settings(&settings);
        let gate = ConsentGate::new(storage.destination(), settings.ask_permission);
        let screen = Screen::new(Duration::from_millis(settings.toast_millis));

        let workflow = DownloadWorkflow::new(Arc::new(loader), Box::new(gate), storage, screen);
        tracing::info!("🎨 Image Downloader ready");

        (ImageDownloader { workflow }, Task::none())
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::UrlChanged(text) => {
                self.workflow.set_url(text);
                Task::none()
            }
            Message::PastePressed => iced::clipboard::read().map(Message::ClipboardRead),
            Message::ClipboardRead(clip) => {
                self.workflow.paste_from_clipboard(clip);
                Task::none()
            }
            Message::DownloadPressed => match self.workflow.request_download() {
                DownloadStep::Fetch(load) => Task::perform(load, Message::FetchFinished),
                DownloadStep::AwaitPermission(prompt) => {
                    Task::perform(prompt, Message::PermissionAnswered)
                }
                DownloadStep::Skipped | DownloadStep::PermissionPending => Task::none(),
            },
            Message::PermissionAnswered(granted) => match self.workflow.permission_result(granted) {
                Some(load) => Task::perform(load, Message::FetchFinished),
                None => Task::none(),
            },
            Message::FetchFinished(result) => {
                // failures were already reported on screen
                let _ = self.workflow.finish_fetch(result);
                Task::none()
            }
            Message::Tick => {
                self.workflow.surface_mut().toasts.expire(Instant::now());
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let screen = self.workflow.surface();
        let field = self.workflow.url_field();

        let url_row = row![
            text_input("Paste or type an image URL", field.text())
                .on_input(Message::UrlChanged)
                .on_submit(Message::DownloadPressed)
                .padding(10),
            button("Paste")
                .on_press(Message::PastePressed)
                .padding(10),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let download = button("Download")
            .on_press_maybe(
                self.workflow
                    .download_enabled()
                    .then_some(Message::DownloadPressed),
            )
            .padding(10);

        let status = if screen.progress_visible() {
            text("Downloading…").size(16)
        } else {
            text("").size(16)
        };

        let caption = match screen.image_size() {
            Some((width, height)) => text(format!("{} × {}", width, height)).size(14),
            None => text("").size(14),
        };

        let preview: Element<Message> = match screen.image() {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("No image yet").size(16))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        let toasts: Column<Message> = screen
            .toasts
            .iter()
            .fold(column![].spacing(6), |col, toast| {
                col.push(container(text(toast.message.clone()).size(14)).padding(8))
            });

        let content: Column<Message> = column![
            text("Image Downloader").size(32),
            url_row,
            download,
            status,
            preview,
            caption,
            toasts,
        ]
        .spacing(16)
        .padding(24)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.workflow.surface().toasts.is_empty() {
            Subscription::none()
        } else {
            iced::time::every(TOAST_TICK).map(|_| Message::Tick)
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    let settings = Settings::load();

    // The app cannot do anything without an HTTP client
    let loader = HttpImageLoader::new(&settings)
        .expect("Failed to initialize HTTP client. Check TLS support on this system.");

    iced::application("Image Downloader", ImageDownloader::update, ImageDownloader::view)
        .subscription(ImageDownloader::subscription)
        .theme(ImageDownloader::theme)
        .centered()
        .run_with(move || ImageDownloader::new(settings, loader))
}
