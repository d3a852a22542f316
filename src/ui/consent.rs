/// Storage permission through native dialogs
///
/// Desktop systems have no runtime permission for the Pictures folder, so
/// the app asks the user once per session before writing there. The answer
/// is kept in memory only.
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rfd::{AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};

use crate::state::permission::{PermissionGate, PermissionPrompt, PermissionStatus};

const UNKNOWN: u8 = 0;
const GRANTED: u8 = 1;
const DENIED: u8 = 2;

/// Session-scoped consent to save into the pictures folder
#[derive(Debug, Clone)]
pub struct ConsentGate {
    consent: Arc<AtomicU8>,
    destination: Option<PathBuf>,
    ask: bool,
}

impl ConsentGate {
    /// `ask = false` treats the permission as already granted
    pub fn new(destination: Option<PathBuf>, ask: bool) -> Self {
        Self {
            consent: Arc::new(AtomicU8::new(UNKNOWN)),
            destination,
            ask,
        }
    }

    fn remember(consent: &AtomicU8, granted: bool) {
        consent.store(if granted { GRANTED } else { DENIED }, Ordering::SeqCst);
    }

    fn question(&self) -> String {
        match &self.destination {
            Some(dir) => format!("Allow Image Downloader to save images to {}?", dir.display()),
            None => "Allow Image Downloader to save images to your Pictures folder?".to_string(),
        }
    }
}

impl PermissionGate for ConsentGate {
    fn status(&self) -> PermissionStatus {
        if !self.ask {
            return PermissionStatus::Granted;
        }
        match self.consent.load(Ordering::SeqCst) {
            GRANTED => PermissionStatus::Granted,
            DENIED => PermissionStatus::DeniedNeedsRationale,
            _ => PermissionStatus::Unknown,
        }
    }

    fn explain(&self, title: &str, message: &str) -> BoxFuture<'static, ()> {
        let title = title.to_string();
        let message = message.to_string();
        async move {
            AsyncMessageDialog::new()
                .set_level(MessageLevel::Info)
                .set_title(title)
                .set_description(message)
                .set_buttons(MessageButtons::Ok)
                .show()
                .await;
        }
        .boxed()
    }

    fn request(&self) -> PermissionPrompt {
        let consent = self.consent.clone();
        let question = self.question();
        async move {
            let answer = AsyncMessageDialog::new()
                .set_level(MessageLevel::Info)
                .set_title("Save to Photos")
                .set_description(question)
                .set_buttons(MessageButtons::YesNo)
                .show()
                .await;
            let granted = matches!(answer, MessageDialogResult::Yes | MessageDialogResult::Ok);
            Self::remember(&consent, granted);
            granted
        }
        .boxed()
    }
}
