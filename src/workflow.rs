/// Download workflow: URL -> permission gate -> fetch -> display -> persist
///
/// The workflow owns the URL field, the permission flow and photo storage,
/// and drives the screen through the [`Surface`] it was built with. The only
/// suspension point is the image fetch, which is split into `begin_fetch`
/// (synchronous, returns the load future) and `finish_fetch` (synchronous,
/// consumes the result) so a UI event loop can run the future as a task.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, StorageError, WorkflowError};
use crate::fetch::{ImageLoader, LoadFuture};
use crate::state::data::{DecodedImage, ImageRequest};
use crate::state::permission::{
    PermissionFlow, PermissionGate, PermissionOutcome, PermissionPrompt, PermissionState,
};
use crate::state::url_field::UrlField;
use crate::storage::{PhotoStorage, SavedImage};

/// Confirmation shown after a successful write
pub const SAVED_MESSAGE: &str = "Saved to Photos";

/// The parts of the screen the workflow updates
pub trait Surface {
    /// Show or hide the progress indicator
    fn set_progress_visible(&mut self, visible: bool);

    /// Render a decoded image
    fn show_image(&mut self, image: &DecodedImage);

    /// Transient, non-fatal notification
    fn notify(&mut self, message: &str);
}

/// What to do after the Download button was pressed
pub enum DownloadStep {
    /// Blank URL; nothing happens
    Skipped,
    /// Permission is in place; run this fetch and pass its result to `finish_fetch`
    Fetch(LoadFuture),
    /// Await the user's answer and pass it to `permission_result`
    AwaitPermission(PermissionPrompt),
    /// A permission request is already on screen
    PermissionPending,
}

impl std::fmt::Debug for DownloadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStep::Skipped => f.write_str("Skipped"),
            DownloadStep::Fetch(_) => f.write_str("Fetch"),
            DownloadStep::AwaitPermission(_) => f.write_str("AwaitPermission"),
            DownloadStep::PermissionPending => f.write_str("PermissionPending"),
        }
    }
}

pub struct DownloadWorkflow<S: Surface> {
    loader: Arc<dyn ImageLoader>,
    gate: Box<dyn PermissionGate>,
    storage: PhotoStorage,
    surface: S,
    url: UrlField,
    permission: PermissionFlow<ImageRequest>,
    /// Parent of every fetch's token; cancelled when the workflow is dropped
    scope: CancellationToken,
    in_flight: usize,
}

impl<S: Surface> DownloadWorkflow<S> {
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        gate: Box<dyn PermissionGate>,
        storage: PhotoStorage,
        surface: S,
    ) -> Self {
        Self {
            loader,
            gate,
            storage,
            surface,
            url: UrlField::new(),
            permission: PermissionFlow::new(),
            scope: CancellationToken::new(),
            in_flight: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn url_field(&self) -> &UrlField {
        &self.url
    }

    pub fn permission_state(&self) -> PermissionState {
        self.permission.state()
    }

    /// Number of fetches started but not finished
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// User edited the URL field
    pub fn set_url(&mut self, text: impl Into<String>) {
        self.url.set_text(text);
    }

    /// Whether the Download action is enabled for the current URL
    pub fn download_enabled(&self) -> bool {
        self.url.download_enabled()
    }

    /// Fill the URL field from the clipboard's text, if it has any
    pub fn paste_from_clipboard(&mut self, clip: Option<String>) -> bool {
        let pasted = self.url.paste(clip);
        if pasted {
            tracing::debug!("pasted URL from clipboard");
        }
        pasted
    }

    /// Download button pressed
    pub fn request_download(&mut self) -> DownloadStep {
        let Some(request) = self.url.request() else {
            tracing::debug!("download requested with blank URL, ignoring");
            return DownloadStep::Skipped;
        };
        self.ensure_storage_permission(request)
    }

    /// Run `request` once storage access is granted
    pub fn ensure_storage_permission(&mut self, request: ImageRequest) -> DownloadStep {
        match self.permission.ensure(self.gate.as_ref(), request) {
            PermissionOutcome::Granted(request) => DownloadStep::Fetch(self.begin_fetch(request)),
            PermissionOutcome::Requested(prompt) => DownloadStep::AwaitPermission(prompt),
            PermissionOutcome::Pending => DownloadStep::PermissionPending,
        }
    }

    /// The platform answered the permission request
    pub fn permission_result(&mut self, granted: bool) -> Option<LoadFuture> {
        let request = self.permission.resolve(granted)?;
        Some(self.begin_fetch(request))
    }

    /// Show progress and start loading `request`
    pub fn begin_fetch(&mut self, request: ImageRequest) -> LoadFuture {
        tracing::info!("⬇️ downloading {}", request.url());
        self.in_flight += 1;
        self.surface.set_progress_visible(true);
        self.loader.load(request, self.scope.child_token())
    }

    /// Consume a fetch result: display and save on success, report on failure.
    ///
    /// The progress indicator is hidden once no other fetch is running,
    /// whichever way this fetch ended.
    pub fn finish_fetch(
        &mut self,
        result: Result<DecodedImage, FetchError>,
    ) -> Result<Option<SavedImage>, WorkflowError> {
        self.in_flight = self.in_flight.saturating_sub(1);

        let outcome = match result {
            Ok(image) => {
                self.surface.show_image(&image);
                self.persist(image).map_err(WorkflowError::from)
            }
            Err(e) => Err(WorkflowError::from(e)),
        };

        if self.in_flight == 0 {
            self.surface.set_progress_visible(false);
        }

        match &outcome {
            Err(WorkflowError::Fetch(e)) if e.is_cancelled() => {
                tracing::debug!("fetch cancelled");
            }
            Err(e) => {
                tracing::warn!("download failed: {}", e);
                self.surface.notify(&e.to_string());
            }
            Ok(_) => {}
        }

        outcome
    }

    /// Write `image` to photo storage, confirming on success.
    /// A missing media store handle is silently dropped.
    pub fn persist(&mut self, image: DecodedImage) -> Result<Option<SavedImage>, StorageError> {
        let saved = self.storage.persist(image)?;
        if saved.is_some() {
            self.surface.notify(SAVED_MESSAGE);
        }
        Ok(saved)
    }

    /// Fetch, display and save in one go
    pub async fn fetch_and_display(
        &mut self,
        request: ImageRequest,
    ) -> Result<Option<SavedImage>, WorkflowError> {
        let load = self.begin_fetch(request);
        let result = load.await;
        self.finish_fetch(result)
    }

    /// Cancel every fetch still running
    pub fn cancel_all(&self) {
        self.scope.cancel();
    }
}

impl<S: Surface> Drop for DownloadWorkflow<S> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::fetch::HttpImageLoader;
    use crate::state::permission::tests::FakeGate;
    use crate::state::permission::PermissionStatus;
    use crate::storage::{FolderMediaStore, StorageLocation};
    use futures::future::FutureExt;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSurface {
        progress: bool,
        progress_changes: Vec<bool>,
        shown: Vec<(u32, u32)>,
        messages: Vec<String>,
    }

    impl Surface for RecordingSurface {
        fn set_progress_visible(&mut self, visible: bool) {
            self.progress = visible;
            self.progress_changes.push(visible);
        }

        fn show_image(&mut self, image: &DecodedImage) {
            self.shown.push((image.width(), image.height()));
        }

        fn notify(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }
    }

    /// Loader that answers every request with a scripted result
    struct ScriptedLoader {
        result: Mutex<Option<Result<DecodedImage, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLoader {
        fn new(result: Result<DecodedImage, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ImageLoader for ScriptedLoader {
        fn load(&self, _request: ImageRequest, _cancel: CancellationToken) -> LoadFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .result
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(FetchError::Network("no more responses".into())));
            async move { result }.boxed()
        }
    }

    /// Loader that only finishes when cancelled
    struct HangingLoader;

    impl ImageLoader for HangingLoader {
        fn load(&self, _request: ImageRequest, cancel: CancellationToken) -> LoadFuture {
            async move {
                cancel.cancelled().await;
                Err(FetchError::Cancelled)
            }
            .boxed()
        }
    }

    fn image() -> DecodedImage {
        DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 3, Rgb([1, 2, 3]))))
    }

    fn storage(root: &Path) -> PhotoStorage {
        PhotoStorage::new(
            StorageLocation::MediaStoreEntry,
            Box::new(FolderMediaStore::new(Some(root.to_path_buf()))),
            "Pictures",
            None,
        )
    }

    fn workflow(
        loader: Arc<dyn ImageLoader>,
        gate: FakeGate,
        root: &Path,
    ) -> DownloadWorkflow<RecordingSurface> {
        DownloadWorkflow::new(loader, Box::new(gate), storage(root), RecordingSurface::default())
    }

    fn saved_files(root: &Path) -> usize {
        std::fs::read_dir(root.join("Pictures"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_blank_url_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Ok(image()));
        let mut flow = workflow(loader.clone(), FakeGate::new(PermissionStatus::Granted, true), root.path());

        flow.set_url("   ");
        assert!(!flow.download_enabled());
        assert!(matches!(flow.request_download(), DownloadStep::Skipped));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert!(flow.surface().progress_changes.is_empty());
    }

    #[tokio::test]
    async fn test_success_displays_and_saves_once() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Ok(image()));
        let mut flow = workflow(loader, FakeGate::new(PermissionStatus::Granted, true), root.path());

        flow.set_url(" https://example.com/photo.png ");
        let DownloadStep::Fetch(load) = flow.request_download() else {
            panic!("expected the fetch to start immediately");
        };
        assert!(flow.surface().progress);

        let saved = flow.finish_fetch(load.await).unwrap().unwrap();

        let surface = flow.surface();
        assert_eq!(surface.shown, vec![(5, 3)]);
        assert_eq!(surface.messages, vec![SAVED_MESSAGE.to_string()]);
        assert!(!surface.progress);
        assert!(saved.path.exists());
        assert_eq!(saved_files(root.path()), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_reported_without_persist() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Err(FetchError::Network("connection reset by peer".into())));
        let mut flow = workflow(loader, FakeGate::new(PermissionStatus::Granted, true), root.path());

        let err = flow
            .fetch_and_display(ImageRequest::new("https://example.com/x.png").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Fetch(_)));
        let surface = flow.surface();
        assert!(!surface.progress);
        assert_eq!(surface.progress_changes, vec![true, false]);
        assert!(surface.shown.is_empty());
        assert_eq!(surface.messages.len(), 1);
        assert!(surface.messages[0].contains("connection reset by peer"));
        assert_eq!(saved_files(root.path()), 0);
    }

    #[tokio::test]
    async fn test_refused_connection_toast_names_cause() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let root = tempfile::tempdir().unwrap();
        let loader = Arc::new(HttpImageLoader::new(&Settings::default()).unwrap());
        let mut flow = workflow(loader, FakeGate::new(PermissionStatus::Granted, true), root.path());

        let request = ImageRequest::new(&format!("http://127.0.0.1:{port}/a.png")).unwrap();
        assert!(flow.fetch_and_display(request).await.is_err());

        let messages = &flow.surface().messages;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].to_lowercase().contains("refused"), "got {:?}", messages[0]);
        assert_eq!(saved_files(root.path()), 0);
    }

    #[tokio::test]
    async fn test_permission_requested_then_granted() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Ok(image()));
        let gate = FakeGate::new(PermissionStatus::Unknown, true);
        let requests = gate.requests.clone();
        let mut flow = workflow(loader.clone(), gate, root.path());

        flow.set_url("https://example.com/a.jpg");
        let DownloadStep::AwaitPermission(prompt) = flow.request_download() else {
            panic!("expected a permission request");
        };
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);

        let load = flow.permission_result(prompt.await).expect("granted should fetch");
        flow.finish_fetch(load.await).unwrap();

        assert_eq!(flow.permission_state(), PermissionState::Granted);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(saved_files(root.path()), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_halts() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Ok(image()));
        let mut flow = workflow(loader.clone(), FakeGate::new(PermissionStatus::Unknown, false), root.path());

        flow.set_url("https://example.com/a.jpg");
        let DownloadStep::AwaitPermission(prompt) = flow.request_download() else {
            panic!("expected a permission request");
        };

        assert!(flow.permission_result(prompt.await).is_none());
        assert_eq!(flow.permission_state(), PermissionState::Denied);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
        assert!(flow.surface().messages.is_empty());
    }

    #[tokio::test]
    async fn test_missing_handle_is_silent() {
        let loader = ScriptedLoader::new(Ok(image()));
        let mut flow = DownloadWorkflow::new(
            loader,
            Box::new(FakeGate::new(PermissionStatus::Granted, true)),
            PhotoStorage::new(
                StorageLocation::MediaStoreEntry,
                Box::new(FolderMediaStore::new(None)),
                "Pictures",
                None,
            ),
            RecordingSurface::default(),
        );

        let saved = flow
            .fetch_and_display(ImageRequest::new("https://example.com/a.jpg").unwrap())
            .await
            .unwrap();

        assert!(saved.is_none());
        assert_eq!(flow.surface().shown.len(), 1);
        assert!(flow.surface().messages.is_empty());
        assert!(!flow.surface().progress);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_is_silent() {
        let root = tempfile::tempdir().unwrap();
        let mut flow = workflow(
            Arc::new(HangingLoader),
            FakeGate::new(PermissionStatus::Granted, true),
            root.path(),
        );

        let load = flow.begin_fetch(ImageRequest::new("https://example.com/slow.jpg").unwrap());
        flow.cancel_all();
        let result = load.await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(flow.finish_fetch(result).is_err());
        assert!(flow.surface().messages.is_empty());
        assert!(!flow.surface().progress);
    }

    #[tokio::test]
    async fn test_overlapping_fetches_keep_progress_until_last() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Ok(image()));
        let mut flow = workflow(loader, FakeGate::new(PermissionStatus::Granted, true), root.path());

        let first = flow.begin_fetch(ImageRequest::new("https://example.com/1.jpg").unwrap());
        let second = flow.begin_fetch(ImageRequest::new("https://example.com/2.jpg").unwrap());
        assert_eq!(flow.in_flight(), 2);

        // second request was not de-duplicated; it got its own (failing) response
        let _ = flow.finish_fetch(second.await);
        assert!(flow.surface().progress);

        flow.finish_fetch(first.await).unwrap();
        assert!(!flow.surface().progress);
        assert_eq!(flow.in_flight(), 0);
    }

    #[test]
    fn test_paste_populates_field() {
        let root = tempfile::tempdir().unwrap();
        let loader = ScriptedLoader::new(Ok(image()));
        let mut flow = workflow(loader, FakeGate::new(PermissionStatus::Granted, true), root.path());

        flow.set_url("old");
        assert!(!flow.paste_from_clipboard(None));
        assert_eq!(flow.url_field().text(), "old");

        assert!(flow.paste_from_clipboard(Some(" https://example.com/new.png ".into())));
        assert_eq!(flow.url_field().text(), "https://example.com/new.png");
    }
}
