/// Storage permission state machine
///
/// Writing to the shared pictures folder is gated by a single permission.
/// The platform answers asynchronously, so the continuation that should run
/// once access is granted is parked in a single pending slot until the answer
/// arrives. At most one request is outstanding at a time.
use futures::future::{BoxFuture, FutureExt};

/// What the platform reports before anything is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Access already granted
    Granted,
    /// The user declined before; explain why before asking again
    DeniedNeedsRationale,
    /// Never asked
    Unknown,
}

/// Where the flow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    NotRequested,
    Requested,
    Granted,
    Denied,
}

/// Future resolving to the user's answer to a platform request
pub type PermissionPrompt = BoxFuture<'static, bool>;

/// Platform permission subsystem
pub trait PermissionGate {
    /// Query the current permission state without prompting
    fn status(&self) -> PermissionStatus;

    /// Explanatory dialog shown before asking a user who declined earlier
    fn explain(&self, title: &str, message: &str) -> BoxFuture<'static, ()>;

    /// Issue the platform request. The future resolves with the answer.
    fn request(&self) -> PermissionPrompt;
}

/// Result of [`PermissionFlow::ensure`]
pub enum PermissionOutcome<C> {
    /// Already granted: run the continuation now
    Granted(C),
    /// A request was issued; await it and feed the answer to `resolve`
    Requested(PermissionPrompt),
    /// A request is already outstanding; the continuation replaced the parked one
    Pending,
}

impl<C> std::fmt::Debug for PermissionOutcome<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionOutcome::Granted(_) => f.write_str("Granted"),
            PermissionOutcome::Requested(_) => f.write_str("Requested"),
            PermissionOutcome::Pending => f.write_str("Pending"),
        }
    }
}

pub const RATIONALE_TITLE: &str = "Storage permission";
pub const RATIONALE_MESSAGE: &str =
    "Image Downloader needs access to your Pictures folder to save downloaded images.";

#[derive(Debug)]
pub struct PermissionFlow<C> {
    state: PermissionState,
    pending: Option<C>,
}

impl<C> Default for PermissionFlow<C> {
    fn default() -> Self {
        Self {
            state: PermissionState::NotRequested,
            pending: None,
        }
    }
}

impl<C> PermissionFlow<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Make sure storage access is granted before running `on_granted`.
    ///
    /// - granted: the continuation is handed straight back, no request is issued
    /// - declined before: rationale dialog, then request
    /// - never asked: request
    pub fn ensure<G: PermissionGate + ?Sized>(&mut self, gate: &G, on_granted: C) -> PermissionOutcome<C> {
        if self.pending.is_some() {
            self.pending = Some(on_granted);
            return PermissionOutcome::Pending;
        }

        let prompt = match gate.status() {
            PermissionStatus::Granted => {
                self.state = PermissionState::Granted;
                return PermissionOutcome::Granted(on_granted);
            }
            PermissionStatus::DeniedNeedsRationale => {
                tracing::debug!("storage permission declined earlier, showing rationale");
                let explain = gate.explain(RATIONALE_TITLE, RATIONALE_MESSAGE);
                let request = gate.request();
                async move {
                    explain.await;
                    request.await
                }
                .boxed()
            }
            PermissionStatus::Unknown => gate.request(),
        };

        self.state = PermissionState::Requested;
        self.pending = Some(on_granted);
        PermissionOutcome::Requested(prompt)
    }

    /// Feed the platform's answer. Returns the parked continuation if granted.
    pub fn resolve(&mut self, granted: bool) -> Option<C> {
        let pending = self.pending.take();
        if pending.is_none() {
            tracing::warn!("permission answer arrived with no request outstanding");
            return None;
        }

        if granted {
            tracing::info!("storage permission granted");
            self.state = PermissionState::Granted;
            pending
        } else {
            tracing::info!("storage permission denied, download halted");
            self.state = PermissionState::Denied;
            None
        }
    }
}
