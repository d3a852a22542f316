/// User interface module
///
/// - Screen state the workflow draws onto (screen.rs)
/// - Toast queue (toast.rs)
/// - Native consent dialogs for the storage permission (consent.rs)

pub mod consent;
pub mod screen;
pub mod toast;
