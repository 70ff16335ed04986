//! User-facing notices (the dashboard's toasts).
//!
//! The session layer never renders anything. It hands [`Notice`] values to
//! a [`Notifier`] and the host decides how to show them.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity, for styling.
    pub level: NoticeLevel,
    /// Short heading (`"Success"`, `"Error"`, `"Info"`).
    pub title: String,
    /// The sentence shown to the user.
    pub message: String,
}

impl Notice {
    /// A neutral notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, "Info", message)
    }

    /// A notice for a completed action.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, "Success", message)
    }

    /// A notice for a failed action.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, "Error", message)
    }

    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// A sink for notices.
///
/// Called synchronously from session operations; implementations should
/// hand the notice off rather than block.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => {
                tracing::warn!(title = %notice.title, "{}", notice.message);
            }
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(title = %notice.title, "{}", notice.message);
            }
        }
    }
}

/// Forwards notices over a channel, e.g. to a UI task.
impl Notifier for mpsc::UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        // A closed receiver means nobody is listening anymore.
        let _ = self.send(notice);
    }
}
