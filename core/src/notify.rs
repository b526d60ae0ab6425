use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing outcome, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Drops notices after logging them at debug level.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "notice");
    }
}

/// Keeps every notice in memory, in order.
#[derive(Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all notices collected so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut notices| std::mem::take(&mut *notices))
            .unwrap_or_default()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
