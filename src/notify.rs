use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    Success,
    Error,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Fire-and-forget notification sink. The shell owns toast lifecycle; the
/// engine only reports outcomes.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Default sink for shells that have not wired a toast surface yet.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => tracing::info!(notice = message, "notify"),
            NoticeKind::Error => tracing::warn!(notice = message, "notify"),
        }
    }
}
