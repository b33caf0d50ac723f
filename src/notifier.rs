// Transient user-facing notifications

use crate::config::NotificationConfig;
use std::collections::VecDeque;
use tracing::debug;

/// How a notification is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Success => "check-circle",
            Severity::Error => "exclamation-circle",
            Severity::Warning => "exclamation-triangle",
            Severity::Info => "info-circle",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Severity::Success => "#10b981",
            Severity::Error => "#ef4444",
            Severity::Warning => "#f59e0b",
            Severity::Info => "#6366f1",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Lifecycle stage of a posted notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Visible,
    /// Exit transition running; removed once it finishes
    Leaving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub posted_at_ms: i64,
}

/// Queue of on-screen notifications driven by an external millisecond clock
#[derive(Debug)]
pub struct Notifier {
    settings: NotificationConfig,
    active: VecDeque<Notification>,
    next_id: u64,
}

impl Notifier {
    pub fn new(settings: NotificationConfig) -> Self {
        Self {
            settings,
            active: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Post a notification, evicting the oldest when the cap is reached
    pub fn notify(&mut self, message: impl Into<String>, severity: Severity, now_ms: i64) -> u64 {
        let cap = self.settings.max_visible;
        while cap > 0 && self.active.len() >= cap {
            if let Some(evicted) = self.active.pop_front() {
                debug!(id = evicted.id, "Evicted notification over cap");
            }
        }

        let id = self.next_id;
        self.next_id += 1;

        let notification = Notification {
            id,
            message: message.into(),
            severity,
            posted_at_ms: now_ms,
        };
        debug!(id, %severity, message = %notification.message, "Posted notification");
        self.active.push_back(notification);
        id
    }

    /// Stage of a notification at `now_ms`; `None` once it should be gone
    pub fn phase_of(&self, notification: &Notification, now_ms: i64) -> Option<Phase> {
        phase_at(&self.settings, notification, now_ms)
    }

    /// Drop every notification whose exit transition has finished
    pub fn tick(&mut self, now_ms: i64) -> Vec<Notification> {
        let settings = &self.settings;
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .active
            .drain(..)
            .partition(|n| phase_at(settings, n, now_ms).is_none());
        self.active = kept.into();
        expired
    }

    /// Notifications still on screen, oldest first
    pub fn visible(&self, now_ms: i64) -> Vec<(&Notification, Phase)> {
        self.active
            .iter()
            .filter_map(|n| self.phase_of(n, now_ms).map(|phase| (n, phase)))
            .collect()
    }

    /// Remove a notification early; a no-op if it is already gone
    pub fn dismiss(&mut self, id: u64) -> bool {
        match self.active.iter().position(|n| n.id == id) {
            Some(index) => {
                self.active.remove(index);
                true
            }
            None => false,
        }
    }

    /// Take every pending notification, oldest first
    pub fn drain(&mut self) -> Vec<Notification> {
        self.active.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

fn phase_at(settings: &NotificationConfig, notification: &Notification, now_ms: i64) -> Option<Phase> {
    let age = now_ms.saturating_sub(notification.posted_at_ms);
    let display = i64::try_from(settings.display_ms).unwrap_or(i64::MAX);
    let exit = i64::try_from(settings.exit_ms).unwrap_or(i64::MAX);

    if age < display {
        Some(Phase::Visible)
    } else if age < display.saturating_add(exit) {
        Some(Phase::Leaving)
    } else {
        None
    }
}
