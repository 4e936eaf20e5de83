//! User-visible notices (toasts) raised by the backend.
//!
//! Every notice is kept in a bounded history for polling clients and fanned
//! out on a broadcast channel for live listeners.

use chrono::Utc;
use log::{info, warn};
use shared::{Notice, NoticeLevel};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const HISTORY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct NotificationCenter {
    history: Arc<Mutex<VecDeque<Notice>>>,
    next_id: Arc<AtomicU64>,
    sender: broadcast::Sender<Notice>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            history: Arc::new(Mutex::new(VecDeque::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            sender,
        }
    }

    /// Auto-dismissing informational notice
    pub fn info(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Info, message.into(), false)
    }

    pub fn warning(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Warning, message.into(), false)
    }

    /// Error that stays visible until `clear_persistent` is called
    pub fn persistent_error(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Error, message.into(), true)
    }

    pub fn error(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Error, message.into(), false)
    }

    fn push(&self, level: NoticeLevel, message: String, persistent: bool) -> Notice {
        let notice = Notice {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            level,
            message,
            persistent,
            created_at: Utc::now().to_rfc3339(),
        };

        match level {
            NoticeLevel::Error | NoticeLevel::Warning => warn!("🔔 {:?} notice: {}", level, notice.message),
            NoticeLevel::Info => info!("🔔 Notice: {}", notice.message),
        }

        if let Ok(mut history) = self.history.lock() {
            history.push_back(notice.clone());
            // Persistent notices stay until cleared; evict the oldest transient one.
            while history.len() > HISTORY_LIMIT {
                match history.iter().position(|n| !n.persistent) {
                    Some(index) => {
                        history.remove(index);
                    }
                    None => {
                        history.pop_front();
                    }
                }
            }
        }

        // No receivers is fine; polling clients read the history.
        let _ = self.sender.send(notice.clone());
        notice
    }

    /// Notices in the order they were raised
    pub fn recent(&self) -> Vec<Notice> {
        self.history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop persistent notices once the condition behind them is gone
    pub fn clear_persistent(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.retain(|n| !n.persistent);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}
