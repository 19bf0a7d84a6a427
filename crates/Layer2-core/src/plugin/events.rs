//! Lifecycle Events - extension load / unload 알림

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

// ============================================================================
// LifecycleEvent
// ============================================================================

/// 라이프사이클 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    Loaded,
    LoadFailed,
    Unloaded,
    UnloadFailed,
}

impl std::fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::LoadFailed => write!(f, "load_failed"),
            Self::Unloaded => write!(f, "unloaded"),
            Self::UnloadFailed => write!(f, "unload_failed"),
        }
    }
}

/// 라이프사이클 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,

    /// extension path
    pub path: String,

    /// 요약 또는 에러 메시지
    pub detail: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleKind, path: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            detail,
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// LifecycleBus
// ============================================================================

/// 라이프사이클 이벤트 발행 (구독자 + 최근 히스토리)
pub struct LifecycleBus {
    sender: broadcast::Sender<LifecycleEvent>,
    history: RwLock<Vec<LifecycleEvent>>,
    history_size: usize,
}

impl LifecycleBus {
    pub fn new() -> Self {
        Self::with_capacity(256, 100)
    }

    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            sender,
            history: RwLock::new(Vec::with_capacity(history_size)),
            history_size,
        }
    }

    /// 이벤트 발행 (구독자가 없어도 OK)
    pub fn publish(&self, event: LifecycleEvent) {
        debug!("lifecycle event: {} {}", event.kind, event.path);

        {
            let mut history = self.history.write();
            if history.len() >= self.history_size {
                history.remove(0);
            }
            history.push(event.clone());
        }

        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    pub fn history(&self) -> Vec<LifecycleEvent> {
        self.history.read().clone()
    }

    pub fn history_for(&self, path: &str) -> Vec<LifecycleEvent> {
        self.history
            .read()
            .iter()
            .filter(|event| event.path == path)
            .cloned()
            .collect()
    }
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new()
    }
}
