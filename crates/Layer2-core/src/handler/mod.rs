//! Handler Bus - 이벤트 종류별 핸들러 목록
//!
//! 각 이벤트 종류마다 priority 오름차순으로 정렬된 핸들러를 보관합니다.
//! 같은 priority 끼리는 등록 순서를 유지합니다.

use async_trait::async_trait;
use hangar_foundation::{EventKind, HostEvent, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 기본 핸들러 priority
pub const DEFAULT_PRIORITY: i32 = 50;

// ============================================================================
// EventHandler Trait
// ============================================================================

/// 이벤트 핸들러
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &HostEvent) -> Result<()>;
}

/// 동기 클로저 기반 핸들러
pub struct FnHandler<F>(F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&HostEvent) -> Result<()> + Send + Sync,
{
    async fn handle(&self, event: &HostEvent) -> Result<()> {
        (self.0)(event)
    }
}

/// 클로저를 핸들러로 감싸기
pub fn handler_fn<F>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(&HostEvent) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

// ============================================================================
// HandlerBus
// ============================================================================

/// 핸들러를 등록한 extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOwner {
    /// 모듈 이름 (path 의 마지막 segment)
    pub module: String,

    /// extension path
    pub path: String,
}

impl HandlerOwner {
    pub fn new(module: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            path: path.into(),
        }
    }
}

/// 버스에 등록된 핸들러
#[derive(Clone)]
pub struct PluggableHandler {
    pub handler: Arc<dyn EventHandler>,
    pub priority: i32,
    pub owner: HandlerOwner,
}

/// 핸들러 버스
#[derive(Default)]
pub struct HandlerBus {
    pluggables: RwLock<HashMap<EventKind, Vec<PluggableHandler>>>,
}

impl HandlerBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 핸들러 등록
    pub fn register(
        &self,
        handler: Arc<dyn EventHandler>,
        kind: EventKind,
        priority: i32,
        owner: HandlerOwner,
    ) {
        debug!("registering {} handler for {} (priority {})", kind, owner.path, priority);

        let mut pluggables = self.pluggables.write();
        let list = pluggables.entry(kind).or_default();
        list.push(PluggableHandler {
            handler,
            priority,
            owner,
        });
        // sort_by_key 는 stable
        list.sort_by_key(|entry| entry.priority);
    }

    /// path 가 소유한 핸들러 전부 제거
    pub fn remove_owned_by(&self, path: &str) -> usize {
        let mut pluggables = self.pluggables.write();
        let mut removed = 0;
        for list in pluggables.values_mut() {
            let before = list.len();
            list.retain(|entry| entry.owner.path != path);
            removed += before - list.len();
        }
        removed
    }

    /// path 가 소유한 핸들러 수
    pub fn count_owned_by(&self, path: &str) -> usize {
        self.pluggables
            .read()
            .values()
            .flat_map(|list| list.iter())
            .filter(|entry| entry.owner.path == path)
            .count()
    }

    /// 이벤트 종류별 핸들러 (호출 순서)
    pub fn handlers_for(&self, kind: EventKind) -> Vec<PluggableHandler> {
        self.pluggables
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pluggables.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 이벤트 전달, 성공한 핸들러 수 반환
    ///
    /// 핸들러 에러는 로그만 남기고 다음 핸들러로 진행합니다.
    pub async fn emit(&self, event: &HostEvent) -> usize {
        let handlers = self.handlers_for(event.kind);
        let mut handled = 0;

        for entry in handlers {
            match entry.handler.handle(event).await {
                Ok(()) => handled += 1,
                Err(e) => warn!(
                    "{} handler from {} failed: {}",
                    event.kind, entry.owner.path, e
                ),
            }
        }

        handled
    }
}
