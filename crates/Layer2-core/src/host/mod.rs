//! Host Runtime - extension 에게 노출되는 호스트 기능
//!
//! - 설정 조회 (`config`, `config_option`)
//! - 영속 메모리 (`memory`)
//! - 공유 객체 저장소 (`shared`)
//! - 웹 리스너 그룹 (`web`)

mod shared;
mod web;

pub use shared::{SharedObject, SharedStore};
pub use web::{ListenerFuture, TaskGroupListeners, WebListeners};

use hangar_foundation::{HostConfig, Memory};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// 호스트 런타임
pub struct HostRuntime {
    config: RwLock<HostConfig>,
    memory: Memory,
    shared: SharedStore,
    web: Arc<dyn WebListeners>,
}

impl HostRuntime {
    pub fn new(config: HostConfig, memory: Memory) -> Self {
        Self {
            config: RwLock::new(config),
            memory,
            shared: SharedStore::new(),
            web: Arc::new(TaskGroupListeners::new()),
        }
    }

    /// 웹 리스너 구현 교체
    pub fn with_web_listeners(mut self, web: Arc<dyn WebListeners>) -> Self {
        self.web = web;
        self
    }

    /// 현재 설정 스냅샷
    pub fn config(&self) -> HostConfig {
        self.config.read().clone()
    }

    /// 설정 교체 (다음 load 부터 적용)
    pub fn set_config(&self, config: HostConfig) {
        *self.config.write() = config;
    }

    /// 점(.)으로 구분된 키로 옵션 조회
    pub fn config_option(&self, key: &str) -> Option<Value> {
        self.config.read().option(key).cloned()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn shared(&self) -> &SharedStore {
        &self.shared
    }

    pub fn web(&self) -> &Arc<dyn WebListeners> {
        &self.web
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new(HostConfig::default(), Memory::in_memory())
    }
}
