//! Persistent memory - 호스트가 플러그인에 제공하는 key-value 저장소

use super::json::JsonStore;
use crate::Result;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

/// 메모리 파일명
pub const MEMORY_FILE: &str = "memory.json";

/// JSON 파일 기반 key-value 메모리
///
/// `store` 가 없으면 프로세스 메모리에만 유지됩니다 (테스트용).
#[derive(Debug)]
pub struct Memory {
    data: RwLock<Map<String, Value>>,
    store: Option<JsonStore>,
}

impl Memory {
    /// 프로세스 메모리 전용
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(Map::new()),
            store: None,
        }
    }

    /// 저장소에서 로드 (파일이 없으면 빈 메모리)
    pub fn open(store: JsonStore) -> Result<Self> {
        let data = store
            .load_optional::<Map<String, Value>>(MEMORY_FILE)?
            .unwrap_or_default();
        debug!("memory opened with {} key(s)", data.len());
        Ok(Self {
            data: RwLock::new(data),
            store: Some(store),
        })
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.data.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.write().remove(key)
    }

    /// 디스크에 기록 (in-memory 이면 no-op)
    pub fn save(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(MEMORY_FILE, &*self.data.read()),
            None => Ok(()),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::in_memory()
    }
}
