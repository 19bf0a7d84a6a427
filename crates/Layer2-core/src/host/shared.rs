//! 공유 객체 저장소 - extension 간 객체 공유

use hangar_foundation::{Error, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// 공유 객체
pub type SharedObject = Arc<dyn Any + Send + Sync>;

/// id → 객체
#[derive(Default)]
pub struct SharedStore {
    objects: RwLock<HashMap<String, SharedObject>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 객체 등록
    ///
    /// id 가 이미 있으면 `forgiving` 일 때 덮어쓰고, 아니면 에러.
    pub fn register(&self, id: impl Into<String>, object: SharedObject, forgiving: bool) -> Result<()> {
        let id = id.into();
        let mut objects = self.objects.write();

        if objects.contains_key(&id) {
            if !forgiving {
                return Err(Error::Internal(format!("{} already registered in shared", id)));
            }
            info!("{} already registered in shared", id);
        }

        objects.insert(id, object);
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> Option<SharedObject> {
        self.objects.write().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.read().contains_key(id)
    }

    /// 원본 객체 조회
    pub fn get_raw(&self, id: &str) -> Option<SharedObject> {
        self.objects.read().get(id).cloned()
    }

    /// 타입 지정 조회 (타입이 다르면 None)
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.get_raw(id)?.downcast::<T>().ok()
    }

    /// 등록된 id (정렬)
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objects.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
