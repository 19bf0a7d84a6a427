//! Web listener 그룹 관리
//!
//! 리스너는 그룹 이름으로 묶여 시작되고, 그룹 단위로 종료됩니다.

use async_trait::async_trait;
use hangar_foundation::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 리스너 본체
pub type ListenerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// 웹 리스너 협력자
#[async_trait]
pub trait WebListeners: Send + Sync {
    /// 그룹에 리스너 시작
    fn start(&self, group: &str, listener: ListenerFuture) -> Result<()>;

    /// 그룹의 리스너 전부 종료, 종료된 수 반환
    async fn terminate(&self, group: &str) -> Result<usize>;

    /// 활성 그룹 이름 (정렬)
    fn active_groups(&self) -> Vec<String>;
}

/// tokio task 기반 기본 구현
#[derive(Default)]
pub struct TaskGroupListeners {
    groups: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
}

impl TaskGroupListeners {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebListeners for TaskGroupListeners {
    fn start(&self, group: &str, listener: ListenerFuture) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("no async runtime for listener {}: {}", group, e)))?;

        let handle = runtime.spawn(listener);
        self.groups
            .lock()
            .entry(group.to_string())
            .or_default()
            .push(handle);
        debug!("started listener in group {}", group);
        Ok(())
    }

    async fn terminate(&self, group: &str) -> Result<usize> {
        let handles = self.groups.lock().remove(group).unwrap_or_default();
        let count = handles.len();

        for handle in &handles {
            handle.abort();
        }

        // 취소된 JoinError 는 정상 종료로 간주, 나머지는 첫 에러만 보고
        let mut failure = None;
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() && failure.is_none() {
                    failure = Some(Error::Internal(format!("listener in {} failed: {}", group, e)));
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        info!("terminated {} listener(s) in group {}", count, group);
        Ok(count)
    }

    fn active_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.groups.lock().keys().cloned().collect();
        groups.sort();
        groups
    }
}
