//! Extension Registry - 로드된 extension 기록 저장소

use super::context::{CommandRegistrations, HandlerRegistration, LoadContext, SharedRegistration, ThreadHandle};
use chrono::{DateTime, Utc};
use hangar_foundation::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tokio::task::AbortHandle;
use tracing::{debug, info};

/// 로드된 extension 기록
pub struct ExtensionRecord {
    pub path: String,
    pub name: String,

    /// load 중 요청된 명령어 (tag 포함)
    pub commands: CommandRegistrations,

    /// 실제로 디스패처에 바인딩된 명령어
    pub registered: BTreeSet<String>,

    pub handlers: Vec<HandlerRegistration>,
    pub shared: Vec<SharedRegistration>,
    pub threads: Vec<ThreadHandle>,
    pub tasks: Vec<AbortHandle>,
    pub web_groups: Vec<String>,

    pub loaded_at: DateTime<Utc>,

    /// 로드 순서
    load_order: usize,
}

impl ExtensionRecord {
    /// 커밋되는 컨텍스트로부터 생성
    pub fn from_context(context: LoadContext, registered: BTreeSet<String>) -> Self {
        Self {
            path: context.metadata.path,
            name: context.metadata.name,
            commands: context.commands,
            registered,
            handlers: context.handlers,
            shared: context.shared,
            threads: context.threads,
            tasks: context.tasks,
            web_groups: context.web_groups,
            loaded_at: Utc::now(),
            load_order: 0,
        }
    }

    pub fn summary(&self) -> ExtensionSummary {
        ExtensionSummary {
            path: self.path.clone(),
            name: self.name.clone(),
            admin_commands: self.commands.admin.iter().cloned().collect(),
            user_commands: self.commands.user.iter().cloned().collect(),
            registered: self.registered.iter().cloned().collect(),
            handlers: self.handlers.len(),
            shared: self.shared.iter().map(|s| s.id.clone()).collect(),
            threads: self.threads.len(),
            tasks: self.tasks.len(),
            web_groups: self.web_groups.clone(),
            loaded_at: self.loaded_at,
        }
    }
}

/// 읽기 전용 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionSummary {
    pub path: String,
    pub name: String,
    pub admin_commands: Vec<String>,
    pub user_commands: Vec<String>,
    pub registered: Vec<String>,
    pub handlers: usize,
    pub shared: Vec<String>,
    pub threads: usize,
    pub tasks: usize,
    pub web_groups: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

/// extension 레지스트리 (path → 기록)
#[derive(Default)]
pub struct ExtensionRegistry {
    records: RwLock<HashMap<String, ExtensionRecord>>,

    /// 로드 카운터
    load_counter: RwLock<usize>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록 추가
    pub fn insert(&self, mut record: ExtensionRecord) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.path) {
            return Err(Error::DuplicateExtension(record.path));
        }

        let mut counter = self.load_counter.write();
        *counter += 1;
        record.load_order = *counter;

        info!("registered extension {} ({} command(s))", record.path, record.registered.len());
        records.insert(record.path.clone(), record);
        Ok(())
    }

    /// 기록 제거
    pub fn remove(&self, path: &str) -> Option<ExtensionRecord> {
        let removed = self.records.write().remove(path);
        if removed.is_some() {
            debug!("removed extension record {}", path);
        }
        removed
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.read().contains_key(path)
    }

    pub fn with_record<R>(&self, path: &str, f: impl FnOnce(&ExtensionRecord) -> R) -> Option<R> {
        self.records.read().get(path).map(f)
    }

    pub fn with_record_mut<R>(&self, path: &str, f: impl FnOnce(&mut ExtensionRecord) -> R) -> Option<R> {
        self.records.write().get_mut(path).map(f)
    }

    pub fn summary(&self, path: &str) -> Option<ExtensionSummary> {
        self.with_record(path, ExtensionRecord::summary)
    }

    /// 로드 순서대로 요약
    pub fn summaries(&self) -> Vec<ExtensionSummary> {
        let records = self.records.read();
        let mut ordered: Vec<&ExtensionRecord> = records.values().collect();
        ordered.sort_by_key(|record| record.load_order);
        ordered.into_iter().map(ExtensionRecord::summary).collect()
    }

    /// 로드 순서대로 path 목록
    pub fn paths(&self) -> Vec<String> {
        let records = self.records.read();
        let mut ordered: Vec<&ExtensionRecord> = records.values().collect();
        ordered.sort_by_key(|record| record.load_order);
        ordered.into_iter().map(|record| record.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::context::LoadMetadata;

    fn record(path: &str) -> ExtensionRecord {
        let mut context = LoadContext::new(LoadMetadata::for_path(path));
        context.commands.user.insert("ping".into());
        ExtensionRecord::from_context(context, ["ping".to_string()].into_iter().collect())
    }

    #[test]
    fn test_insert_and_summary() {
        let registry = ExtensionRegistry::new();
        registry.insert(record("plugins.ping")).unwrap();

        let summary = registry.summary("plugins.ping").unwrap();
        assert_eq!(summary.name, "ping");
        assert_eq!(summary.user_commands, vec!["ping"]);
        assert_eq!(summary.registered, vec!["ping"]);
        assert!(registry.contains("plugins.ping"));
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let registry = ExtensionRegistry::new();
        registry.insert(record("plugins.ping")).unwrap();

        let err = registry.insert(record("plugins.ping")).unwrap_err();
        assert!(matches!(err, Error::DuplicateExtension(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_paths_follow_load_order() {
        let registry = ExtensionRegistry::new();
        registry.insert(record("plugins.zeta")).unwrap();
        registry.insert(record("plugins.alpha")).unwrap();
        registry.insert(record("plugins.mid")).unwrap();

        assert_eq!(
            registry.paths(),
            vec!["plugins.zeta", "plugins.alpha", "plugins.mid"]
        );

        registry.remove("plugins.alpha");
        assert_eq!(registry.paths(), vec!["plugins.zeta", "plugins.mid"]);
    }
}
