//! Extension Manager - extension 라이프사이클 관리
//!
//! ## 흐름
//!
//! - `load`: 컨텍스트 열기 → 모듈 실행 → initializer → 명령어 스테이징
//!   → 검증 → 커밋 → 태그 동기화
//! - `unload`: 스레드 / 일관성 검사 → 명령어, 핸들러, 공유 객체 제거
//!   → 태스크 취소 → 웹 리스너 종료
//!
//! load / unload 는 하나의 async mutex 로 직렬화됩니다. 실패한 load 는
//! 디스패처, 핸들러 버스, 공유 객체 저장소, 레지스트리 어디에도 흔적을 남기지 않습니다.

use super::catalog::{module_path, PluginCatalog};
use super::context::{LoadContext, LoadMetadata, PluginApi, SharedTracker};
use super::events::{LifecycleBus, LifecycleEvent, LifecycleKind};
use super::registry::{ExtensionRecord, ExtensionRegistry, ExtensionSummary};
use super::tags::{TagSynchronizer, TaggedCommands};
use super::traits::{Export, Initializer, INITIALIZER_NAMES};
use crate::command::{Command, CommandDispatcher};
use crate::handler::{HandlerBus, HandlerOwner};
use crate::host::HostRuntime;
use hangar_foundation::{Error, Result};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

// ============================================================================
// 결과 타입
// ============================================================================

/// load 성공 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub path: String,
    pub name: String,

    /// 바인딩된 관리자 명령어
    pub admin_commands: Vec<String>,

    /// 바인딩된 사용자 명령어
    pub user_commands: Vec<String>,

    /// 이 프로세스에서 이미 실행된 적 있는 모듈인지
    pub reloaded: bool,
}

impl LoadSummary {
    /// `*admin, user` 형태 (명령어가 없으면 "no commands")
    pub fn describe(&self) -> String {
        if self.admin_commands.is_empty() && self.user_commands.is_empty() {
            return "no commands".to_string();
        }

        let mut names: Vec<String> = self
            .admin_commands
            .iter()
            .map(|name| format!("*{}", name))
            .chain(self.user_commands.iter().cloned())
            .collect();
        names.sort_by(|a, b| a.trim_start_matches('*').cmp(b.trim_start_matches('*')));
        names.join(", ")
    }
}

/// unload_all 결과
#[derive(Debug, Default)]
pub struct UnloadAllReport {
    pub unloaded: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl UnloadAllReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// load_configured 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBatchReport {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

/// 커밋 대기 중인 명령어
struct StagedCommand {
    name: String,
    command: Arc<dyn Command>,
    is_admin: bool,
}

// ============================================================================
// ExtensionManager
// ============================================================================

/// extension 매니저
pub struct ExtensionManager {
    host: Arc<HostRuntime>,
    dispatcher: Arc<CommandDispatcher>,
    handlers: Arc<HandlerBus>,
    catalog: PluginCatalog,
    registry: ExtensionRegistry,
    tracker: SharedTracker,

    /// load / unload 직렬화
    op_lock: Mutex<()>,

    events: LifecycleBus,
}

impl ExtensionManager {
    pub fn new(host: Arc<HostRuntime>, catalog: PluginCatalog) -> Self {
        Self::with_collaborators(
            host,
            catalog,
            Arc::new(CommandDispatcher::new()),
            Arc::new(HandlerBus::new()),
        )
    }

    /// 기존 디스패처 / 핸들러 버스와 함께 생성
    pub fn with_collaborators(
        host: Arc<HostRuntime>,
        catalog: PluginCatalog,
        dispatcher: Arc<CommandDispatcher>,
        handlers: Arc<HandlerBus>,
    ) -> Self {
        Self {
            host,
            dispatcher,
            handlers,
            catalog,
            registry: ExtensionRegistry::new(),
            tracker: SharedTracker::default(),
            op_lock: Mutex::new(()),
            events: LifecycleBus::new(),
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// extension 로드
    ///
    /// import / init 실패는 `Ok(false)` 로 흡수됩니다. 이미 로드된 path 등
    /// 호출자 오류는 `Err` 로 반환됩니다.
    pub async fn load(&self, path: &str) -> Result<bool> {
        match self.try_load(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_load_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// extension 로드 (실패 원인 포함)
    pub async fn try_load(&self, path: &str) -> Result<LoadSummary> {
        let _guard = self.op_lock.lock().await;

        if self.registry.contains(path) {
            return Err(Error::DuplicateExtension(path.to_string()));
        }

        let metadata = LoadMetadata::for_path(path);
        let stale = self.tracker.lock().start(metadata.clone());
        if let Some(stale) = stale {
            warn!("discarding stale load context for {}", stale.metadata.path);
            self.discard(stale).await;
        }

        let reloaded = self.catalog.has_executed(path);
        let api = PluginApi::new(&metadata, Arc::clone(&self.tracker), Arc::clone(&self.host));
        let staged = self.execute_extension(&api);
        let context = self.tracker.lock().take();

        let staged = match staged {
            Ok(staged) => staged,
            Err(e) => return Err(self.fail_load(path, e, context).await),
        };
        let Some(context) = context else {
            let e = Error::Consistency(format!("load context for {} was closed early", path));
            return Err(self.fail_load(path, e, None).await);
        };
        if let Err(e) = self.validate_shared(&context) {
            return Err(self.fail_load(path, e, Some(context)).await);
        }

        let summary = self.commit(context, staged, reloaded)?;

        info!("{} - {}", summary.name, summary.describe());
        self.events.publish(LifecycleEvent::new(
            LifecycleKind::Loaded,
            path,
            Some(summary.describe()),
        ));
        Ok(summary)
    }

    /// 모듈 실행부터 명령어 스테이징까지
    fn execute_extension(&self, api: &PluginApi) -> Result<Vec<StagedCommand>> {
        let path = api.path();

        let module = self.catalog.instantiate(path)?;
        module.execute(api).map_err(|e| Error::import(path, e))?;

        // pass 1: export 분류
        let mut initializer: Option<Initializer> = None;
        let mut candidates: Vec<(String, Arc<dyn Command>)> = Vec::new();

        for (name, export) in module.exports().into_entries() {
            let is_initializer_name = INITIALIZER_NAMES.contains(&name.as_str());
            match export {
                Export::Initializer(init) if is_initializer_name => {
                    if initializer.is_some() {
                        warn!("{}: ignoring additional initializer {}", path, name);
                    } else {
                        initializer = Some(init);
                    }
                }
                Export::Function(_) if is_initializer_name => {
                    return Err(Error::init(
                        path,
                        format!("{} has no usable calling convention", name),
                    ));
                }
                Export::Initializer(_) => {
                    warn!("{}: initializer exported as {} is ignored", path, name);
                }
                Export::Function(_) if name.starts_with('_') => {}
                Export::Function(command) => candidates.push((name, command)),
            }
        }

        let available = match &initializer {
            Some(init) => {
                debug!("{}: calling {}", path, init.convention());
                init.invoke(api).map_err(|e| Error::init(path, e))?
            }
            None => None,
        };

        let user_commands = match available {
            Some(names) => names,
            None => {
                let explicit = self.open_commands();
                candidates
                    .iter()
                    .map(|(name, _)| name.clone())
                    .filter(|name| !explicit.contains(name))
                    .collect()
            }
        };
        api.register_user_command(user_commands, &[])
            .map_err(|e| Error::init(path, e))?;

        // pass 2: 디스패처 바인딩 스테이징
        let (all, admin) = {
            let tracker = self.tracker.lock();
            let ctx = tracker
                .current()
                .ok_or_else(|| Error::init(path, "load context was closed during init"))?;
            (ctx.commands.all(), ctx.commands.admin.clone())
        };

        let mut staged = Vec::new();
        for (name, command) in candidates {
            if !all.contains(&name) {
                continue;
            }
            if let Some(owner) = self.dispatcher.owner(&name) {
                return Err(Error::init(
                    path,
                    format!("command {} is already registered by {}", name, owner),
                ));
            }
            let is_admin = admin.contains(&name);
            staged.push(StagedCommand {
                name,
                command,
                is_admin,
            });
        }

        Ok(staged)
    }

    /// 열린 컨텍스트의 명시 등록 명령어
    fn open_commands(&self) -> BTreeSet<String> {
        self.tracker
            .lock()
            .current()
            .map(|ctx| ctx.commands.all())
            .unwrap_or_default()
    }

    /// 공유 객체 id 충돌 검사
    fn validate_shared(&self, context: &LoadContext) -> Result<()> {
        let path = &context.metadata.path;
        let mut seen = HashSet::new();

        for shared in &context.shared {
            let conflict = !seen.insert(shared.id.as_str()) || self.host.shared().contains(&shared.id);
            if !conflict {
                continue;
            }
            if !shared.forgiving {
                return Err(Error::init(
                    path.as_str(),
                    format!("{} already registered in shared", shared.id),
                ));
            }
            info!("{}: {} already registered in shared, replacing", path, shared.id);
        }
        Ok(())
    }

    /// 스테이징된 내용을 한 번에 반영
    fn commit(&self, context: LoadContext, staged: Vec<StagedCommand>, reloaded: bool) -> Result<LoadSummary> {
        let path = context.metadata.path.clone();
        let name = context.metadata.name.clone();
        let owner = HandlerOwner::new(name.clone(), path.clone());

        let registered: BTreeSet<String> = staged.iter().map(|s| s.name.clone()).collect();
        let handlers = context.handlers.clone();
        let shared = context.shared.clone();
        // 바인딩한 명령어의 태그만 동기화
        let tagged: TaggedCommands = context
            .commands
            .tagged
            .iter()
            .filter(|(name, _)| registered.contains(*name))
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();

        // 레지스트리 먼저: 이후 단계는 실패하지 않음
        self.registry
            .insert(ExtensionRecord::from_context(context, registered))?;

        let mut summary = LoadSummary {
            path: path.clone(),
            name,
            admin_commands: Vec::new(),
            user_commands: Vec::new(),
            reloaded,
        };

        for command in staged {
            if command.is_admin {
                summary.admin_commands.push(command.name.clone());
            } else {
                summary.user_commands.push(command.name.clone());
            }
            self.dispatcher
                .register(command.name, command.command, command.is_admin, path.as_str());
        }

        for registration in handlers {
            self.handlers.register(
                registration.handler,
                registration.kind,
                registration.priority,
                owner.clone(),
            );
        }

        for registration in shared {
            // 충돌은 validate_shared 에서 걸러짐
            if let Err(e) = self
                .host
                .shared()
                .register(registration.id, registration.object, true)
            {
                warn!("{}: {}", path, e);
            }
        }

        TagSynchronizer::sync(&tagged, &self.dispatcher);

        Ok(summary)
    }

    /// 실패한 load 정리
    async fn fail_load(&self, path: &str, e: Error, context: Option<LoadContext>) -> Error {
        error!("failed to load {}: {}", path, e);
        if let Some(context) = context {
            self.discard(context).await;
        }
        self.events.publish(LifecycleEvent::new(
            LifecycleKind::LoadFailed,
            path,
            Some(e.to_string()),
        ));
        e
    }

    /// 커밋되지 않은 컨텍스트 폐기
    async fn discard(&self, context: LoadContext) {
        let path = &context.metadata.path;

        for task in &context.tasks {
            debug!("{}: cancelling task", path);
            task.abort();
        }

        for group in &context.web_groups {
            if let Err(e) = self.host.web().terminate(group).await {
                warn!("{}: failed to terminate listener group {}: {}", path, group, e);
            }
        }

        if !context.threads.is_empty() {
            warn!(
                "{}: {} thread(s) left running after failed load",
                path,
                context.threads.len()
            );
        }
    }

    // ========================================================================
    // Unload
    // ========================================================================

    /// extension 언로드
    pub async fn unload(&self, path: &str) -> Result<bool> {
        let _guard = self.op_lock.lock().await;

        match self.unload_locked(path).await {
            Ok(()) => {
                info!("{} unloaded", path);
                self.events
                    .publish(LifecycleEvent::new(LifecycleKind::Unloaded, path, None));
                Ok(true)
            }
            Err(e) => {
                self.events.publish(LifecycleEvent::new(
                    LifecycleKind::UnloadFailed,
                    path,
                    Some(e.to_string()),
                ));
                Err(e)
            }
        }
    }

    async fn unload_locked(&self, path: &str) -> Result<()> {
        let threads = self
            .registry
            .with_record(path, |record| record.threads.len())
            .ok_or_else(|| Error::ExtensionNotFound(path.to_string()))?;

        if threads > 0 {
            return Err(Error::BusyResource {
                path: path.to_string(),
                threads,
            });
        }

        self.check_consistency(path)?;

        // 이 시점 이후로는 실패하지 않음
        let record = self
            .registry
            .remove(path)
            .ok_or_else(|| Error::ExtensionNotFound(path.to_string()))?;

        for name in record.commands.all() {
            if self.dispatcher.owner(&name).as_deref() != Some(path) {
                continue;
            }
            if self.dispatcher.unregister(&name).is_some() {
                debug!("{}: removing command {}", path, name);
            }
            if self.dispatcher.remove_admin(&name) {
                debug!("{}: removing admin command {}", path, name);
            }
        }

        for name in &record.registered {
            if self.dispatcher.contains(name) {
                continue;
            }
            if self.dispatcher.remove_tagsets(name) {
                debug!("{}: removing tagsets for {}", path, name);
            }
        }

        let removed = self.handlers.remove_owned_by(path);
        if removed > 0 {
            debug!("{}: removed {} handler(s)", path, removed);
        }

        for shared in &record.shared {
            if self.host.shared().unregister(&shared.id).is_some() {
                debug!("{}: removing shared {}", path, shared.id);
            }
        }

        for task in &record.tasks {
            debug!("{}: cancelling task", path);
            task.abort();
        }

        for group in &record.web_groups {
            match self.host.web().terminate(group).await {
                Ok(count) => debug!("{}: terminated {} listener(s) in {}", path, count, group),
                Err(e) => warn!("{}: failed to terminate listener group {}: {}", path, group, e),
            }
        }

        Ok(())
    }

    /// 레코드와 디스패처 / 핸들러 버스 일치 여부
    fn check_consistency(&self, path: &str) -> Result<()> {
        let (registered, handler_count) = self
            .registry
            .with_record(path, |record| (record.registered.clone(), record.handlers.len()))
            .ok_or_else(|| Error::ExtensionNotFound(path.to_string()))?;

        for name in &registered {
            if self.dispatcher.owner(name).as_deref() != Some(path) {
                return Err(Error::Consistency(format!(
                    "command {} of {} is no longer bound to it",
                    name, path
                )));
            }
        }

        let live = self.handlers.count_owned_by(path);
        if live != handler_count {
            return Err(Error::Consistency(format!(
                "{} has {} handler(s) on the bus, record has {}",
                path, live, handler_count
            )));
        }

        Ok(())
    }

    /// 로드된 전체 extension 언로드 (실패는 로그 후 계속)
    pub async fn unload_all(&self) -> UnloadAllReport {
        let mut report = UnloadAllReport::default();

        for path in self.registry.paths() {
            match self.unload(&path).await {
                Ok(_) => report.unloaded.push(path),
                Err(e) => {
                    error!("{} could not be unloaded: {}", path, e);
                    report.failed.push((path, e));
                }
            }
        }

        report
    }

    /// 끝난 스레드를 기록에서 제거, 남은 스레드 수 반환
    pub async fn reap_threads(&self, path: &str) -> Result<usize> {
        let _guard = self.op_lock.lock().await;

        let finished = self
            .registry
            .with_record_mut(path, |record| {
                let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut record.threads)
                    .into_iter()
                    .partition(|thread| thread.is_finished());
                record.threads = running;
                finished
            })
            .ok_or_else(|| Error::ExtensionNotFound(path.to_string()))?;

        for thread in finished {
            let name = thread.name().to_string();
            match thread.join() {
                Ok(()) => debug!("{}: thread {} finished", path, name),
                Err(e) => warn!("{}: {}", path, e),
            }
        }

        Ok(self
            .registry
            .with_record(path, |record| record.threads.len())
            .unwrap_or(0))
    }

    // ========================================================================
    // 설정 기반 로드
    // ========================================================================

    /// 설정의 `plugins.enabled` 로 선택된 플러그인 로드
    pub async fn load_configured(&self) -> LoadBatchReport {
        let config = self.host.config();
        let names = self.catalog.configured(config.plugins.enabled.as_deref());
        let mut report = LoadBatchReport::default();

        for name in names {
            let path = module_path(&name);
            match self.load(&path).await {
                Ok(true) => report.loaded.push(path),
                Ok(false) => report.failed.push(path),
                Err(e) => {
                    warn!("skipping {}: {}", path, e);
                    report.failed.push(path);
                }
            }
        }

        info!(
            "loaded {} plugin(s), {} failed",
            report.loaded.len(),
            report.failed.len()
        );
        report
    }

    // ========================================================================
    // 조회 / 접근자
    // ========================================================================

    pub fn is_loaded(&self, path: &str) -> bool {
        self.registry.contains(path)
    }

    /// path 순으로 요약
    pub fn loaded(&self) -> Vec<ExtensionSummary> {
        let mut summaries = self.registry.summaries();
        summaries.sort_by(|a, b| a.path.cmp(&b.path));
        summaries
    }

    pub fn summary(&self, path: &str) -> Option<ExtensionSummary> {
        self.registry.summary(path)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &LifecycleBus {
        &self.events
    }

    pub fn host(&self) -> &Arc<HostRuntime> {
        &self.host
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn handlers(&self) -> &Arc<HandlerBus> {
        &self.handlers
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::command_fn;
    use crate::plugin::traits::{Extension, ModuleExports};

    struct Ping;

    impl Extension for Ping {
        fn exports(&self) -> ModuleExports {
            ModuleExports::new().function("ping", command_fn(|_| Ok(Some("pong".into()))))
        }
    }

    fn manager() -> ExtensionManager {
        let catalog = PluginCatalog::new().with("plugins.ping", || Box::new(Ping) as Box<dyn Extension>);
        ExtensionManager::new(Arc::new(HostRuntime::default()), catalog)
    }

    #[test]
    fn test_describe_marks_admin() {
        let summary = LoadSummary {
            path: "plugins.x".into(),
            name: "x".into(),
            admin_commands: vec!["purge".into()],
            user_commands: vec!["ask".into(), "zap".into()],
            reloaded: false,
        };
        assert_eq!(summary.describe(), "ask, *purge, zap");

        let empty = LoadSummary {
            admin_commands: vec![],
            user_commands: vec![],
            ..summary
        };
        assert_eq!(empty.describe(), "no commands");
    }

    #[tokio::test]
    async fn test_load_and_unload_roundtrip() {
        let manager = manager();

        assert!(manager.load("plugins.ping").await.unwrap());
        assert!(manager.is_loaded("plugins.ping"));
        assert_eq!(
            manager.dispatcher().owner("ping").as_deref(),
            Some("plugins.ping")
        );

        assert!(manager.unload("plugins.ping").await.unwrap());
        assert!(!manager.is_loaded("plugins.ping"));
        assert!(manager.dispatcher().resolve("ping").is_none());
        assert!(manager.dispatcher().tagsets("ping").is_empty());
    }

    #[tokio::test]
    async fn test_second_load_reports_reload() {
        let manager = manager();

        let first = manager.try_load("plugins.ping").await.unwrap();
        assert!(!first.reloaded);
        manager.unload("plugins.ping").await.unwrap();

        let second = manager.try_load("plugins.ping").await.unwrap();
        assert!(second.reloaded);
    }

    #[tokio::test]
    async fn test_unload_unknown_is_not_found() {
        let manager = manager();
        let err = manager.unload("plugins.nope").await.unwrap_err();
        assert!(matches!(err, Error::ExtensionNotFound(_)));
    }
}
