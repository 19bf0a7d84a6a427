//! Load Context - load 한 번 동안 extension 의 등록 요청을 모으는 곳
//!
//! extension 코드는 `PluginApi` 를 통해서만 등록합니다. 등록 내용은
//! 열린 `LoadContext` 에 쌓였다가 load 가 성공하면 매니저가 한 번에 커밋합니다.

use super::tags::{build_tagsets, merge_tagsets, RegistrationKind, TagSpec, TaggedCommands};
use crate::handler::{EventHandler, DEFAULT_PRIORITY};
use crate::host::{HostRuntime, ListenerFuture, SharedObject};
use hangar_foundation::{Error, EventKind, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::task::AbortHandle;
use tracing::{debug, error};

// ============================================================================
// 등록 항목
// ============================================================================

/// load 대상 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMetadata {
    /// 모듈 이름 (path 의 마지막 segment)
    pub name: String,

    /// extension path
    pub path: String,
}

impl LoadMetadata {
    pub fn for_path(path: &str) -> Self {
        Self {
            name: module_name(path).to_string(),
            path: path.to_string(),
        }
    }
}

/// path 의 마지막 segment
pub fn module_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// 명령어 등록 내역
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRegistrations {
    pub admin: BTreeSet<String>,
    pub user: BTreeSet<String>,
    pub tagged: TaggedCommands,
}

impl CommandRegistrations {
    /// admin ∪ user
    pub fn all(&self) -> BTreeSet<String> {
        self.admin.union(&self.user).cloned().collect()
    }

    pub fn is_admin(&self, name: &str) -> bool {
        self.admin.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.admin.is_empty() && self.user.is_empty()
    }
}

/// 핸들러 등록 요청
#[derive(Clone)]
pub struct HandlerRegistration {
    pub handler: Arc<dyn EventHandler>,
    pub kind: EventKind,
    pub priority: i32,
}

/// 공유 객체 등록 요청
#[derive(Clone)]
pub struct SharedRegistration {
    pub id: String,
    pub object: SharedObject,
    pub forgiving: bool,
}

/// extension 이 띄운 OS 스레드
pub struct ThreadHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl ThreadHandle {
    pub fn new(name: impl Into<String>, handle: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 스레드 종료 대기
    pub fn join(self) -> Result<()> {
        let name = self.name;
        self.handle
            .join()
            .map_err(|_| Error::Internal(format!("thread {} panicked", name)))
    }
}

impl std::fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("name", &self.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}

// ============================================================================
// LoadContext / Tracker
// ============================================================================

/// 진행 중인 load 의 누적 등록 내용
pub struct LoadContext {
    pub metadata: LoadMetadata,
    pub commands: CommandRegistrations,
    pub handlers: Vec<HandlerRegistration>,
    pub shared: Vec<SharedRegistration>,
    pub threads: Vec<ThreadHandle>,
    pub tasks: Vec<AbortHandle>,
    pub web_groups: Vec<String>,
}

impl LoadContext {
    pub fn new(metadata: LoadMetadata) -> Self {
        Self {
            metadata,
            commands: CommandRegistrations::default(),
            handlers: Vec::new(),
            shared: Vec::new(),
            threads: Vec::new(),
            tasks: Vec::new(),
            web_groups: Vec::new(),
        }
    }
}

/// 열린 컨텍스트는 최대 하나
#[derive(Default)]
pub(crate) struct Tracker {
    current: Option<LoadContext>,
}

pub(crate) type SharedTracker = Arc<Mutex<Tracker>>;

impl Tracker {
    /// 새 컨텍스트 열기, 남아있던 컨텍스트 반환
    pub(crate) fn start(&mut self, metadata: LoadMetadata) -> Option<LoadContext> {
        self.current.replace(LoadContext::new(metadata))
    }

    /// 컨텍스트 닫기
    pub(crate) fn take(&mut self) -> Option<LoadContext> {
        self.current.take()
    }

    pub(crate) fn current(&self) -> Option<&LoadContext> {
        self.current.as_ref()
    }

    fn current_for(&mut self, path: &str) -> Option<&mut LoadContext> {
        self.current
            .as_mut()
            .filter(|ctx| ctx.metadata.path == path)
    }
}

// ============================================================================
// PluginApi - extension 이 사용하는 등록 인터페이스
// ============================================================================

/// extension 에게 전달되는 등록 핸들
///
/// 모든 `register_*` 는 자기 path 의 load 가 진행 중일 때만 성공합니다.
/// 그 외에는 `Error::NoOpenContext` 를 반환하고 아무것도 바꾸지 않습니다.
#[derive(Clone)]
pub struct PluginApi {
    path: String,
    module: String,
    tracker: SharedTracker,
    host: Arc<HostRuntime>,
}

impl PluginApi {
    pub(crate) fn new(metadata: &LoadMetadata, tracker: SharedTracker, host: Arc<HostRuntime>) -> Self {
        Self {
            path: metadata.path.clone(),
            module: metadata.name.clone(),
            tracker,
            host,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn host(&self) -> &Arc<HostRuntime> {
        &self.host
    }

    pub fn config_option(&self, key: &str) -> Option<Value> {
        self.host.config_option(key)
    }

    /// 자기 load 가 진행 중인지
    pub fn is_open(&self) -> bool {
        self.tracker
            .lock()
            .current()
            .map(|ctx| ctx.metadata.path == self.path)
            .unwrap_or(false)
    }

    fn with_context<R>(&self, op: &str, f: impl FnOnce(&mut LoadContext) -> R) -> Result<R> {
        let mut tracker = self.tracker.lock();
        match tracker.current_for(&self.path) {
            Some(ctx) => Ok(f(ctx)),
            None => {
                error!("{}: {} called with no load in progress", self.path, op);
                Err(Error::NoOpenContext {
                    path: self.path.clone(),
                })
            }
        }
    }

    // ========================================================================
    // 명령어
    // ========================================================================

    /// 일반 사용자 명령어 등록
    pub fn register_user_command<I, S>(&self, names: I, tags: &[TagSpec]) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_command(RegistrationKind::User, names, tags)
    }

    /// 관리자 명령어 등록
    pub fn register_admin_command<I, S>(&self, names: I, tags: &[TagSpec]) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_command(RegistrationKind::Admin, names, tags)
    }

    pub fn register_command<I, S>(&self, kind: RegistrationKind, names: I, tags: &[TagSpec]) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mode = self.host.config().tag_auto_register();

        self.with_context("register_command", |ctx| {
            for name in names {
                if let Some(tagsets) = build_tagsets(tags, &mode, &self.module, &name, kind) {
                    merge_tagsets(&mut ctx.commands.tagged, &name, kind, tagsets);
                }
                match kind {
                    RegistrationKind::Admin => ctx.commands.admin.insert(name),
                    RegistrationKind::User => ctx.commands.user.insert(name),
                };
            }
        })
    }

    // ========================================================================
    // 핸들러 / 공유 객체
    // ========================================================================

    pub fn register_handler(
        &self,
        handler: Arc<dyn EventHandler>,
        kind: EventKind,
        priority: i32,
    ) -> Result<()> {
        self.with_context("register_handler", |ctx| {
            ctx.handlers.push(HandlerRegistration {
                handler,
                kind,
                priority,
            });
        })
    }

    /// `message` 이벤트, 기본 priority 로 핸들러 등록
    pub fn register_message_handler(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        self.register_handler(handler, EventKind::default(), DEFAULT_PRIORITY)
    }

    /// 공유 객체 등록 (충돌 검사는 커밋 직전에 수행)
    pub fn register_shared(&self, id: impl Into<String>, object: SharedObject, forgiving: bool) -> Result<()> {
        let id = id.into();
        self.with_context("register_shared", |ctx| {
            ctx.shared.push(SharedRegistration {
                id,
                object,
                forgiving,
            });
        })
    }

    /// 덮어쓰기 허용으로 공유 객체 등록
    pub fn share(&self, id: impl Into<String>, object: SharedObject) -> Result<()> {
        self.register_shared(id, object, true)
    }

    // ========================================================================
    // 스레드 / 태스크
    // ========================================================================

    pub fn register_thread(&self, thread: ThreadHandle) -> Result<()> {
        self.with_context("register_thread", |ctx| {
            debug!("{} registered thread {}", ctx.metadata.path, thread.name());
            ctx.threads.push(thread);
        })
    }

    /// OS 스레드 시작 후 등록
    pub fn spawn_thread<F>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.with_context("spawn_thread", |_| ())?;

        let name = name.into();
        let handle = std::thread::Builder::new().name(name.clone()).spawn(f)?;
        self.register_thread(ThreadHandle::new(name, handle))
    }

    pub fn register_task(&self, task: AbortHandle) -> Result<()> {
        self.with_context("register_task", |ctx| ctx.tasks.push(task))
    }

    /// 비동기 태스크 시작 후 등록
    ///
    /// 태스크 에러는 로그로만 남습니다.
    pub fn start_task<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Arc<HostRuntime>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.with_context("start_task", |_| ())?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("no async runtime for {}: {}", self.path, e)))?;

        let path = self.path.clone();
        let future = f(Arc::clone(&self.host));
        let handle = runtime.spawn(async move {
            if let Err(e) = future.await {
                error!("task from {} failed: {}", path, e);
            }
        });

        if let Err(e) = self.register_task(handle.abort_handle()) {
            handle.abort();
            return Err(e);
        }
        Ok(())
    }

    // ========================================================================
    // 웹 리스너
    // ========================================================================

    /// 리스너 그룹 기록 (중복 무시)
    pub fn register_web_listener_group(&self, group: impl Into<String>) -> Result<()> {
        let group = group.into();
        self.with_context("register_web_listener_group", |ctx| {
            if !ctx.web_groups.contains(&group) {
                ctx.web_groups.push(group);
            }
        })
    }

    /// 호스트 웹 리스너 시작 후 그룹 기록
    pub fn start_web_listener(&self, group: impl Into<String>, listener: ListenerFuture) -> Result<()> {
        let group = group.into();
        self.with_context("start_web_listener", |_| ())?;

        self.host.web().start(&group, listener)?;
        self.register_web_listener_group(group)
    }
}

// ============================================================================
// LegacyHandlers - 구 방식 initializer 용 facade
// ============================================================================

/// 구 방식 initializer 가 받는 handlers 객체
pub struct LegacyHandlers<'a> {
    api: &'a PluginApi,
}

impl<'a> LegacyHandlers<'a> {
    pub(crate) fn new(api: &'a PluginApi) -> Self {
        Self { api }
    }

    /// 이벤트 이름 문자열로 핸들러 등록
    pub fn register_handler(&self, handler: Arc<dyn EventHandler>, kind: &str, priority: i32) -> Result<()> {
        let kind: EventKind = kind.parse()?;
        self.api.register_handler(handler, kind, priority)
    }

    pub fn register_user_command<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api.register_user_command(names, &[])
    }

    pub fn register_admin_command<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api.register_admin_command(names, &[])
    }

    pub fn api(&self) -> &PluginApi {
        self.api
    }
}
