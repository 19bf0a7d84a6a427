//! Command Dispatcher - 명령어 이름 → 핸들러 매핑
//!
//! 플러그인 매니저만 쓰기 작업을 수행합니다. 다른 컴포넌트는
//! `resolve` / `run` / 태그 조회만 사용합니다.

use crate::host::HostRuntime;
use crate::plugin::TagSet;
use async_trait::async_trait;
use hangar_foundation::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Command Trait
// ============================================================================

/// 명령어 호출 정보
#[derive(Clone)]
pub struct CommandCall {
    /// 호스트 런타임
    pub host: Arc<HostRuntime>,

    /// 대화 ID
    pub conversation_id: String,

    /// 호출한 사용자
    pub user: String,

    /// 인자
    pub args: Vec<String>,

    /// 호출자가 관리자인지 여부
    pub is_admin: bool,
}

impl CommandCall {
    pub fn new(host: Arc<HostRuntime>, user: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            host,
            conversation_id: String::new(),
            user: user.into(),
            args,
            is_admin: false,
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// 플러그인이 노출하는 명령어
#[async_trait]
pub trait Command: Send + Sync {
    /// 명령어 실행 (응답 텍스트가 없으면 None)
    async fn run(&self, call: &CommandCall) -> Result<Option<String>>;
}

/// 동기 클로저 기반 명령어
pub struct FnCommand<F>(F);

#[async_trait]
impl<F> Command for FnCommand<F>
where
    F: Fn(&CommandCall) -> Result<Option<String>> + Send + Sync,
{
    async fn run(&self, call: &CommandCall) -> Result<Option<String>> {
        (self.0)(call)
    }
}

/// 클로저를 명령어로 감싸기
pub fn command_fn<F>(f: F) -> Arc<dyn Command>
where
    F: Fn(&CommandCall) -> Result<Option<String>> + Send + Sync + 'static,
{
    Arc::new(FnCommand(f))
}

// ============================================================================
// CommandDispatcher
// ============================================================================

/// 등록된 명령어
#[derive(Clone)]
pub struct RegisteredCommand {
    pub command: Arc<dyn Command>,

    /// 등록한 extension path
    pub owner: String,
}

#[derive(Default)]
struct DispatcherState {
    commands: HashMap<String, RegisteredCommand>,
    admin_commands: HashSet<String>,
    command_tagsets: HashMap<String, BTreeSet<TagSet>>,
}

/// 명령어 디스패처
#[derive(Default)]
pub struct CommandDispatcher {
    state: RwLock<DispatcherState>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 등록 / 해제
    // ========================================================================

    /// 명령어 등록 (같은 이름이면 교체)
    pub fn register(
        &self,
        name: impl Into<String>,
        command: Arc<dyn Command>,
        is_admin: bool,
        owner: impl Into<String>,
    ) {
        let name = name.into();
        let owner = owner.into();
        let mut state = self.state.write();

        if is_admin {
            state.admin_commands.insert(name.clone());
        } else {
            state.admin_commands.remove(&name);
        }
        debug!("registered command {} (admin={}, owner={})", name, is_admin, owner);
        state.commands.insert(name, RegisteredCommand { command, owner });
    }

    /// 명령어 해제
    pub fn unregister(&self, name: &str) -> Option<RegisteredCommand> {
        self.state.write().commands.remove(name)
    }

    /// 관리자 명령어 집합에서 제거
    pub fn remove_admin(&self, name: &str) -> bool {
        self.state.write().admin_commands.remove(name)
    }

    // ========================================================================
    // 태그 인덱스
    // ========================================================================

    /// 태그셋 추가 (이미 있는 태그셋은 무시), 새로 추가된 수 반환
    pub fn add_tagsets(&self, name: &str, tagsets: impl IntoIterator<Item = TagSet>) -> usize {
        let mut state = self.state.write();
        let entry = state.command_tagsets.entry(name.to_string()).or_default();
        tagsets
            .into_iter()
            .filter(|tagset| entry.insert(tagset.clone()))
            .count()
    }

    /// 명령어의 태그 인덱스 항목 제거
    pub fn remove_tagsets(&self, name: &str) -> bool {
        self.state.write().command_tagsets.remove(name).is_some()
    }

    pub fn tagsets(&self, name: &str) -> BTreeSet<TagSet> {
        self.state
            .read()
            .command_tagsets
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// 사용자 태그로 접근 가능한 명령어 (태그셋 하나가 통째로 포함되면 허용)
    pub fn commands_for_tags(&self, user_tags: &BTreeSet<String>) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .command_tagsets
            .iter()
            .filter(|(name, tagsets)| {
                state.commands.contains_key(*name)
                    && tagsets.iter().any(|tagset| tagset.is_subset(user_tags))
            })
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.state
            .read()
            .commands
            .get(name)
            .map(|entry| Arc::clone(&entry.command))
    }

    pub fn owner(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .commands
            .get(name)
            .map(|entry| entry.owner.clone())
    }

    pub fn is_admin(&self, name: &str) -> bool {
        self.state.read().admin_commands.contains(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().commands.contains_key(name)
    }

    /// 등록된 명령어 이름 (정렬)
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// 관리자 명령어 이름 (정렬)
    pub fn admin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().admin_commands.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.state.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().commands.is_empty()
    }

    // ========================================================================
    // 실행
    // ========================================================================

    /// 명령어 실행 (관리자 전용 명령어는 관리자만)
    pub async fn run(&self, name: &str, call: &CommandCall) -> Result<Option<String>> {
        let command = self
            .resolve(name)
            .ok_or_else(|| Error::CommandNotFound(name.to_string()))?;

        if self.is_admin(name) && !call.is_admin {
            return Err(Error::PermissionDenied(format!(
                "{} is an admin command",
                name
            )));
        }

        debug!("running command {} for {}", name, call.user);
        command.run(call).await
    }
}
