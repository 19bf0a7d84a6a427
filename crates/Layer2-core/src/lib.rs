//! hangar-core: Extension runtime for Hangar
//!
//! Layer2 - extension 라이프사이클과 호스트 협력자
//!
//! # 주요 모듈
//!
//! - `plugin`: Extension 로드 / 언로드, 누적 컨텍스트, 레지스트리, 태그 동기화
//! - `command`: Command Dispatcher (명령어 이름 → 핸들러, 관리자 집합, 태그 인덱스)
//! - `handler`: Handler Bus (이벤트 종류별 priority 정렬 핸들러)
//! - `host`: Host Runtime (설정, 메모리, 공유 객체, 웹 리스너)
//!
//! # 사용 예시
//!
//! ```ignore
//! use hangar_core::{ExtensionManager, HostRuntime, PluginCatalog};
//!
//! let host = Arc::new(HostRuntime::new(HostConfig::load()?, Memory::in_memory()));
//! let manager = ExtensionManager::new(host, catalog);
//!
//! // 설정된 플러그인 전부 로드
//! let report = manager.load_configured().await;
//!
//! // 명령어 실행
//! let call = CommandCall::new(manager.host().clone(), "alice", vec![]);
//! manager.dispatcher().run("ping", &call).await?;
//!
//! // 종료
//! manager.unload_all().await;
//! ```

pub mod command;
pub mod handler;
pub mod host;
pub mod plugin;

// Re-exports: Command
pub use command::{command_fn, Command, CommandCall, CommandDispatcher, RegisteredCommand};

// Re-exports: Handler
pub use handler::{handler_fn, EventHandler, HandlerBus, HandlerOwner, PluggableHandler, DEFAULT_PRIORITY};

// Re-exports: Host
pub use host::{HostRuntime, ListenerFuture, SharedObject, SharedStore, TaskGroupListeners, WebListeners};

// Re-exports: Plugin - Manager
pub use plugin::{ExtensionManager, ExtensionSummary, LoadBatchReport, LoadSummary, UnloadAllReport};

// Re-exports: Plugin - Traits
pub use plugin::{Export, Extension, InitConvention, Initializer, ModuleExports};

// Re-exports: Plugin - Context
pub use plugin::{LegacyHandlers, PluginApi, ThreadHandle};

// Re-exports: Plugin - Catalog
pub use plugin::{module_path, PluginCatalog};

// Re-exports: Plugin - Tags / Events
pub use plugin::{LifecycleEvent, LifecycleKind, RegistrationKind, TagSet, TagSpec};

// Layer1 re-exports
pub use hangar_foundation::{Error, EventKind, HostConfig, HostEvent, Memory, Result};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
