//! # Extension System
//!
//! 채팅 봇 호스트의 extension 라이프사이클 관리
//!
//! ## 개요
//!
//! extension 은 런타임에 load / unload 되는 모듈입니다. load 동안
//! extension 이 요청한 모든 등록은 하나의 컨텍스트에 모였다가, 성공하면
//! 한 번에 커밋되고 실패하면 통째로 버려집니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ExtensionManager                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ PluginCatalog│  │   Tracker    │  │ExtensionRegistry │  │
//! │  │ path→factory │  │ LoadContext  │  │  path→record     │  │
//! │  └──────────────┘  └──────┬───────┘  └──────────────────┘  │
//! │                           │ PluginApi                       │
//! │  ┌────────────────────────┼──────────────────────────────┐  │
//! │  │ CommandDispatcher │ HandlerBus │ HostRuntime (shared, │  │
//! │  │                   │            │  web listeners)      │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! struct Weather;
//!
//! impl Extension for Weather {
//!     fn exports(&self) -> ModuleExports {
//!         ModuleExports::new()
//!             .function("forecast", command_fn(|_| Ok(Some("sunny".into()))))
//!             .initializer(Initializer::with_host(|api| {
//!                 api.register_admin_command(["forecast"], &[])?;
//!                 Ok(None)
//!             }))
//!     }
//! }
//!
//! let catalog = PluginCatalog::new().with("plugins.weather", || Box::new(Weather));
//! let manager = ExtensionManager::new(host, catalog);
//! manager.load("plugins.weather").await?;
//! ```

mod catalog;
mod context;
mod events;
mod manager;
mod registry;
mod tags;
mod traits;

pub use catalog::{module_path, ExtensionFactory, PluginCatalog, PLUGIN_ROOT};
pub use context::{
    module_name, CommandRegistrations, HandlerRegistration, LegacyHandlers, LoadContext,
    LoadMetadata, PluginApi, SharedRegistration, ThreadHandle,
};
pub use events::{LifecycleBus, LifecycleEvent, LifecycleKind};
pub use manager::{ExtensionManager, LoadBatchReport, LoadSummary, UnloadAllReport};
pub use registry::{ExtensionRecord, ExtensionRegistry, ExtensionSummary};
pub use tags::{
    build_tagsets, format_tag, merge_tagsets, RegistrationKind, TagSet, TagSpec,
    TagSynchronizer, TaggedCommands,
};
pub use traits::{
    Export, Extension, InitConvention, InitResult, Initializer, ModuleExports, INITIALIZER_NAMES,
};
