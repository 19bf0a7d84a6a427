//! # hangar-foundation
//!
//! Foundation layer for Hangar:
//! - Error: 중앙 에러 타입 (`Error`, `Result`)
//! - Config: 호스트 설정 (HostConfig, 태그 자동 등록)
//! - Storage: JsonStore (범용), Memory (플러그인 영속 메모리)
//! - Event: 핸들러 버스로 전달되는 채팅 이벤트 타입

pub mod config;
pub mod error;
pub mod event;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    HostConfig, PluginsConfig, TagAutoRegister, TagsConfig, DEFAULT_TAG_PRESETS,
    HOST_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, Memory, HANGAR_DIR, MEMORY_FILE};

// ============================================================================
// Event (이벤트 타입)
// ============================================================================
pub use event::{EventKind, HostEvent};
