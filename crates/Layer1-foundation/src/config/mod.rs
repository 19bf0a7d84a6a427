//! Config - 통합 설정 관리
//!
//! - `host.rs` - HostConfig 통합 설정 (플러그인 선택, 태그, 자유 옵션)

mod host;

pub use host::{
    HostConfig, PluginsConfig, TagAutoRegister, TagsConfig, DEFAULT_TAG_PRESETS,
    HOST_CONFIG_FILE,
};
