//! Host Config - 통합 설정
//!
//! 플러그인 선택, 태그 자동 등록, 플러그인별 자유 옵션을 하나로 관리

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// 설정 파일명
pub const HOST_CONFIG_FILE: &str = "config.json";

/// 기본 태그 프리셋
pub const DEFAULT_TAG_PRESETS: [&str; 2] = ["{plugin}-{command}", "{plugin}-{type}"];

// ============================================================================
// Host Config (통합)
// ============================================================================

/// Hangar 호스트 설정
///
/// `plugins` 외의 최상위 키는 모두 `options` 로 보존되어
/// 플러그인이 `option("weather.apiKey")` 형태로 조회합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// 플러그인 설정
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// 자유 형식 옵션
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<HostConfig>(HOST_CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) = project.load_optional::<HostConfig>(HOST_CONFIG_FILE)? {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 지정 디렉토리에서만 로드 (파일이 없으면 기본값)
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self> {
        let store = JsonStore::new(dir.as_ref());
        Ok(store
            .load_optional::<HostConfig>(HOST_CONFIG_FILE)?
            .unwrap_or_default())
    }

    /// 지정 디렉토리에 저장
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<()> {
        JsonStore::new(dir.as_ref()).save(HOST_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: HostConfig) {
        self.plugins.merge(other.plugins);
        for (key, value) in other.options {
            self.options.insert(key, value);
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 점(.)으로 구분된 키로 옵션 조회
    pub fn option(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let mut current = self.options.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// 태그 자동 등록 설정 (미지정이면 활성)
    pub fn tag_auto_register(&self) -> TagAutoRegister {
        self.plugins.tags.auto_register.clone().unwrap_or_default()
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn enabled_plugins(mut self, names: Vec<String>) -> Self {
        self.plugins.enabled = Some(names);
        self
    }

    pub fn auto_register(mut self, value: TagAutoRegister) -> Self {
        self.plugins.tags.auto_register = Some(value);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Plugins Config
// ============================================================================

/// 플러그인 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginsConfig {
    /// 로드할 플러그인 이름 목록 (None이면 발견된 전체)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Vec<String>>,

    /// 태그 설정
    #[serde(default)]
    pub tags: TagsConfig,
}

impl PluginsConfig {
    fn merge(&mut self, other: PluginsConfig) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.tags.auto_register.is_some() {
            self.tags.auto_register = other.tags.auto_register;
        }
    }
}

/// 태그 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_register: Option<TagAutoRegister>,
}

/// 명령어 태그 자동 등록 모드
///
/// - `true`: 기본 프리셋 사용
/// - `false` / 빈 값: 비활성
/// - 문자열 또는 문자열 목록: 사용자 프리셋
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagAutoRegister {
    Enabled(bool),
    Preset(String),
    Presets(Vec<String>),
}

impl TagAutoRegister {
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Enabled(enabled) => *enabled,
            Self::Preset(preset) => !preset.is_empty(),
            Self::Presets(presets) => !presets.is_empty(),
        }
    }

    /// 적용할 프리셋 목록 (포맷 전)
    pub fn presets(&self) -> Vec<String> {
        match self {
            Self::Enabled(true) => DEFAULT_TAG_PRESETS.iter().map(|p| p.to_string()).collect(),
            Self::Enabled(false) => vec![],
            Self::Preset(preset) if preset.is_empty() => vec![],
            Self::Preset(preset) => vec![preset.clone()],
            Self::Presets(presets) => presets.clone(),
        }
    }
}

impl Default for TagAutoRegister {
    fn default() -> Self {
        Self::Enabled(true)
    }
}
