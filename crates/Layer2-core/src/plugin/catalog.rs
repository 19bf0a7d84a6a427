//! Plugin Catalog - 로드 가능한 extension 모듈 목록
//!
//! 점(.)으로 구분된 path 로 모듈 팩토리를 찾습니다. `plugins.` 아래의
//! 모듈만 발견 대상이며, 설정의 `plugins.enabled` 로 로드 대상을 고릅니다.

use super::traits::Extension;
use hangar_foundation::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 발견 대상 루트
pub const PLUGIN_ROOT: &str = "plugins";

/// 모듈 팩토리 (호출할 때마다 새 인스턴스)
pub type ExtensionFactory = Arc<dyn Fn() -> Box<dyn Extension> + Send + Sync>;

/// 플러그인 이름 → path (`plugins.<name>`)
pub fn module_path(name: &str) -> String {
    format!("{}.{}", PLUGIN_ROOT, name)
}

/// 발견 규칙
///
/// - `_` 또는 `.` 로 시작하는 segment 는 제외
/// - 하위 모듈 이름은 상위 폴더 이름으로 시작해야 함
fn is_discoverable(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();

    if segments
        .iter()
        .any(|s| s.is_empty() || s.starts_with('_') || s.starts_with('.'))
    {
        return false;
    }

    segments
        .windows(2)
        .all(|pair| pair[1].starts_with(pair[0]))
}

/// 모듈 카탈로그
#[derive(Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, ExtensionFactory>,

    /// 한 번 이상 실행된 path (importing / reloading 구분)
    executed: Mutex<HashSet<String>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모듈 추가 (builder)
    pub fn with<F>(mut self, path: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Extension> + Send + Sync + 'static,
    {
        self.insert(path, factory);
        self
    }

    /// 모듈 추가 (같은 path 는 교체)
    pub fn insert<F>(&mut self, path: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Extension> + Send + Sync + 'static,
    {
        self.factories.insert(path.into(), Arc::new(factory));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.factories.contains_key(path)
    }

    /// 등록된 전체 path
    pub fn paths(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn has_executed(&self, path: &str) -> bool {
        self.executed.lock().contains(path)
    }

    /// 모듈 인스턴스 생성 (import / reload)
    pub fn instantiate(&self, path: &str) -> Result<Box<dyn Extension>> {
        let factory = self
            .factories
            .get(path)
            .ok_or_else(|| Error::import(path, format!("no module named {}", path)))?;

        if self.executed.lock().insert(path.to_string()) {
            debug!("importing {}", path);
        } else {
            debug!("reloading {}", path);
        }

        Ok(factory())
    }

    // ========================================================================
    // 발견 / 선택
    // ========================================================================

    /// `plugins.` 아래 발견 가능한 플러그인 이름 (루트 제외, 정렬)
    pub fn retrieve_all(&self) -> Vec<String> {
        let prefix = format!("{}.", PLUGIN_ROOT);
        self.factories
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|name| is_discoverable(name))
            .map(String::from)
            .collect()
    }

    /// 설정된 플러그인 이름 선택
    ///
    /// `enabled` 가 None 이면 발견된 전체. 각 항목은 `plugins.<found>` 가
    /// `.<configured>` 로 끝나는 발견 항목과 매칭됩니다. 결과는 설정 순서.
    pub fn configured(&self, enabled: Option<&[String]>) -> Vec<String> {
        let found = self.retrieve_all();
        let Some(enabled) = enabled else {
            return found;
        };

        let mut selected: Vec<String> = Vec::new();
        for configured in enabled {
            let suffix = format!(".{}", configured);
            let matches: Vec<&String> = found
                .iter()
                .filter(|name| module_path(name).ends_with(&suffix))
                .collect();

            match matches.as_slice() {
                [] => warn!("{} could not be found", configured),
                [name] => {
                    if !selected.contains(*name) {
                        selected.push((*name).clone());
                    }
                }
                many => warn!(
                    "{} is ambiguous, matches {}",
                    configured,
                    many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ),
            }
        }

        let excluded: Vec<&str> = found
            .iter()
            .filter(|name| !selected.contains(*name))
            .map(String::as_str)
            .collect();
        if !excluded.is_empty() {
            info!("excluded {} plugin(s): {}", excluded.len(), excluded.join(", "));
        }

        selected
    }
}
