//! Extension traits - extension 모듈 인터페이스

use super::context::{LegacyHandlers, PluginApi};
use crate::command::Command;
use crate::host::HostRuntime;
use hangar_foundation::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// initializer 로 인식되는 export 이름
pub const INITIALIZER_NAMES: [&str; 2] = ["_initialise", "_initialize"];

/// initializer 반환값
///
/// - `Ok(None)`: 명시적으로 등록되지 않은 공개 함수를 user 명령어로 자동 등록
/// - `Ok(Some(names))`: 추가로 user 명령어로 등록할 이름 목록
pub type InitResult = Result<Option<Vec<String>>>;

// ============================================================================
// Extension Trait
// ============================================================================

/// extension 모듈
///
/// load 할 때마다 새 인스턴스가 만들어지고 `execute` 가 다시 실행됩니다.
pub trait Extension: Send + Sync {
    /// 모듈 최상위 실행
    ///
    /// 여기서 한 등록도 같은 load 에 포함됩니다.
    fn execute(&self, _api: &PluginApi) -> Result<()> {
        Ok(())
    }

    /// 공개 export 테이블
    fn exports(&self) -> ModuleExports;
}

// ============================================================================
// ModuleExports
// ============================================================================

/// export 항목
pub enum Export {
    /// 명령어 후보 함수
    Function(Arc<dyn Command>),

    /// initializer
    Initializer(Initializer),
}

/// 모듈 export 테이블 (선언 순서 유지)
#[derive(Default)]
pub struct ModuleExports {
    entries: Vec<(String, Export)>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, name: impl Into<String>, command: Arc<dyn Command>) -> Self {
        self.entries.push((name.into(), Export::Function(command)));
        self
    }

    /// `_initialise` 이름으로 initializer export
    pub fn initializer(self, initializer: Initializer) -> Self {
        self.export(INITIALIZER_NAMES[0], Export::Initializer(initializer))
    }

    pub fn export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.entries.push((name.into(), export));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Export)> {
        self.entries
    }
}

// ============================================================================
// Initializer
// ============================================================================

/// initializer 호출 규약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitConvention {
    /// 인자 없음
    NoArgs,
    /// 호스트 핸들
    Host,
    /// handlers + 호스트 (legacy)
    LegacyHandlersHost,
    /// handlers 만 (deprecated)
    LegacyHandlers,
}

impl std::fmt::Display for InitConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoArgs => write!(f, "_initialise()"),
            Self::Host => write!(f, "_initialise(host)"),
            Self::LegacyHandlersHost => write!(f, "_initialise(handlers, host)"),
            Self::LegacyHandlers => write!(f, "_initialise(handlers)"),
        }
    }
}

type InitFn = Box<dyn Fn(&PluginApi) -> InitResult + Send + Sync>;

/// extension initializer
///
/// 네 가지 규약 모두 `PluginApi` 하나를 받는 형태로 변환됩니다.
pub struct Initializer {
    convention: InitConvention,
    call: InitFn,
}

impl Initializer {
    pub fn no_args<F>(f: F) -> Self
    where
        F: Fn() -> InitResult + Send + Sync + 'static,
    {
        Self {
            convention: InitConvention::NoArgs,
            call: Box::new(move |_| f()),
        }
    }

    pub fn with_host<F>(f: F) -> Self
    where
        F: Fn(&PluginApi) -> InitResult + Send + Sync + 'static,
    {
        Self {
            convention: InitConvention::Host,
            call: Box::new(f),
        }
    }

    pub fn legacy<F>(f: F) -> Self
    where
        F: Fn(&LegacyHandlers<'_>, &HostRuntime) -> InitResult + Send + Sync + 'static,
    {
        Self {
            convention: InitConvention::LegacyHandlersHost,
            call: Box::new(move |api| {
                info!(
                    "[LEGACY] upgrade {} {} to {}",
                    api.path(),
                    InitConvention::LegacyHandlersHost,
                    InitConvention::Host
                );
                f(&LegacyHandlers::new(api), api.host())
            }),
        }
    }

    pub fn ancient<F>(f: F) -> Self
    where
        F: Fn(&LegacyHandlers<'_>) -> InitResult + Send + Sync + 'static,
    {
        Self {
            convention: InitConvention::LegacyHandlers,
            call: Box::new(move |api| {
                warn!(
                    "[DEPRECATED] upgrade {} {} to {}",
                    api.path(),
                    InitConvention::LegacyHandlers,
                    InitConvention::Host
                );
                f(&LegacyHandlers::new(api))
            }),
        }
    }

    pub fn convention(&self) -> InitConvention {
        self.convention
    }

    pub(crate) fn invoke(&self, api: &PluginApi) -> InitResult {
        (self.call)(api)
    }
}
