//! Error types for Hangar
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Hangar 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 / 저장소 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Extension 라이프사이클 관련
    // ========================================================================
    #[error("{0} already loaded")]
    DuplicateExtension(String),

    #[error("{0} not found")]
    ExtensionNotFound(String),

    #[error("failed to import {path}: {message}")]
    ImportFailure { path: String, message: String },

    #[error("failed to initialise {path}: {message}")]
    InitFailure { path: String, message: String },

    #[error("{path} has {threads} thread(s)")]
    BusyResource { path: String, threads: usize },

    #[error("registry out of sync: {0}")]
    Consistency(String),

    #[error("no load in progress for {path}")]
    NoOpenContext { path: String },

    // ========================================================================
    // Command / Handler 관련
    // ========================================================================
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// `load` 가 흡수하는 실패인지 확인 (배치 로드를 멈추지 않음)
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Error::ImportFailure { .. } | Error::InitFailure { .. })
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied(_) | Error::CommandNotFound(_) | Error::Command(_)
        )
    }

    /// Import 실패 에러 생성 헬퍼
    pub fn import(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::ImportFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Init 실패 에러 생성 헬퍼
    pub fn init(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::InitFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
