//! Event Types - 핸들러 버스에서 사용하는 이벤트 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Event Kind
// ============================================================================

/// 핸들러가 구독하는 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 사용자 메시지 (봇 자신의 메시지 제외)
    Message,
    /// 봇 메시지 포함 모든 메시지
    #[serde(rename = "allmessages")]
    AllMessages,
    /// 대화 참가/퇴장
    Membership,
    /// 대화 이름 변경
    Rename,
    /// 봇이 메시지를 보내기 직전
    Sending,
    /// 입력 중 알림
    Typing,
    /// 읽음 표시
    Watermark,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        Self::Message,
        Self::AllMessages,
        Self::Membership,
        Self::Rename,
        Self::Sending,
        Self::Typing,
        Self::Watermark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::AllMessages => "allmessages",
            Self::Membership => "membership",
            Self::Rename => "rename",
            Self::Sending => "sending",
            Self::Typing => "typing",
            Self::Watermark => "watermark",
        }
    }
}

impl Default for EventKind {
    fn default() -> Self {
        Self::Message
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::Handler(format!("unknown event type: {}", s)))
    }
}

// ============================================================================
// Host Event
// ============================================================================

/// 핸들러에게 전달되는 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEvent {
    /// 이벤트 종류
    pub kind: EventKind,

    /// 대화 ID
    pub conversation_id: String,

    /// 발신자
    pub user: String,

    /// 본문 (메시지가 아니면 빈 문자열)
    pub text: String,

    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl HostEvent {
    pub fn new(
        kind: EventKind,
        conversation_id: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            conversation_id: conversation_id.into(),
            user: user.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// 메시지 이벤트 생성 헬퍼
    pub fn message(
        conversation_id: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::Message, conversation_id, user, text)
    }
}
