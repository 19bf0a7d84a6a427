//! Event types - 호스트가 핸들러 버스로 전달하는 채팅 이벤트
//!
//! 채팅 프로토콜 클라이언트가 만든 이벤트를 `EventKind` 별로 분류합니다.

pub mod types;

pub use types::{EventKind, HostEvent};
