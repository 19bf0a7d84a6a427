//! Storage module for Hangar
//!
//! - `json`: JSON - 범용 파일 저장/로드
//! - `memory`: 플러그인이 공유하는 영속 key-value 메모리

mod json;
mod memory;

// JSON Storage (범용)
pub use json::{JsonStore, HANGAR_DIR};

// Persistent memory
pub use memory::{Memory, MEMORY_FILE};
