//! Command tags - 태그셋 생성과 디스패처 동기화
//!
//! 태그셋은 태그 문자열의 순서 없는 집합입니다. 명령어는 여러 태그셋을
//! 가질 수 있고, 사용자는 태그셋 하나를 통째로 가지고 있으면 접근할 수 있습니다.

use crate::command::CommandDispatcher;
use hangar_foundation::TagAutoRegister;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 태그셋
pub type TagSet = BTreeSet<String>;

/// 명령어 → 등록 종류 → 태그셋들
pub type TaggedCommands = BTreeMap<String, BTreeMap<RegistrationKind, BTreeSet<TagSet>>>;

// ============================================================================
// RegistrationKind
// ============================================================================

/// 명령어 등록 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationKind {
    Admin,
    User,
}

impl RegistrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TagSpec
// ============================================================================

/// 명시적 태그 지정
///
/// - `Single`: 태그 하나짜리 태그셋
/// - `Group`: 여러 태그로 된 태그셋 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSpec {
    Single(String),
    Group(Vec<String>),
}

impl TagSpec {
    /// 플레이스홀더 치환 후 태그셋으로 변환
    pub fn format(&self, plugin: &str, command: &str, kind: RegistrationKind) -> TagSet {
        match self {
            Self::Single(tag) => std::iter::once(format_tag(tag, plugin, command, kind)).collect(),
            Self::Group(tags) => tags
                .iter()
                .map(|tag| format_tag(tag, plugin, command, kind))
                .collect(),
        }
    }
}

impl From<&str> for TagSpec {
    fn from(tag: &str) -> Self {
        Self::Single(tag.to_string())
    }
}

impl From<String> for TagSpec {
    fn from(tag: String) -> Self {
        Self::Single(tag)
    }
}

impl From<Vec<String>> for TagSpec {
    fn from(tags: Vec<String>) -> Self {
        Self::Group(tags)
    }
}

impl From<Vec<&str>> for TagSpec {
    fn from(tags: Vec<&str>) -> Self {
        Self::Group(tags.into_iter().map(String::from).collect())
    }
}

/// `{plugin}`, `{command}`, `{type}` 치환
pub fn format_tag(template: &str, plugin: &str, command: &str, kind: RegistrationKind) -> String {
    template
        .replace("{plugin}", plugin)
        .replace("{command}", command)
        .replace("{type}", kind.as_str())
}

/// 명령어 하나의 태그셋 계산
///
/// 자동 등록이 꺼져 있고 명시 태그도 없으면 None (태그 항목 자체를 만들지 않음).
pub fn build_tagsets(
    explicit: &[TagSpec],
    mode: &TagAutoRegister,
    plugin: &str,
    command: &str,
    kind: RegistrationKind,
) -> Option<BTreeSet<TagSet>> {
    if !mode.is_enabled() && explicit.is_empty() {
        return None;
    }

    let presets = mode.presets().into_iter().map(TagSpec::Single);
    let tagsets: BTreeSet<TagSet> = explicit
        .iter()
        .cloned()
        .chain(presets)
        .map(|spec| spec.format(plugin, command, kind))
        .filter(|tagset| !tagset.is_empty())
        .collect();

    Some(tagsets)
}

/// 태그셋 합치기 (단조 증가), 새로 추가된 수 반환
pub fn merge_tagsets(
    tagged: &mut TaggedCommands,
    command: &str,
    kind: RegistrationKind,
    tagsets: BTreeSet<TagSet>,
) -> usize {
    let existing = tagged
        .entry(command.to_string())
        .or_default()
        .entry(kind)
        .or_default();
    tagsets
        .into_iter()
        .filter(|tagset| existing.insert(tagset.clone()))
        .count()
}

// ============================================================================
// TagSynchronizer
// ============================================================================

/// 커밋된 태그 정보를 디스패처 태그 인덱스로 전달
pub struct TagSynchronizer;

impl TagSynchronizer {
    /// 명령어별 적용할 태그셋 (admin 이 있으면 admin, 아니면 user)
    pub fn preferred(
        entry: &BTreeMap<RegistrationKind, BTreeSet<TagSet>>,
    ) -> Option<(RegistrationKind, &BTreeSet<TagSet>)> {
        [RegistrationKind::Admin, RegistrationKind::User]
            .into_iter()
            .find_map(|kind| entry.get(&kind).map(|tagsets| (kind, tagsets)))
    }

    /// 동기화, 디스패처에 새로 추가된 태그셋 수 반환
    pub fn sync(tagged: &TaggedCommands, dispatcher: &CommandDispatcher) -> usize {
        let mut added = 0;
        for (command, entry) in tagged {
            if let Some((kind, tagsets)) = Self::preferred(entry) {
                let count = dispatcher.add_tagsets(command, tagsets.iter().cloned());
                if count > 0 {
                    debug!("{} tagset(s) added to {} ({})", count, command, kind);
                }
                added += count;
            }
        }
        added
    }
}
