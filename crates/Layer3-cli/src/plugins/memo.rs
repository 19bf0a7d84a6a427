//! `plugins.memo` - 호스트 메모리 기반 메모

use hangar_core::{
    command_fn, CommandCall, Error, Extension, Initializer, ModuleExports, PluginApi, Result,
    TagSpec,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 다른 플러그인이 조회하는 쓰기 횟수 카운터 id
pub const WRITES_ID: &str = "memo.writes";

pub struct Memo;

impl Extension for Memo {
    fn execute(&self, api: &PluginApi) -> Result<()> {
        api.share(WRITES_ID, Arc::new(AtomicU64::new(0)))
    }

    fn exports(&self) -> ModuleExports {
        ModuleExports::new()
            .function("remember", command_fn(remember))
            .function("recall", command_fn(recall))
            .function("forget", command_fn(forget))
            .initializer(Initializer::with_host(|api| {
                api.register_admin_command(["forget"], &[TagSpec::from("memo-admin")])?;
                api.register_user_command(["remember", "recall"], &[])?;
                Ok(Some(vec![]))
            }))
    }
}

fn memo_key(call: &CommandCall) -> Result<String> {
    call.args
        .first()
        .map(|key| format!("memo.{}", key))
        .ok_or_else(|| Error::Command("missing key".into()))
}

fn remember(call: &CommandCall) -> Result<Option<String>> {
    let key = memo_key(call)?;
    let value = call.args[1..].join(" ");
    call.host.memory().set(key, Value::String(value));

    if let Some(writes) = call.host.shared().get::<AtomicU64>(WRITES_ID) {
        writes.fetch_add(1, Ordering::Relaxed);
    }
    Ok(Some("saved".into()))
}

fn recall(call: &CommandCall) -> Result<Option<String>> {
    let key = memo_key(call)?;
    Ok(call
        .host
        .memory()
        .get(&key)
        .and_then(|v| v.as_str().map(str::to_string)))
}

fn forget(call: &CommandCall) -> Result<Option<String>> {
    let key = memo_key(call)?;
    let removed = call.host.memory().remove(&key).is_some();
    Ok(Some(if removed { "forgotten" } else { "nothing to forget" }.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_core::HostRuntime;

    #[test]
    fn test_remember_then_recall() {
        let host = Arc::new(HostRuntime::default());
        let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        remember(&CommandCall::new(Arc::clone(&host), "alice", args(&["lunch", "noodles", "at", "noon"]))).unwrap();
        let reply = recall(&CommandCall::new(Arc::clone(&host), "bob", args(&["lunch"]))).unwrap();
        assert_eq!(reply.as_deref(), Some("noodles at noon"));

        let err = recall(&CommandCall::new(host, "bob", vec![])).unwrap_err();
        assert!(matches!(err, Error::Command(_)));
    }
}
