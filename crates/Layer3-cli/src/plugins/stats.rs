//! `plugins.stats` - 가동 시간 / 하트비트

use hangar_core::{command_fn, CommandCall, Extension, ModuleExports, PluginApi, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const STARTED_ID: &str = "stats.started";
const TICKS_ID: &str = "stats.ticks";

/// 하트비트 기본 주기 (초), `stats.heartbeatSecs` 로 변경
const DEFAULT_HEARTBEAT_SECS: u64 = 30;

pub struct Stats;

impl Extension for Stats {
    fn execute(&self, api: &PluginApi) -> Result<()> {
        api.register_shared(STARTED_ID, Arc::new(Instant::now()), false)?;
        api.register_shared(TICKS_ID, Arc::new(AtomicU64::new(0)), false)
    }

    fn exports(&self) -> ModuleExports {
        ModuleExports::new().function("uptime", command_fn(uptime))
    }
}

fn uptime(call: &CommandCall) -> Result<Option<String>> {
    let Some(started) = call.host.shared().get::<Instant>(STARTED_ID) else {
        return Ok(None);
    };
    let ticks = call
        .host
        .shared()
        .get::<AtomicU64>(TICKS_ID)
        .map(|t| t.load(Ordering::Relaxed))
        .unwrap_or(0);

    Ok(Some(format!(
        "up {}s, {} heartbeat(s)",
        started.elapsed().as_secs(),
        ticks
    )))
}

/// `plugins.stats.stats_heartbeat`
pub struct Heartbeat;

impl Extension for Heartbeat {
    fn execute(&self, api: &PluginApi) -> Result<()> {
        let secs = api
            .config_option("stats.heartbeatSecs")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_HEARTBEAT_SECS)
            .max(1);

        api.start_task(move |host| async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            loop {
                interval.tick().await;
                let Some(ticks) = host.shared().get::<AtomicU64>(TICKS_ID) else {
                    debug!("stats counter gone, heartbeat stopping");
                    break;
                };
                let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("heartbeat #{}", n);
            }
            Ok(())
        })
    }

    fn exports(&self) -> ModuleExports {
        ModuleExports::new()
    }
}
