//! `plugins.webhook` - 웹 리스너 그룹 예시
//!
//! 실제 HTTP 서버 대신 주기적으로 깨어나는 리스너를 띄웁니다.

use hangar_core::{Extension, ModuleExports, PluginApi, Result};
use std::time::Duration;
use tracing::debug;

const GROUP: &str = "webhook";

pub struct Webhook;

impl Extension for Webhook {
    fn execute(&self, api: &PluginApi) -> Result<()> {
        let port = api
            .config_option("webhook.port")
            .and_then(|v| v.as_u64())
            .unwrap_or(8080);

        api.start_web_listener(
            GROUP,
            Box::pin(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                loop {
                    interval.tick().await;
                    debug!("webhook listener alive on port {}", port);
                }
            }),
        )?;

        // 짧게 끝나는 준비 스레드 (종료 전 reap 대상)
        api.spawn_thread("webhook-warmup", move || {
            std::thread::sleep(Duration::from_millis(50));
            debug!("webhook warmup done for port {}", port);
        })
    }

    fn exports(&self) -> ModuleExports {
        ModuleExports::new()
    }
}
