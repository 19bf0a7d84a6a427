//! Built-in demo plugins
//!
//! 각 플러그인은 lifecycle 기능 하나 이상을 사용합니다.
//!
//! | path | 사용 기능 |
//! |------|-----------|
//! | `plugins.greeter` | 암묵적 명령 등록, message 핸들러 |
//! | `plugins.memo` | 명시적 initializer, admin 명령, 태그, 공유 객체 |
//! | `plugins.echo` | legacy initializer, typing 핸들러 |
//! | `plugins.stats` | 공유 객체, 호스트 옵션 |
//! | `plugins.stats.stats_heartbeat` | 비동기 태스크 |
//! | `plugins.webhook` | 웹 리스너 그룹, 스레드 |

mod echo;
mod greeter;
mod memo;
mod stats;
mod webhook;

use hangar_core::{Extension, PluginCatalog};

/// 내장 플러그인 카탈로그
pub fn builtin_catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with("plugins.greeter", || Box::new(greeter::Greeter) as Box<dyn Extension>)
        .with("plugins.memo", || Box::new(memo::Memo) as Box<dyn Extension>)
        .with("plugins.echo", || Box::new(echo::Echo) as Box<dyn Extension>)
        .with("plugins.stats", || Box::new(stats::Stats) as Box<dyn Extension>)
        .with("plugins.stats.stats_heartbeat", || {
            Box::new(stats::Heartbeat) as Box<dyn Extension>
        })
        .with("plugins.webhook", || Box::new(webhook::Webhook) as Box<dyn Extension>)
}
