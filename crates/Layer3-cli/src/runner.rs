//! Host driver - 플러그인 로드 / 명령 실행 / 종료

use crate::plugins;
use hangar_core::{
    module_path, CommandCall, ExtensionManager, HostConfig, HostEvent, HostRuntime, Memory,
};
use std::sync::Arc;
use std::time::Duration;

/// `hangar run` 옵션
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub once: bool,
    pub command: Option<String>,
    pub user: String,
    pub admin: bool,
}

/// 발견 / 설정된 플러그인 출력
pub fn list(config: &HostConfig) -> anyhow::Result<()> {
    let catalog = plugins::builtin_catalog();
    let discovered = catalog.retrieve_all();
    let configured = catalog.configured(config.plugins.enabled.as_deref());

    println!("\nDiscovered plugins\n");
    for name in &discovered {
        let mark = if configured.contains(name) { "✓" } else { " " };
        println!("  [{}] {}", mark, module_path(name));
    }
    println!("\n{} discovered, {} configured\n", discovered.len(), configured.len());

    Ok(())
}

/// 플러그인 로드 후 Ctrl-C 까지 실행
pub async fn run(config: HostConfig, memory: Memory, options: RunOptions) -> anyhow::Result<()> {
    let host = Arc::new(HostRuntime::new(config, memory));
    let manager = ExtensionManager::new(Arc::clone(&host), plugins::builtin_catalog());

    let report = manager.load_configured().await;
    if !report.failed.is_empty() {
        eprintln!("Failed to load: {}", report.failed.join(", "));
    }

    print_loaded(&manager);

    // 샘플 메시지 이벤트
    let event = HostEvent::message("console", options.user.clone(), "hangar started");
    let handled = manager.handlers().emit(&event).await;
    tracing::debug!("startup message handled by {} handler(s)", handled);

    if let Some(line) = &options.command {
        run_command(&manager, &host, line, &options).await;
    }

    if !options.once {
        println!("Running. Press Ctrl-C to stop.");
        tokio::signal::ctrl_c().await?;
        println!();
    }

    shutdown(&manager).await;
    host.memory().save()?;

    Ok(())
}

async fn run_command(manager: &ExtensionManager, host: &Arc<HostRuntime>, line: &str, options: &RunOptions) {
    let mut parts = line.split_whitespace().map(str::to_string);
    let Some(name) = parts.next() else {
        return;
    };

    let mut call = CommandCall::new(Arc::clone(host), options.user.clone(), parts.collect())
        .in_conversation("console");
    if options.admin {
        call = call.as_admin();
    }

    match manager.dispatcher().run(&name, &call).await {
        Ok(Some(reply)) => println!("{}", reply),
        Ok(None) => {}
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn print_loaded(manager: &ExtensionManager) {
    let loaded = manager.loaded();
    if loaded.is_empty() {
        println!("No plugins loaded.");
        return;
    }

    println!("\n{:<32} {:<8} {:<8} {:<8}", "Plugin", "Admin", "User", "Handlers");
    println!("{}", "-".repeat(60));
    for summary in loaded {
        println!(
            "{:<32} {:<8} {:<8} {:<8}",
            summary.path,
            summary.admin_commands.len(),
            summary.user_commands.len(),
            summary.handlers
        );
    }
    println!();
}

/// 끝난 스레드 정리 후 전체 언로드
async fn shutdown(manager: &ExtensionManager) {
    for summary in manager.loaded() {
        if summary.threads == 0 {
            continue;
        }
        for _ in 0..50 {
            match manager.reap_threads(&summary.path).await {
                Ok(0) => break,
                Ok(_) => tokio::time::sleep(Duration::from_millis(20)).await,
                Err(e) => {
                    tracing::warn!("{}: {}", summary.path, e);
                    break;
                }
            }
        }
    }

    let report = manager.unload_all().await;
    for (path, error) in &report.failed {
        eprintln!("Failed to unload {}: {}", path, error);
    }
    tracing::info!("unloaded {} plugin(s)", report.unloaded.len());
}
