//! Extension 라이프사이클 통합 테스트
//!
//! `cargo test -p hangar-core --test lifecycle_test`

use hangar_core::plugin::InitResult;
use hangar_core::{
    command_fn, handler_fn, CommandCall, Error, EventKind, Extension, ExtensionManager,
    HostConfig, HostEvent, HostRuntime, Initializer, LifecycleKind, Memory, ModuleExports,
    PluginApi, PluginCatalog, Result, TagSet, TagSpec,
};
use hangar_foundation::TagAutoRegister;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// ============================================================================
// 테스트용 extension
// ============================================================================

type ExecuteFn = Arc<dyn Fn(&PluginApi) -> Result<()> + Send + Sync>;
type InitFn = Arc<dyn Fn(&PluginApi) -> InitResult + Send + Sync>;

/// 공개 함수 목록 + 선택적 execute / initializer
#[derive(Clone, Default)]
struct Scripted {
    functions: Vec<&'static str>,
    on_execute: Option<ExecuteFn>,
    on_init: Option<InitFn>,
}

impl Scripted {
    fn new(functions: &[&'static str]) -> Self {
        Self {
            functions: functions.to_vec(),
            ..Self::default()
        }
    }

    fn execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&PluginApi) -> Result<()> + Send + Sync + 'static,
    {
        self.on_execute = Some(Arc::new(f));
        self
    }

    fn init<F>(mut self, f: F) -> Self
    where
        F: Fn(&PluginApi) -> InitResult + Send + Sync + 'static,
    {
        self.on_init = Some(Arc::new(f));
        self
    }
}

impl Extension for Scripted {
    fn execute(&self, api: &PluginApi) -> Result<()> {
        match &self.on_execute {
            Some(f) => f(api),
            None => Ok(()),
        }
    }

    fn exports(&self) -> ModuleExports {
        let mut exports = ModuleExports::new();
        for name in &self.functions {
            let reply = name.to_string();
            exports = exports.function(*name, command_fn(move |_| Ok(Some(reply.clone()))));
        }
        if let Some(init) = &self.on_init {
            let init = Arc::clone(init);
            exports = exports.initializer(Initializer::with_host(move |api| init(api)));
        }
        exports
    }
}

fn catalog(entries: Vec<(&'static str, Scripted)>) -> PluginCatalog {
    entries
        .into_iter()
        .fold(PluginCatalog::new(), |catalog, (path, extension)| {
            catalog.with(path, move || Box::new(extension.clone()) as Box<dyn Extension>)
        })
}

fn manager_with(host: Arc<HostRuntime>, entries: Vec<(&'static str, Scripted)>) -> ExtensionManager {
    ExtensionManager::new(host, catalog(entries))
}

fn manager(entries: Vec<(&'static str, Scripted)>) -> ExtensionManager {
    manager_with(Arc::new(HostRuntime::default()), entries)
}

fn host_without_auto_tags() -> Arc<HostRuntime> {
    let config = HostConfig::new().auto_register(TagAutoRegister::Enabled(false));
    Arc::new(HostRuntime::new(config, Memory::in_memory()))
}

fn tagset(tags: &[&str]) -> TagSet {
    tags.iter().map(|t| t.to_string()).collect()
}

/// 신호를 받을 때까지 살아있는 스레드를 띄우는 extension
fn thread_holder(functions: &[&'static str]) -> (Scripted, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel::<()>();
    let rx = Arc::new(Mutex::new(Some(rx)));

    let extension = Scripted::new(functions).execute(move |api| {
        let rx = rx.lock().take();
        api.spawn_thread("holder", move || {
            if let Some(rx) = rx {
                let _ = rx.recv();
            }
        })
    });
    (extension, tx)
}

async fn reap_until_idle(manager: &ExtensionManager, path: &str) -> usize {
    let mut remaining = usize::MAX;
    for _ in 0..200 {
        remaining = manager.reap_threads(path).await.unwrap();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    remaining
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn test_duplicate_load_is_rejected() {
    let manager = manager(vec![("plugins.hello", Scripted::new(&["hello"]))]);

    assert!(manager.load("plugins.hello").await.unwrap());
    let err = manager.load("plugins.hello").await.unwrap_err();

    assert!(matches!(err, Error::DuplicateExtension(_)));
    assert_eq!(manager.loaded().len(), 1);
    assert_eq!(manager.dispatcher().command_names(), vec!["hello"]);
}

#[tokio::test]
async fn test_implicit_registration_without_initializer() {
    let manager = manager(vec![("plugins.hello", Scripted::new(&["hello"]))]);

    let summary = manager.try_load("plugins.hello").await.unwrap();
    assert_eq!(summary.user_commands, vec!["hello"]);
    assert!(summary.admin_commands.is_empty());

    let record = manager.summary("plugins.hello").unwrap();
    assert_eq!(record.user_commands, vec!["hello"]);
    assert!(record.admin_commands.is_empty());
    assert!(!manager.dispatcher().is_admin("hello"));

    let call = CommandCall::new(Arc::clone(manager.host()), "alice", vec![]);
    let reply = manager.dispatcher().run("hello", &call).await.unwrap();
    assert_eq!(reply.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_empty_initializer_list_registers_nothing() {
    let manager = manager(vec![(
        "plugins.quiet",
        Scripted::new(&["foo", "bar"]).init(|_| Ok(Some(vec![]))),
    )]);

    let summary = manager.try_load("plugins.quiet").await.unwrap();

    assert_eq!(summary.describe(), "no commands");
    assert!(manager.dispatcher().resolve("foo").is_none());
    assert!(manager.dispatcher().resolve("bar").is_none());
    assert!(manager.summary("plugins.quiet").unwrap().registered.is_empty());
}

#[tokio::test]
async fn test_initializer_list_selects_commands() {
    let manager = manager(vec![(
        "plugins.picky",
        Scripted::new(&["foo", "bar"]).init(|api| {
            api.register_admin_command(["bar"], &[])?;
            Ok(Some(vec!["foo".to_string()]))
        }),
    )]);

    let summary = manager.try_load("plugins.picky").await.unwrap();

    assert_eq!(summary.describe(), "*bar, foo");
    assert!(manager.dispatcher().is_admin("bar"));
    assert!(!manager.dispatcher().is_admin("foo"));
}

#[tokio::test]
async fn test_initializer_error_leaves_no_trace() {
    let manager = manager(vec![(
        "plugins.broken",
        Scripted::new(&["boom"]).init(|api| {
            api.register_message_handler(handler_fn(|_| Ok(())))?;
            api.register_user_command(["boom"], &[])?;
            Err(Error::Internal("init exploded".into()))
        }),
    )]);

    assert!(!manager.load("plugins.broken").await.unwrap());
    assert!(!manager.is_loaded("plugins.broken"));
    assert!(manager.dispatcher().resolve("boom").is_none());
    assert!(manager.dispatcher().tagsets("boom").is_empty());
    assert_eq!(manager.handlers().count_owned_by("plugins.broken"), 0);

    let err = manager.try_load("plugins.broken").await.unwrap_err();
    assert!(matches!(err, Error::InitFailure { .. }));
}

#[tokio::test]
async fn test_unknown_module_is_import_failure() {
    let manager = manager(vec![]);

    assert!(!manager.load("plugins.ghost").await.unwrap());
    let err = manager.try_load("plugins.ghost").await.unwrap_err();
    assert!(matches!(err, Error::ImportFailure { .. }));
}

#[tokio::test]
async fn test_initializer_name_without_convention_fails() {
    struct Misnamed;

    impl Extension for Misnamed {
        fn exports(&self) -> ModuleExports {
            ModuleExports::new().function("_initialise", command_fn(|_| Ok(None)))
        }
    }

    let catalog = PluginCatalog::new().with("plugins.misnamed", || Box::new(Misnamed) as Box<dyn Extension>);
    let manager = ExtensionManager::new(Arc::new(HostRuntime::default()), catalog);

    let err = manager.try_load("plugins.misnamed").await.unwrap_err();
    assert!(matches!(err, Error::InitFailure { .. }));
}

#[tokio::test]
async fn test_legacy_initializer_registers_through_handlers() {
    struct Legacy;

    impl Extension for Legacy {
        fn exports(&self) -> ModuleExports {
            ModuleExports::new()
                .function("purge", command_fn(|_| Ok(None)))
                .initializer(Initializer::legacy(|handlers, _host| {
                    handlers.register_admin_command(["purge"])?;
                    handlers.register_handler(handler_fn(|_| Ok(())), "typing", 5)?;
                    Ok(Some(vec![]))
                }))
        }
    }

    let catalog = PluginCatalog::new().with("plugins.legacy", || Box::new(Legacy) as Box<dyn Extension>);
    let manager = ExtensionManager::new(Arc::new(HostRuntime::default()), catalog);

    assert!(manager.load("plugins.legacy").await.unwrap());
    assert!(manager.dispatcher().is_admin("purge"));
    assert_eq!(manager.handlers().handlers_for(EventKind::Typing).len(), 1);
}

#[tokio::test]
async fn test_reload_reexecutes_module() {
    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let manager = manager(vec![(
        "plugins.counter",
        Scripted::new(&[]).execute(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    )]);

    manager.load("plugins.counter").await.unwrap();
    manager.unload("plugins.counter").await.unwrap();
    let summary = manager.try_load("plugins.counter").await.unwrap();

    assert!(summary.reloaded);
    assert_eq!(executions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_command_owned_by_other_extension_fails_load() {
    let manager = manager(vec![
        ("plugins.first", Scripted::new(&["ping"])),
        ("plugins.second", Scripted::new(&["ping"])),
    ]);

    assert!(manager.load("plugins.first").await.unwrap());
    assert!(!manager.load("plugins.second").await.unwrap());

    assert_eq!(
        manager.dispatcher().owner("ping").as_deref(),
        Some("plugins.first")
    );
    assert!(!manager.is_loaded("plugins.second"));
}

#[tokio::test]
async fn test_api_outside_load_is_rejected() {
    let stash: Arc<Mutex<Option<PluginApi>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&stash);
    let manager = manager(vec![(
        "plugins.sneaky",
        Scripted::new(&["hello"]).execute(move |api| {
            *slot.lock() = Some(api.clone());
            Ok(())
        }),
    )]);

    assert!(manager.load("plugins.sneaky").await.unwrap());

    let api = stash.lock().clone().unwrap();
    assert!(!api.is_open());
    let err = api.register_user_command(["late"], &[]).unwrap_err();
    assert!(matches!(err, Error::NoOpenContext { .. }));
    assert!(manager.dispatcher().resolve("late").is_none());
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn test_tagsets_union_without_duplicates() {
    let manager = manager_with(
        host_without_auto_tags(),
        vec![(
            "plugins.weather",
            Scripted::new(&["forecast"]).init(|api| {
                api.register_user_command(["forecast"], &[TagSpec::from("alpha")])?;
                api.register_user_command(["forecast"], &[TagSpec::from(vec!["alpha", "beta"])])?;
                api.register_user_command(["forecast"], &[TagSpec::from("alpha")])?;
                Ok(None)
            }),
        )],
    );

    assert!(manager.load("plugins.weather").await.unwrap());

    let tagsets = manager.dispatcher().tagsets("forecast");
    assert_eq!(tagsets.len(), 2);
    assert!(tagsets.contains(&tagset(&["alpha"])));
    assert!(tagsets.contains(&tagset(&["alpha", "beta"])));
}

#[tokio::test]
async fn test_admin_tagsets_win_at_sync() {
    let manager = manager_with(
        host_without_auto_tags(),
        vec![(
            "plugins.ops",
            Scripted::new(&["restart"]).init(|api| {
                api.register_user_command(["restart"], &[TagSpec::from("user-only")])?;
                api.register_admin_command(["restart"], &[TagSpec::from("admin-only")])?;
                Ok(None)
            }),
        )],
    );

    assert!(manager.load("plugins.ops").await.unwrap());

    let tagsets = manager.dispatcher().tagsets("restart");
    assert_eq!(tagsets.len(), 1);
    assert!(tagsets.contains(&tagset(&["admin-only"])));
    assert!(manager.dispatcher().is_admin("restart"));
}

#[tokio::test]
async fn test_default_presets_follow_plugin_name() {
    let manager = manager(vec![("plugins.games.games_quiz", Scripted::new(&["quiz"]))]);

    assert!(manager.load("plugins.games.games_quiz").await.unwrap());

    let tagsets = manager.dispatcher().tagsets("quiz");
    assert!(tagsets.contains(&tagset(&["games_quiz-quiz"])));
    assert!(tagsets.contains(&tagset(&["games_quiz-user"])));
    assert_eq!(manager.summary("plugins.games.games_quiz").unwrap().user_commands, vec!["quiz"]);
}

// ============================================================================
// Unload
// ============================================================================

#[tokio::test]
async fn test_unload_unknown_mutates_nothing() {
    let manager = manager(vec![("plugins.hello", Scripted::new(&["hello"]))]);
    manager.load("plugins.hello").await.unwrap();

    let err = manager.unload("plugins.nope").await.unwrap_err();

    assert!(matches!(err, Error::ExtensionNotFound(_)));
    assert!(manager.is_loaded("plugins.hello"));
    assert_eq!(manager.dispatcher().len(), 1);
}

#[tokio::test]
async fn test_busy_extension_unloads_after_threads_reaped() {
    let (extension, release) = thread_holder(&["poll"]);
    let manager = manager(vec![("plugins.poller", extension)]);
    assert!(manager.load("plugins.poller").await.unwrap());

    let err = manager.unload("plugins.poller").await.unwrap_err();
    assert!(matches!(err, Error::BusyResource { threads: 1, .. }));
    assert!(manager.is_loaded("plugins.poller"));
    assert!(manager.dispatcher().resolve("poll").is_some());

    release.send(()).unwrap();
    assert_eq!(reap_until_idle(&manager, "plugins.poller").await, 0);

    assert!(manager.unload("plugins.poller").await.unwrap());
    assert!(manager.dispatcher().resolve("poll").is_none());
}

#[tokio::test]
async fn test_unload_removes_handlers() {
    let manager = manager(vec![(
        "plugins.listener",
        Scripted::new(&[]).execute(|api| {
            api.register_handler(handler_fn(|_| Ok(())), EventKind::Message, 10)
        }),
    )]);

    manager.load("plugins.listener").await.unwrap();
    assert_eq!(manager.handlers().count_owned_by("plugins.listener"), 1);
    assert_eq!(
        manager
            .handlers()
            .emit(&HostEvent::message("c1", "alice", "hi"))
            .await,
        1
    );

    manager.unload("plugins.listener").await.unwrap();
    assert_eq!(manager.handlers().count_owned_by("plugins.listener"), 0);
    assert!(manager.handlers().is_empty());
}

#[tokio::test]
async fn test_unload_cancels_tasks_and_terminates_listeners() {
    let sentinel = Arc::new(());
    let task_ref = Arc::clone(&sentinel);
    let manager = manager(vec![(
        "plugins.web",
        Scripted::new(&[]).execute(move |api| {
            let held = Arc::clone(&task_ref);
            api.start_task(move |_host| async move {
                let _held = held;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })?;
            api.start_web_listener(
                "hooks",
                Box::pin(tokio::time::sleep(Duration::from_secs(3600))),
            )
        }),
    )]);

    assert!(manager.load("plugins.web").await.unwrap());
    let with_task = Arc::strong_count(&sentinel);
    assert_eq!(manager.host().web().active_groups(), vec!["hooks"]);
    assert_eq!(manager.summary("plugins.web").unwrap().tasks, 1);

    manager.unload("plugins.web").await.unwrap();
    assert!(manager.host().web().active_groups().is_empty());

    for _ in 0..200 {
        if Arc::strong_count(&sentinel) < with_task {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(Arc::strong_count(&sentinel), with_task - 1);
}

#[tokio::test]
async fn test_unload_all_reports_busy_and_continues() {
    let (busy, release) = thread_holder(&["b"]);
    let manager = manager(vec![
        ("plugins.a", Scripted::new(&["a"])),
        ("plugins.b", busy),
        ("plugins.c", Scripted::new(&["c"])),
    ]);
    for path in ["plugins.a", "plugins.b", "plugins.c"] {
        assert!(manager.load(path).await.unwrap());
    }

    let report = manager.unload_all().await;

    assert_eq!(report.unloaded, vec!["plugins.a", "plugins.c"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "plugins.b");
    assert!(matches!(report.failed[0].1, Error::BusyResource { .. }));
    assert!(!report.is_clean());

    assert!(manager.is_loaded("plugins.b"));
    assert_eq!(manager.dispatcher().command_names(), vec!["b"]);

    release.send(()).unwrap();
}

// ============================================================================
// Shared objects
// ============================================================================

#[tokio::test]
async fn test_shared_conflict_respects_forgiving() {
    let manager = manager(vec![
        (
            "plugins.owner",
            Scripted::new(&[]).execute(|api| api.register_shared("db", Arc::new(1u32), false)),
        ),
        (
            "plugins.strict",
            Scripted::new(&[]).execute(|api| api.register_shared("db", Arc::new(2u32), false)),
        ),
        (
            "plugins.lenient",
            Scripted::new(&[]).execute(|api| api.share("db", Arc::new(3u32))),
        ),
    ]);

    assert!(manager.load("plugins.owner").await.unwrap());
    assert!(!manager.load("plugins.strict").await.unwrap());
    assert_eq!(*manager.host().shared().get::<u32>("db").unwrap(), 1);

    assert!(manager.load("plugins.lenient").await.unwrap());
    assert_eq!(*manager.host().shared().get::<u32>("db").unwrap(), 3);
}

#[tokio::test]
async fn test_unload_removes_shared_objects() {
    let manager = manager(vec![(
        "plugins.owner",
        Scripted::new(&[]).execute(|api| api.share("cache", Arc::new(String::from("warm")))),
    )]);

    manager.load("plugins.owner").await.unwrap();
    assert!(manager.host().shared().contains("cache"));

    manager.unload("plugins.owner").await.unwrap();
    assert!(!manager.host().shared().contains("cache"));
}

// ============================================================================
// Batch load / events
// ============================================================================

#[tokio::test]
async fn test_load_configured_follows_enabled_list() {
    let config = HostConfig::new().enabled_plugins(vec![
        "hello".into(),
        "broken".into(),
        "games_quiz".into(),
        "ghost".into(),
    ]);
    let host = Arc::new(HostRuntime::new(config, Memory::in_memory()));
    let manager = manager_with(
        host,
        vec![
            ("plugins.hello", Scripted::new(&["hello"])),
            (
                "plugins.broken",
                Scripted::new(&[]).init(|_| Err(Error::Internal("nope".into()))),
            ),
            ("plugins.games.games_quiz", Scripted::new(&["quiz"])),
            ("plugins.unlisted", Scripted::new(&["unlisted"])),
        ],
    );

    let report = manager.load_configured().await;

    assert_eq!(
        report.loaded,
        vec!["plugins.hello", "plugins.games.games_quiz"]
    );
    assert_eq!(report.failed, vec!["plugins.broken"]);
    assert!(!manager.is_loaded("plugins.unlisted"));
}

#[tokio::test]
async fn test_lifecycle_events_are_published() {
    let manager = manager(vec![
        ("plugins.hello", Scripted::new(&["hello"])),
        (
            "plugins.broken",
            Scripted::new(&[]).init(|_| Err(Error::Internal("nope".into()))),
        ),
    ]);
    let mut events = manager.subscribe();

    manager.load("plugins.hello").await.unwrap();
    manager.load("plugins.broken").await.unwrap();
    manager.unload("plugins.hello").await.unwrap();

    let kinds: Vec<(LifecycleKind, String)> = (0..3)
        .map(|_| {
            let event = events.try_recv().unwrap();
            (event.kind, event.path)
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            (LifecycleKind::Loaded, "plugins.hello".to_string()),
            (LifecycleKind::LoadFailed, "plugins.broken".to_string()),
            (LifecycleKind::Unloaded, "plugins.hello".to_string()),
        ]
    );
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn test_unload_keeps_tags_of_command_owned_elsewhere() {
    let manager = manager(vec![
        ("plugins.owner", Scripted::new(&["ping"])),
        (
            "plugins.borrower",
            Scripted::new(&[]).init(|_| Ok(Some(vec!["ping".to_string()]))),
        ),
    ]);

    assert!(manager.load("plugins.owner").await.unwrap());
    let before = manager.dispatcher().tagsets("ping");
    assert_eq!(before.len(), 2);
    assert!(before.contains(&tagset(&["owner-ping"])));
    assert!(before.contains(&tagset(&["owner-user"])));

    // 바인딩하지 않은 명령어의 태그는 추가되지 않음
    assert!(manager.load("plugins.borrower").await.unwrap());
    assert_eq!(manager.dispatcher().tagsets("ping"), before);

    manager.unload("plugins.borrower").await.unwrap();
    assert_eq!(manager.dispatcher().tagsets("ping"), before);
    assert_eq!(
        manager.dispatcher().owner("ping").as_deref(),
        Some("plugins.owner")
    );
}

#[tokio::test]
async fn test_failed_load_stops_tasks_and_listeners() {
    let sentinel = Arc::new(());
    let task_ref = Arc::clone(&sentinel);
    let manager = manager(vec![(
        "plugins.halfway",
        Scripted::new(&[])
            .execute(move |api| {
                let held = Arc::clone(&task_ref);
                api.start_task(move |_host| async move {
                    let _held = held;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                })?;
                api.start_web_listener(
                    "halfway",
                    Box::pin(tokio::time::sleep(Duration::from_secs(3600))),
                )
            })
            .init(|_| Err(Error::Internal("init exploded".into()))),
    )]);

    assert!(!manager.load("plugins.halfway").await.unwrap());
    assert!(!manager.is_loaded("plugins.halfway"));
    assert!(manager.host().web().active_groups().is_empty());

    // sentinel + execute 클로저만 남아야 함
    for _ in 0..200 {
        if Arc::strong_count(&sentinel) == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(Arc::strong_count(&sentinel), 2);
}

#[tokio::test]
async fn test_unload_detects_command_removed_behind_manager() {
    let manager = manager(vec![("plugins.hello", Scripted::new(&["hello"]))]);
    manager.load("plugins.hello").await.unwrap();

    manager.dispatcher().unregister("hello");

    let err = manager.unload("plugins.hello").await.unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
    assert!(manager.is_loaded("plugins.hello"));
}

#[tokio::test]
async fn test_unload_detects_handlers_removed_behind_manager() {
    let manager = manager(vec![(
        "plugins.listener",
        Scripted::new(&["listen"]).execute(|api| api.register_message_handler(handler_fn(|_| Ok(())))),
    )]);
    manager.load("plugins.listener").await.unwrap();

    assert_eq!(manager.handlers().remove_owned_by("plugins.listener"), 1);

    let err = manager.unload("plugins.listener").await.unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
    assert!(manager.is_loaded("plugins.listener"));
    assert!(manager.dispatcher().resolve("listen").is_some());
}
