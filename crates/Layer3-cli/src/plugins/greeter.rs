//! `plugins.greeter` - hello 명령 + 메시지 로깅

use hangar_core::{command_fn, handler_fn, CommandCall, Extension, ModuleExports, PluginApi, Result};
use tracing::debug;

pub struct Greeter;

impl Extension for Greeter {
    fn execute(&self, api: &PluginApi) -> Result<()> {
        api.register_message_handler(handler_fn(|event| {
            debug!("greeter saw '{}' from {}", event.text, event.user);
            Ok(())
        }))
    }

    fn exports(&self) -> ModuleExports {
        // initializer 없음: 공개 함수가 모두 user 명령으로 등록됨
        ModuleExports::new().function("hello", command_fn(hello))
    }
}

fn hello(call: &CommandCall) -> Result<Option<String>> {
    let who = call.args.first().unwrap_or(&call.user);
    Ok(Some(format!("Hello, {}!", who)))
}
