//! `plugins.echo` - 구형 `_initialise(handlers, bot)` 형식 플러그인

use hangar_core::{command_fn, handler_fn, CommandCall, Extension, Initializer, ModuleExports, Result};
use tracing::debug;

pub struct Echo;

impl Extension for Echo {
    fn exports(&self) -> ModuleExports {
        ModuleExports::new()
            .function("echo", command_fn(echo))
            .initializer(Initializer::legacy(|handlers, _host| {
                handlers.register_user_command(["echo"])?;
                handlers.register_handler(
                    handler_fn(|event| {
                        debug!("{} is typing in {}", event.user, event.conversation_id);
                        Ok(())
                    }),
                    "typing",
                    20,
                )?;
                Ok(None)
            }))
    }
}

fn echo(call: &CommandCall) -> Result<Option<String>> {
    if call.args.is_empty() {
        return Ok(None);
    }
    Ok(Some(call.args.join(" ")))
}
