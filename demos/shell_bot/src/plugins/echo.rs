//! Echoes text back, optionally with a configured prefix.
//!
//! Configuration:
//!   plugins.settings.echo.prefix - Text put in front of every echo
//!
//! Commands:
//!   rubo echo <text> - Reply with <text>
//!   rubo shout <text> - Reply with <text> in upper case

use serde::Deserialize;

use rubo::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EchoSettings {
    prefix: String,
}

fn register(robot: &mut Robot, ctx: &PluginLoadContext) -> Result<(), BoxError> {
    let settings: EchoSettings = ctx.get_config()?;
    let prefix = Arc::new(settings.prefix);

    let echo_prefix = Arc::clone(&prefix);
    robot.respond("(?i)echo (?<text>.+)$", move |res: Response| {
        let prefix = Arc::clone(&echo_prefix);
        async move { format!("{prefix}{}", res.named("text").unwrap_or_default()) }
    })?;

    robot.respond("(?i)shout (.+)$", move |res: Response| {
        let prefix = Arc::clone(&prefix);
        async move {
            let text = res.group(1).unwrap_or_default().to_uppercase();
            res.reply([format!("{prefix}{text}")]).await
        }
    })?;

    Ok(())
}

pub static ECHO: PluginDescriptor = define_plugin! {
    name: "echo",
    register: register,
    help: include_str!("echo.rs"),
};
