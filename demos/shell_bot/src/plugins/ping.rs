//! Liveness checks.
//!
//! Commands:
//!   rubo ping - Reply with PONG
//!   rubo time - Reply with the current Unix time

use std::time::{SystemTime, UNIX_EPOCH};

use rubo::prelude::*;

fn register(robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
    robot.respond("(?i)ping$", |_res| async { "PONG".to_string() })?;

    robot.respond("(?i)time$", |_res| async {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
        Ok::<_, BoxError>(format!("Server time is {}", now.as_secs()))
    })?;

    Ok(())
}

pub static PING: PluginDescriptor = define_plugin! {
    name: "ping",
    register: register,
    help: include_str!("ping.rs"),
};
