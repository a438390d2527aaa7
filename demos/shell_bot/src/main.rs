//! Shell Bot Example
//!
//! An interactive Rubo robot driven from the terminal. Every line typed on
//! stdin is delivered to the robot as a text message from the `Shell` user,
//! and everything the robot says is printed to stdout.
//!
//! # Talking to the robot
//!
//! ```text
//! rubo ping          -> PONG
//! rubo echo hello    -> hello
//! /shout hi          -> Shell: HI
//! rubo help echo     -> lists the echo commands
//! anything else      -> answered by the catch-all
//! ```
//!
//! # Configuration
//!
//! `rubo.toml` in the working directory (or the user config directory) and
//! `RUBO_*` environment variables are picked up by the runtime:
//!
//! ```toml
//! [robot]
//! name = "rubo"
//! alias = "/"
//!
//! [adapters.shell]
//! user = "alice"
//!
//! [logging]
//! output = "stderr"
//!
//! [plugins.settings.echo]
//! prefix = "> "
//! ```
//!
//! # Usage
//!
//! ```bash
//! RUBO_ROBOT__ALIAS=/ cargo run --package shell-bot
//! ```

mod plugins;
mod shell;

use anyhow::Result;
use rubo::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use shell::{ShellAdapter, ShellSettings};

// ============================================================================
// Adapter factory
// ============================================================================

fn shell_adapter(settings: &Value) -> AdapterResult<BoxedAdapter> {
    let settings = match settings {
        Value::Null => ShellSettings::default(),
        value => ShellSettings::deserialize(value)
            .map_err(|e| AdapterError::Internal(format!("invalid shell settings: {e}")))?,
    };
    Ok(Arc::new(ShellAdapter::new(settings)))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // `help` snapshots the command list, so it is loaded last.
    let runtime = RuboRuntime::builder()
        .adapter("shell", shell_adapter)
        .plugins([&plugins::PING, &plugins::ECHO, &plugins::HELP])
        .build()?;

    runtime.run().await?;

    Ok(())
}
