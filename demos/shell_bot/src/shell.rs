//! Line-oriented terminal adapter.

use std::sync::atomic::{AtomicBool, Ordering};

use rubo::core::CONNECTED;
use rubo::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Settings read from the `adapters.shell` configuration section.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Display name of the local user.
    pub user: String,
    /// Room name reported on every message.
    pub room: String,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            user: "Shell".into(),
            room: "Shell".into(),
        }
    }
}

/// Reads messages from stdin and prints responses to stdout.
pub struct ShellAdapter {
    settings: ShellSettings,
    closed: AtomicBool,
}

impl ShellAdapter {
    pub fn new(settings: ShellSettings) -> Self {
        Self {
            settings,
            closed: AtomicBool::new(false),
        }
    }

    fn user(&self) -> User {
        User::new("1", self.settings.user.clone()).in_room(self.settings.room.clone())
    }

    async fn write_lines(&self, lines: impl Iterator<Item = String>) -> AdapterResult<()> {
        let mut stdout = tokio::io::stdout();
        for line in lines {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        stdout.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    fn name(&self) -> &str {
        "shell"
    }

    async fn send(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AdapterError::NotConnected);
        }
        self.write_lines(strings.iter().cloned()).await
    }

    async fn emote(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.write_lines(strings.iter().map(|s| format!("* {s}"))).await
    }

    async fn run(&self, robot: Arc<Robot>) -> AdapterResult<()> {
        let user = self.user();
        robot.events().emit(CONNECTED, RobotEvent::Connected).await;
        robot.receive(Message::enter(user.clone())).await;
        info!(user = %user.name, "Shell connected, type 'exit' to quit");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                break;
            }
            let outcome = robot.receive(Message::text(user.clone(), line)).await;
            debug!(matched = outcome.matched, "Line dispatched");
        }

        robot.receive(Message::leave(user)).await;
        Ok(())
    }

    async fn close(&self) -> AdapterResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
