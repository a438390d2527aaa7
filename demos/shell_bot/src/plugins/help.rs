//! Lists the commands of every plugin loaded before this one, and answers
//! anything no other plugin understood.
//!
//! Commands:
//!   rubo help - Show all commands
//!   rubo help <query> - Show commands containing <query>

use rubo::prelude::*;
use tracing::debug;

fn register(robot: &mut Robot, _ctx: &PluginLoadContext) -> Result<(), BoxError> {
    let commands = Arc::new(robot.help_commands());

    robot.respond("(?i)help(?:\\s+(?<query>.+))?$", move |res: Response| {
        let commands = Arc::clone(&commands);
        async move {
            let query = res.named("query").map(str::to_lowercase);
            let lines: Vec<String> = commands
                .iter()
                .filter(|line| match &query {
                    Some(q) => line.to_lowercase().contains(q.as_str()),
                    None => true,
                })
                .cloned()
                .collect();

            if lines.is_empty() {
                return res.send(["No available commands match your query"]).await;
            }
            res.send(lines).await
        }
    })?;

    robot.catch_all(|res: Response| async move {
        let text = res.text().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return None;
        }
        debug!(text = %text, "Unhandled message");
        res.finish();
        Some(format!("Sorry, I don't know how to '{text}'. Try 'rubo help'."))
    });

    robot.error(|error: Arc<DispatchError>, _res| async move {
        format!("Something went wrong: {error}")
    });

    Ok(())
}

pub static HELP: PluginDescriptor = define_plugin! {
    name: "help",
    register: register,
    help: include_str!("help.rs"),
};
