//! Plugins bundled with the shell bot.

mod echo;
mod help;
mod ping;

pub use echo::ECHO;
pub use help::HELP;
pub use ping::PING;
