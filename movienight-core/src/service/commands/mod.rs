//! Slash command dispatch
//!
//! Three tables of pure handlers keyed by canonical alias. A handler gets
//! the service, a snapshot of the caller and the arguments; `Ok` text is
//! shown to the caller as a command response (nothing when empty) and
//! `Err` text as an error.

mod admin;
mod moderator;
mod user;

use std::collections::HashMap;
use tracing::{info, warn};

use super::chat::ChatService;
use crate::models::{SessionInfo, Tier};

pub type CommandResult = Result<String, String>;
pub type CommandHandler = fn(&ChatService, &SessionInfo, &[String]) -> CommandResult;

pub const NOT_MOD: &str = "You are not a mod Jebaited";
pub const NOT_ADMIN: &str = "You are not the admin Jebaited";
pub const INVALID_COMMAND: &str = "Invalid command.";

pub struct Command {
    /// First entry is the canonical name
    pub aliases: &'static [&'static str],
    pub help: &'static str,
    pub handler: CommandHandler,
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.aliases.first().copied().unwrap_or_default()
    }
}

/// One line of the help document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub alias: &'static str,
    pub help: &'static str,
    pub tier: Tier,
}

pub struct CommandRegistry {
    aliases: HashMap<&'static str, &'static str>,
    user: HashMap<&'static str, Command>,
    moderator: HashMap<&'static str, Command>,
    admin: HashMap<&'static str, Command>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut aliases = HashMap::new();
        let mut table = |commands: Vec<Command>| {
            commands
                .into_iter()
                .map(|command| {
                    for alias in command.aliases {
                        aliases.insert(*alias, command.name());
                    }
                    (command.name(), command)
                })
                .collect::<HashMap<_, _>>()
        };

        let user = table(user::commands());
        let moderator = table(moderator::commands());
        let admin = table(admin::commands());

        Self {
            aliases,
            user,
            moderator,
            admin,
        }
    }

    /// Canonical name for any alias
    #[must_use]
    pub fn canonical(&self, token: &str) -> Option<&'static str> {
        self.aliases.get(token).copied()
    }

    /// Run a command for `caller`, enforcing the table's tier
    pub fn run(
        &self,
        service: &ChatService,
        caller: &SessionInfo,
        token: &str,
        args: &[String],
    ) -> CommandResult {
        let Some(name) = self.canonical(token) else {
            info!(caller = %caller.name, command = token, "Unknown command");
            return Err(INVALID_COMMAND.to_string());
        };

        if let Some(command) = self.user.get(name) {
            info!(tier = "user", caller = %caller.name, command = name, args = %args.join(" "), "Command accepted");
            return (command.handler)(service, caller, args);
        }

        if let Some(command) = self.moderator.get(name) {
            if !caller.is_mod() {
                warn!(tier = "mod", caller = %caller.name, command = name, "Command rejected");
                return Err(NOT_MOD.to_string());
            }
            info!(tier = "mod", caller = %caller.name, command = name, args = %args.join(" "), "Command accepted");
            return (command.handler)(service, caller, args);
        }

        if let Some(command) = self.admin.get(name) {
            if !caller.is_admin() {
                warn!(tier = "admin", caller = %caller.name, command = name, "Command rejected");
                return Err(NOT_ADMIN.to_string());
            }
            info!(tier = "admin", caller = %caller.name, command = name, args = %args.join(" "), "Command accepted");
            return (command.handler)(service, caller, args);
        }

        Err(INVALID_COMMAND.to_string())
    }

    /// Every alias usable at `tier`, grouped by table and sorted
    #[must_use]
    pub fn help(&self, tier: Tier) -> Vec<HelpEntry> {
        let mut tables = vec![(Tier::User, &self.user)];
        if tier >= Tier::Mod {
            tables.push((Tier::Mod, &self.moderator));
        }
        if tier >= Tier::Admin {
            tables.push((Tier::Admin, &self.admin));
        }

        let mut entries = Vec::new();
        for (table_tier, table) in tables {
            let mut group: Vec<HelpEntry> = table
                .values()
                .flat_map(|command| {
                    command.aliases.iter().copied().map(move |alias| HelpEntry {
                        alias,
                        help: command.help,
                        tier: table_tier,
                    })
                })
                .collect();
            group.sort_by_key(|entry| entry.alias);
            entries.extend(group);
        }
        entries
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Help page link for a tier
#[must_use]
pub fn help_url(tier: Tier) -> &'static str {
    match tier {
        Tier::User => "/help",
        Tier::Mod => "/help?mod=1",
        Tier::Admin => "/help?mod=1&admin=1",
    }
}
