use movienight_proto::{CommandType, ServerMessage};
use std::str::FromStr;
use tracing::{error, info};

use super::{Command, CommandResult};
use crate::models::{AccessMode, SessionInfo};
use crate::service::chat::ChatService;

pub(super) fn commands() -> Vec<Command> {
    vec![
        Command {
            aliases: &["mod"],
            help: "Grant moderator privileges to a user.",
            handler: mod_user,
        },
        Command {
            aliases: &["reloadplayer"],
            help: "Reload the stream player for everybody in chat.",
            handler: reload_player,
        },
        Command {
            aliases: &["reloademotes"],
            help: "Reload emotes from disk.",
            handler: reload_emotes,
        },
        Command {
            aliases: &["modpass"],
            help: "Generate a single use moderator password.",
            handler: mod_pass,
        },
        Command {
            aliases: &["iplist"],
            help: "List users and their hosts.",
            handler: ip_list,
        },
        Command {
            aliases: &["changeaccess", "hodor"],
            help: "Change the room access type: open, pin or request. Pin mode takes an optional pin.",
            handler: change_access,
        },
    ]
}

fn mod_user(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let Some(target) = args.first() else {
        return Err("Missing user to mod.".to_string());
    };
    let room = service.room();
    room.mod_session(target)?;
    room.notify_moderators(format!("{} has modded {target}", caller.name));
    Ok(format!("{target} has been modded."))
}

fn reload_player(service: &ChatService, caller: &SessionInfo, _args: &[String]) -> CommandResult {
    let room = service.room();
    room.enqueue(ServerMessage::command(CommandType::RefreshPlayer, Vec::new()))?;
    room.notify_moderators(format!("{} reloaded the player for everybody", caller.name));
    Ok("Reloading player for all chatters.".to_string())
}

fn reload_emotes(service: &ChatService, caller: &SessionInfo, _args: &[String]) -> CommandResult {
    match service.emotes().reload() {
        Ok(count) => {
            info!(name = %caller.name, count, "Emotes reloaded");
            service
                .room()
                .notify_moderators(format!("{} reloaded emotes", caller.name));
            Ok(format!("Emotes loaded: {count}"))
        }
        Err(e) => {
            error!(error = %e, "Unable to reload emotes");
            Err(format!("ERROR: {e}"))
        }
    }
}

fn mod_pass(service: &ChatService, caller: &SessionInfo, _args: &[String]) -> CommandResult {
    let password = service.settings().generate_mod_password();
    info!(name = %caller.name, "Moderator password generated");
    Ok(format!("Single use password: {password}"))
}

fn ip_list(service: &ChatService, _caller: &SessionInfo, _args: &[String]) -> CommandResult {
    let lines: Vec<String> = service
        .room()
        .hosts()
        .into_iter()
        .map(|(name, host)| format!("{name}: {host}"))
        .collect();
    Ok(lines.join("<br />"))
}

fn change_access(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let settings = service.settings();

    let Some(requested) = args.first() else {
        return Ok(format!("Room access type is: {}", settings.access_mode()));
    };
    let mode = AccessMode::from_str(requested)?;

    let pin = settings
        .set_access(mode, args.get(1).cloned())
        .map_err(|e| e.to_string())?;
    info!(name = %caller.name, mode = %mode, "Room access changed");
    service
        .room()
        .notify_moderators(format!("{} changed room access to {mode}", caller.name));

    Ok(match mode {
        AccessMode::Open => "Room access set to open".to_string(),
        AccessMode::Pin => format!("Room access set to Pin: {pin}"),
        AccessMode::Request => "Room access set to request. WARNING: this isn't implemented yet.".to_string(),
    })
}
