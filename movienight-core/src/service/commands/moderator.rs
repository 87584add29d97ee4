use movienight_proto::{CommandType, MessageType, ServerMessage, Tier};
use tracing::info;

use super::{Command, CommandResult};
use crate::models::{AccessMode, SessionInfo};
use crate::service::chat::ChatService;
use crate::service::formatting::{format_links, truncate_escaped, unescape_html};

pub(super) fn commands() -> Vec<Command> {
    vec![
        Command {
            aliases: &["sv"],
            help: "Send a server announcement message. It will show up red with a border in chat.",
            handler: sv,
        },
        Command {
            aliases: &["playing"],
            help: "Set the title text and info link. No arguments clears it.",
            handler: playing,
        },
        Command {
            aliases: &["unmod"],
            help: "Revoke a user's moderator privileges. Moderators can only unmod themselves.",
            handler: unmod,
        },
        Command {
            aliases: &["kick"],
            help: "Kick a user from chat.",
            handler: kick,
        },
        Command {
            aliases: &["ban"],
            help: "Ban a user from chat. They will not be able to re-join chat, but will still be able to view the stream.",
            handler: ban,
        },
        Command {
            aliases: &["unban"],
            help: "Remove a ban on a user.",
            handler: unban,
        },
        Command {
            aliases: &["purge"],
            help: "Purge the chat for everyone.",
            handler: purge,
        },
        Command {
            aliases: &["pin", "password"],
            help: "Show the room access mode and pin.",
            handler: pin,
        },
    ]
}

fn sv(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    if args.is_empty() {
        return Err("Missing message".to_string());
    }
    let text = format_links(&service.emotes().substitute(&args.join(" ")));
    let room = service.room();
    room.enqueue(ServerMessage::chat(
        caller.name.clone(),
        caller.color.clone(),
        text,
        caller.tier,
        MessageType::Server,
    ))?;
    room.notify_moderators(format!("{} sent a server message", caller.name));
    Ok(String::new())
}

fn playing(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let room = service.room();

    if args.is_empty() {
        room.clear_playing()?;
        room.notify_moderators(format!("{} cleared the playing title", caller.name));
        return Ok(String::new());
    }

    let mut link = String::new();
    let mut title = Vec::new();
    for word in args {
        let unescaped = unescape_html(word);
        if unescaped.starts_with("http://") || unescaped.starts_with("https://") {
            // The client drops the link straight into an href
            if unescaped.contains(['"', '\'', '<', '>']) {
                return Err(format!("Invalid link: {word}"));
            }
            link = unescaped;
        } else {
            title.push(word.as_str());
        }
    }

    let title = title.join(" ");
    let title = truncate_escaped(&title, service.settings().title_length());
    info!(name = %caller.name, title, link = %link, "Playing set");
    room.set_playing(title, link)?;
    room.notify_moderators(format!("{} changed the playing title", caller.name));
    Ok(String::new())
}

fn unmod(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let room = service.room();

    let Some(target) = args.first() else {
        room.set_tier(&caller.id, Tier::User)?;
        room.notify_moderators(format!("{} has unmodded themselves", caller.name));
        return Ok("You have unmodded yourself.".to_string());
    };

    if !caller.is_admin() {
        return Err("You can only unmod yourself, not others.".to_string());
    }

    room.unmod(target)?;
    room.notify_moderators(format!("{} has unmodded {target}", caller.name));
    Ok(format!("{target} has been unmodded."))
}

fn kick(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let Some(target) = args.first() else {
        return Err("Missing name to kick.".to_string());
    };
    let room = service.room();
    room.kick(target)?;
    room.notify_moderators(format!("{} has kicked {target}", caller.name));
    Ok(String::new())
}

fn ban(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let Some(target) = args.first() else {
        return Err("missing name to ban.".to_string());
    };
    info!(name = %caller.name, target = %target, "Attempting ban");

    let room = service.room();
    let names = room.ban(target)?;
    room.notify_moderators(format!("{} has banned {}", caller.name, names.join(", ")));
    Ok(String::new())
}

fn unban(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let Some(target) = args.first() else {
        return Err("missing name to unban.".to_string());
    };
    info!(name = %caller.name, target = %target, "Attempting unban");

    match service.settings().remove_ban(target) {
        Ok(true) => {
            service
                .room()
                .notify_moderators(format!("{} has unbanned {target}", caller.name));
            Ok(format!("{target} has been unbanned."))
        }
        Ok(false) => Err(format!("No ban found for {target}")),
        Err(e) => Err(e.to_string()),
    }
}

fn purge(service: &ChatService, caller: &SessionInfo, _args: &[String]) -> CommandResult {
    let room = service.room();
    room.enqueue(ServerMessage::command(CommandType::PurgeChat, Vec::new()))?;
    room.notify_moderators(format!("{} has purged the chat", caller.name));
    Ok(String::new())
}

fn pin(service: &ChatService, _caller: &SessionInfo, _args: &[String]) -> CommandResult {
    let settings = service.settings();
    match settings.access_mode() {
        AccessMode::Pin => Ok(format!("Room access type is: pin, Pin: {}", settings.pin())),
        mode => Ok(format!("Room access type is: {mode}")),
    }
}
