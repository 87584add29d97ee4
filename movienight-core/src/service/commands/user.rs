use movienight_proto::{ClientDataType, CommandType, MessageType, ServerMessage, Tier};
use tracing::{info, warn};

use super::{help_url, Command, CommandResult, NOT_ADMIN};
use crate::models::SessionInfo;
use crate::service::chat::ChatService;
use crate::service::colors::{is_valid_color, random_color};
use crate::service::formatting::unescape_html;

pub(super) fn commands() -> Vec<Command> {
    vec![
        Command {
            aliases: &["me"],
            help: "Display an action message.",
            handler: me,
        },
        Command {
            aliases: &["help"],
            help: "This help text.",
            handler: help,
        },
        Command {
            aliases: &["count"],
            help: "Display number of users in chat.",
            handler: count,
        },
        Command {
            aliases: &["color", "colour"],
            help: "Change user color. No argument picks a random color.",
            handler: color,
        },
        Command {
            aliases: &["whoami", "w"],
            help: "Shows debug user info.",
            handler: whoami,
        },
        Command {
            aliases: &["auth"],
            help: "Authenticate to admin or moderator.",
            handler: auth,
        },
        Command {
            aliases: &["users"],
            help: "Show a list of users in chat.",
            handler: users,
        },
        Command {
            aliases: &["nick", "name"],
            help: "Change display name. Admins can rename others with /nick old new.",
            handler: nick,
        },
        Command {
            aliases: &["stats"],
            help: "Show chat statistics.",
            handler: stats,
        },
    ]
}

fn me(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    if args.is_empty() {
        return Ok(String::new());
    }
    let text = service.emotes().substitute(&args.join(" "));
    service.room().enqueue(ServerMessage::chat(
        caller.name.clone(),
        caller.color.clone(),
        text,
        caller.tier,
        MessageType::Action,
    ))?;
    Ok(String::new())
}

fn help(service: &ChatService, caller: &SessionInfo, _args: &[String]) -> CommandResult {
    let directive = ServerMessage::command(CommandType::Help, vec![help_url(caller.tier).to_string()]);
    service.room().send_to(&caller.id, &directive);
    Ok("Opening help in new window.".to_string())
}

fn count(service: &ChatService, _caller: &SessionInfo, _args: &[String]) -> CommandResult {
    Ok(format!("Users in chat: {}", service.room().user_count()))
}

fn color(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let room = service.room();

    // Moderators can set someone else's color with a name and a color
    if args.len() == 2 && caller.is_mod() {
        let (color, name) = pick_color_and_name(&args[0], &args[1])?;
        room.force_color_change(name, color)?;
        room.notify_moderators(format!("{} changed the color of {name} to {color}", caller.name));
        return Ok(format!("Color changed for user {name} to {color}"));
    }

    if caller.color_forced {
        info!(name = %caller.name, "Tried to change a forced color");
        return Err("You are not allowed to change your color.".to_string());
    }

    let (color, response) = match args.first() {
        None => {
            let color = random_color();
            let response = format!("Random color chosen: {color}");
            (color, response)
        }
        Some(color) if is_valid_color(color) => (color.clone(), "Color changed successfully.".to_string()),
        Some(_) => {
            return Err(
                "To choose a specific color use the format <i>/color #c029ce</i>.  Hex values expected."
                    .to_string(),
            )
        }
    };

    room.set_color(&caller.id, &color)?;
    room.send_to(
        &caller.id,
        &ServerMessage::hidden(ClientDataType::Color, serde_json::Value::String(color)),
    );
    Ok(response)
}

/// Exactly one of the two arguments must be a color; a `#` value wins
/// when both would parse
fn pick_color_and_name<'a>(a: &'a str, b: &'a str) -> Result<(&'a str, &'a str), String> {
    match (is_valid_color(a), is_valid_color(b)) {
        (true, false) => Ok((a, b)),
        (false, true) => Ok((b, a)),
        (true, true) if a.starts_with('#') && !b.starts_with('#') => Ok((a, b)),
        (true, true) if b.starts_with('#') && !a.starts_with('#') => Ok((b, a)),
        (true, true) => Err("Missing name".to_string()),
        (false, false) => Err("Missing color".to_string()),
    }
}

fn whoami(_service: &ChatService, caller: &SessionInfo, _args: &[String]) -> CommandResult {
    Ok(format!(
        "Name: {} IsMod: {} IsAdmin: {}",
        caller.name,
        caller.is_mod(),
        caller.is_admin()
    ))
}

fn auth(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let room = service.room();
    let settings = service.settings();

    if caller.is_admin() {
        room.notify_moderators(format!("{} tried to authenticate again", caller.name));
        return Ok("You are already authenticated.".to_string());
    }

    let password = unescape_html(&args.join(" "));

    if !password.is_empty() && password == settings.admin_password() {
        room.set_tier(&caller.id, Tier::Admin)?;
        info!(name = %caller.name, "Admin password used");
        room.notify_moderators(format!("{} used the admin password", caller.name));
        return Ok("Admin rights granted.".to_string());
    }

    if settings.redeem_mod_password(&password) {
        room.set_tier(&caller.id, Tier::Mod)?;
        info!(name = %caller.name, "Moderator password used");
        room.notify_moderators(format!("{} used a mod password", caller.name));
        return Ok("Moderator privileges granted.".to_string());
    }

    warn!(name = %caller.name, host = %caller.host, "Invalid password");
    room.notify_moderators(format!("{} gave an invalid password", caller.name));
    Err("Invalid password.".to_string())
}

fn users(service: &ChatService, _caller: &SessionInfo, _args: &[String]) -> CommandResult {
    Ok(service.room().names().join(" "))
}

fn nick(service: &ChatService, caller: &SessionInfo, args: &[String]) -> CommandResult {
    let room = service.room();
    match args {
        [] => Err("Missing name to change to.".to_string()),
        [new_name] => {
            room.rename(&caller.id, new_name)?;
            Ok(String::new())
        }
        [old_name, new_name, ..] => {
            if !caller.is_admin() {
                return Err(NOT_ADMIN.to_string());
            }
            room.force_rename(old_name, new_name)?;
            room.notify_moderators(format!("{} renamed {old_name} to {new_name}", caller.name));
            Ok(format!("{old_name} is now {new_name}"))
        }
    }
}

fn stats(service: &ChatService, _caller: &SessionInfo, _args: &[String]) -> CommandResult {
    Ok(service.stats().snapshot().summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{connect, decode_frames, drain, test_service};

    fn joined(service: &ChatService, name: &str, host: &str) -> (SessionInfo, tokio::sync::mpsc::Receiver<String>) {
        let (handle, mut rx) = connect(host);
        let info = service.room().join(name, handle).unwrap();
        drain(&mut rx);
        (info, rx)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_me_enqueues_action() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");
        service.room().flush();

        assert_eq!(me(&service, &alice, &[]), Ok(String::new()));
        assert_eq!(service.room().flush(), 0);

        me(&service, &alice, &args(&["waves"])).unwrap();
        assert_eq!(service.room().flush(), 1);
    }

    #[test]
    fn test_help_directive_by_tier() {
        let service = test_service();
        let (alice, mut rx) = joined(&service, "Alice", "10.0.0.1");

        assert_eq!(help(&service, &alice, &[]), Ok("Opening help in new window.".to_string()));
        assert_eq!(
            decode_frames(&rx.try_recv().unwrap()),
            vec![ServerMessage::command(CommandType::Help, vec!["/help".to_string()])]
        );

        service.room().set_tier(&alice.id, Tier::Admin).unwrap();
        drain(&mut rx);
        let admin = service.room().session("Alice").unwrap();
        help(&service, &admin, &[]).unwrap();
        assert_eq!(
            decode_frames(&rx.try_recv().unwrap()),
            vec![ServerMessage::command(CommandType::Help, vec!["/help?mod=1&admin=1".to_string()])]
        );
    }

    #[test]
    fn test_color_self_service() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");

        let response = color(&service, &alice, &[]).unwrap();
        assert!(response.starts_with("Random color chosen: #"));

        assert_eq!(
            color(&service, &alice, &args(&["#ABCDEF"])),
            Ok("Color changed successfully.".to_string())
        );
        assert_eq!(service.room().session("Alice").unwrap().color, "#ABCDEF");

        assert!(color(&service, &alice, &args(&["#ABCDE"])).unwrap_err().contains("Hex values expected"));
        assert_eq!(service.room().session("Alice").unwrap().color, "#ABCDEF");
    }

    #[test]
    fn test_forced_color_then_self_color() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");
        let (moddy, _rx_m) = joined(&service, "Moddy", "10.0.0.2");
        service.room().mod_session("Moddy").unwrap();
        let moddy = service.room().session_by_id(&moddy.id).unwrap();

        assert_eq!(
            color(&service, &moddy, &args(&["Alice", "red"])),
            Ok("Color changed for user Alice to red".to_string())
        );

        let alice = service.room().session_by_id(&alice.id).unwrap();
        assert_eq!(
            color(&service, &alice, &args(&["#ABCDEF"])),
            Err("You are not allowed to change your color.".to_string())
        );
        assert_eq!(
            color(&service, &alice, &[]),
            Err("You are not allowed to change your color.".to_string())
        );
        assert_eq!(service.room().session("Alice").unwrap().color, "red");
    }

    #[test]
    fn test_pick_color_and_name() {
        assert_eq!(pick_color_and_name("Alice", "#fff"), Ok(("#fff", "Alice")));
        assert_eq!(pick_color_and_name("red", "Bobby"), Ok(("red", "Bobby")));
        assert_eq!(pick_color_and_name("tan", "#fff"), Ok(("#fff", "tan")));
        assert_eq!(pick_color_and_name("Alice", "Bobby"), Err("Missing color".to_string()));
        assert_eq!(pick_color_and_name("red", "tan"), Err("Missing name".to_string()));
    }

    #[test]
    fn test_whoami() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");
        assert_eq!(
            whoami(&service, &alice, &[]),
            Ok("Name: Alice IsMod: false IsAdmin: false".to_string())
        );
    }

    #[test]
    fn test_auth_admin_password() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");
        let password = service.settings().admin_password();

        assert_eq!(auth(&service, &alice, &args(&["wrong"])), Err("Invalid password.".to_string()));
        assert_eq!(service.room().session("Alice").unwrap().tier, Tier::User);

        assert_eq!(auth(&service, &alice, &args(&[password.as_str()])), Ok("Admin rights granted.".to_string()));
        let alice = service.room().session("Alice").unwrap();
        assert_eq!(alice.tier, Tier::Admin);
        assert_eq!(
            auth(&service, &alice, &args(&[password.as_str()])),
            Ok("You are already authenticated.".to_string())
        );
    }

    #[test]
    fn test_auth_mod_password_single_use() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");
        let (bobby, _rx_b) = joined(&service, "Bobby", "10.0.0.2");
        let password = service.settings().generate_mod_password();

        assert_eq!(
            auth(&service, &alice, &args(&[password.as_str()])),
            Ok("Moderator privileges granted.".to_string())
        );
        assert_eq!(service.room().session("Alice").unwrap().tier, Tier::Mod);

        assert_eq!(auth(&service, &bobby, &args(&[password.as_str()])), Err("Invalid password.".to_string()));
        assert_eq!(service.room().session("Bobby").unwrap().tier, Tier::User);
    }

    #[test]
    fn test_auth_emits_notice_per_attempt() {
        let service = test_service();
        let (alice, _rx) = joined(&service, "Alice", "10.0.0.1");
        service.room().flush();

        let _ = auth(&service, &alice, &args(&["nope"]));
        let _ = auth(&service, &alice, &args(&["nope again"]));
        assert_eq!(service.room().flush(), 2);
    }

    #[test]
    fn test_users_and_count() {
        let service = test_service();
        let (alice, _rx_a) = joined(&service, "Alice", "10.0.0.1");
        let (_bobby, _rx_b) = joined(&service, "bobby", "10.0.0.2");

        assert_eq!(users(&service, &alice, &[]), Ok("Alice bobby".to_string()));
        assert_eq!(count(&service, &alice, &[]), Ok("Users in chat: 2".to_string()));
    }

    #[test]
    fn test_nick() {
        let service = test_service();
        let (alice, _rx_a) = joined(&service, "Alice", "10.0.0.1");
        let (bobby, _rx_b) = joined(&service, "Bobby", "10.0.0.2");

        assert!(nick(&service, &alice, &[]).is_err());
        assert_eq!(nick(&service, &alice, &args(&["Alicia"])), Ok(String::new()));
        assert!(service.room().session("Alicia").is_some());

        assert_eq!(
            nick(&service, &alice, &args(&["Bobby", "Robert"])),
            Err(NOT_ADMIN.to_string())
        );

        service.room().set_tier(&alice.id, Tier::Admin).unwrap();
        let admin = service.room().session_by_id(&alice.id).unwrap();
        nick(&service, &admin, &args(&["Bobby", "Robert"])).unwrap();

        let robert = service.room().session_by_id(&bobby.id).unwrap();
        assert_eq!(robert.name, "Robert");
        assert_eq!(
            nick(&service, &robert, &args(&["Bob"])),
            Err("You cannot change your name once it has been changed by an admin.".to_string())
        );
    }
}
