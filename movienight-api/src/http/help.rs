//! Help document generated from the command registry

use axum::{
    extract::{Query, State},
    response::Html,
};
use movienight_core::{
    models::Tier,
    service::{formatting::escape_html, HelpEntry},
};
use serde::Deserialize;
use std::fmt::Write;

use crate::http::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HelpQuery {
    #[serde(rename = "mod")]
    pub moderator: Option<String>,
    pub admin: Option<String>,
}

impl HelpQuery {
    #[must_use]
    pub fn tier(&self) -> Tier {
        if is_set(self.admin.as_deref()) {
            Tier::Admin
        } else if is_set(self.moderator.as_deref()) {
            Tier::Mod
        } else {
            Tier::User
        }
    }
}

fn is_set(flag: Option<&str>) -> bool {
    matches!(flag, Some("1" | "true"))
}

pub async fn help_page(State(state): State<AppState>, Query(query): Query<HelpQuery>) -> Html<String> {
    let entries = state.chat.commands().help(query.tier());
    Html(render_help(&entries))
}

fn section_title(tier: Tier) -> &'static str {
    match tier {
        Tier::User => "Commands",
        Tier::Mod => "Moderator commands",
        Tier::Admin => "Admin commands",
    }
}

/// One definition list per tier, in registry order
#[must_use]
pub fn render_help(entries: &[HelpEntry]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>MovieNight Help</title></head>\n<body>\n",
    );

    let mut current = None;
    for entry in entries {
        if current != Some(entry.tier) {
            if current.is_some() {
                html.push_str("</dl>\n");
            }
            let _ = writeln!(html, "<h2>{}</h2>\n<dl>", section_title(entry.tier));
            current = Some(entry.tier);
        }
        let _ = writeln!(
            html,
            "<dt>/{}</dt><dd>{}</dd>",
            escape_html(entry.alias),
            escape_html(entry.help)
        );
    }
    if current.is_some() {
        html.push_str("</dl>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_tier() {
        assert_eq!(HelpQuery::default().tier(), Tier::User);
        let moderator = HelpQuery {
            moderator: Some("1".to_string()),
            admin: None,
        };
        assert_eq!(moderator.tier(), Tier::Mod);
        let admin = HelpQuery {
            moderator: None,
            admin: Some("true".to_string()),
        };
        assert_eq!(admin.tier(), Tier::Admin);
    }

    #[test]
    fn test_render_groups_and_escapes() {
        let entries = vec![
            HelpEntry {
                alias: "me",
                help: "Display an <action>",
                tier: Tier::User,
            },
            HelpEntry {
                alias: "kick",
                help: "Kick a user",
                tier: Tier::Mod,
            },
        ];
        let html = render_help(&entries);
        assert!(html.contains("<h2>Commands</h2>"));
        assert!(html.contains("<h2>Moderator commands</h2>"));
        assert!(html.contains("Display an &lt;action&gt;"));
        assert_eq!(html.matches("<dl>").count(), 2);
        assert_eq!(html.matches("</dl>").count(), 2);
    }
}
