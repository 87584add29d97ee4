//! Text processing for chat lines

const ESCAPES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#39;"),
];

/// Longest entity produced by [`escape_html`]
const MAX_ENTITY_LEN: usize = 6;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_html`]
pub fn unescape_html(s: &str) -> String {
    // &amp; last so "&amp;lt;" becomes "&lt;" rather than "<"
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Turn every whitespace or control character into a space, squeeze runs
/// of spaces and trim both ends
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;

    for c in s.chars() {
        if c.is_whitespace() || c.is_control() || c == '\u{200b}' {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Cut escaped text to at most `max_chars` characters
///
/// The cut never splits a character or an HTML entity; an entity that
/// would straddle the limit is dropped whole.
pub fn truncate_escaped(s: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = s.char_indices().nth(max_chars) else {
        return s;
    };

    let head = &s[..cut];
    if let Some(amp) = head.rfind('&') {
        let tail = &s[amp..];
        let straddles = !head[amp..].contains(';')
            && tail.find(';').is_some_and(|end| {
                end <= MAX_ENTITY_LEN
                    && tail[1..end].chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
            });
        if straddles {
            return &s[..amp];
        }
    }
    head
}

/// Wrap bare `http://` and `https://` words in anchors
pub fn format_links(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            if word.starts_with("http://") || word.starts_with("https://") {
                format!(r#"<a href="{word}" target="_blank">{word}</a>"#)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Highlight whole words equal to `name` or `@name`
pub fn highlight_mentions(s: &str, name: &str) -> String {
    if name.is_empty() {
        return s.to_string();
    }

    s.split(' ')
        .map(|word| {
            let mention = word == name || word.strip_prefix('@') == Some(name);
            if mention {
                format!(r#"<span class="mention">{word}</span>"#)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
