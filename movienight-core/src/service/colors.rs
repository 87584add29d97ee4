//! Chat name colors

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// CSS color names readable on the dark chat background
pub const COLOR_NAMES: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque",
    "blanchedalmond", "burlywood", "cadetblue", "chartreuse", "chocolate", "coral",
    "cornflowerblue", "cornsilk", "cyan", "darkcyan", "darkgoldenrod", "darkgray", "darkkhaki",
    "darkorange", "darksalmon", "darkseagreen", "darkturquoise", "deeppink", "deepskyblue",
    "dodgerblue", "floralwhite", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "greenyellow", "honeydew", "hotpink", "ivory", "khaki", "lavender",
    "lavenderblush", "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
    "lightgoldenrodyellow", "lightgreen", "lightgrey", "lightpink", "lightsalmon",
    "lightseagreen", "lightskyblue", "lightslategray", "lightsteelblue", "lightyellow", "lime",
    "limegreen", "linen", "magenta", "mediumaquamarine", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise", "mintcream",
    "mistyrose", "moccasin", "navajowhite", "oldlace", "olive", "olivedrab", "orange",
    "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise", "palevioletred",
    "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "red", "rosybrown",
    "salmon", "sandybrown", "seagreen", "seashell", "silver", "skyblue", "slategray", "snow",
    "springgreen", "steelblue", "tan", "thistle", "tomato", "turquoise", "violet", "wheat",
    "white", "whitesmoke", "yellow", "yellowgreen",
];

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-f]{3}){1,2}$").expect("valid hex color regex"));

/// Whether `color` is an allowed name color
///
/// Accepts the names in [`COLOR_NAMES`] (any case) and `#RGB` / `#RRGGBB`
/// hex values that are neither black nor mostly blue.
#[must_use]
pub fn is_valid_color(color: &str) -> bool {
    let color = color.to_lowercase();
    let color = color.trim_start_matches('#');

    if COLOR_NAMES.contains(&color) {
        return true;
    }

    if !HEX_COLOR.is_match(color) {
        return false;
    }

    match hex_rgb(color) {
        Some((r, g, b)) => {
            let total = f32::from(r) + f32::from(g) + f32::from(b);
            total > 0.7 && f32::from(b) / total < 0.7
        }
        None => false,
    }
}

/// A random `#rrggbb` color that passes [`is_valid_color`]
#[must_use]
pub fn random_color() -> String {
    let mut rng = rand::rng();
    loop {
        let color = format!(
            "#{:02x}{:02x}{:02x}",
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(0..255u8)
        );
        if is_valid_color(&color) {
            return color;
        }
    }
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors_any_case() {
        assert!(is_valid_color("red"));
        assert!(is_valid_color("Red"));
        assert!(is_valid_color("LIGHTSKYBLUE"));
        assert!(!is_valid_color("navy"));
        assert!(!is_valid_color("notacolor"));
    }

    #[test]
    fn test_hex_colors() {
        assert!(is_valid_color("#ABCDEF"));
        assert!(is_valid_color("abcdef"));
        assert!(is_valid_color("#fa0"));
        assert!(!is_valid_color("#ABCDE"));
        assert!(!is_valid_color("#GGGGGG"));
        assert!(!is_valid_color(""));
    }

    #[test]
    fn test_dark_and_blue_rejected() {
        assert!(!is_valid_color("#000000"));
        assert!(!is_valid_color("#0000ff"));
        assert!(!is_valid_color("#000"));
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("fa0"), Some((0xff, 0xaa, 0x00)));
        assert_eq!(hex_rgb("102030"), Some((0x10, 0x20, 0x30)));
        assert_eq!(hex_rgb("1020"), None);
    }

    #[test]
    fn test_random_color_is_valid() {
        for _ in 0..50 {
            let color = random_color();
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            assert!(is_valid_color(&color));
        }
    }
}
