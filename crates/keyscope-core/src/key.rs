// Keyscope Key Names
// Canonical key-name normalization and the table of recognized key names

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Lower-cased alias -> canonical key name
static KEY_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut aliases = HashMap::new();
    for (alias, name) in [
        ("ctrl", "Control"),
        ("control", "Control"),
        ("shift", "Shift"),
        ("alt", "Alt"),
        ("option", "Alt"),
        ("opt", "Alt"),
        ("meta", "Meta"),
        ("cmd", "Meta"),
        ("command", "Meta"),
        ("super", "Meta"),
        ("win", "Meta"),
        ("os", "Meta"),
        ("esc", "Escape"),
        ("escape", "Escape"),
        ("return", "Enter"),
        ("enter", "Enter"),
        ("del", "Delete"),
        ("delete", "Delete"),
        ("ins", "Insert"),
        ("insert", "Insert"),
        ("backspace", "Backspace"),
        ("tab", "Tab"),
        ("space", "Space"),
        ("spacebar", "Space"),
        ("plus", "+"),
        ("up", "ArrowUp"),
        ("down", "ArrowDown"),
        ("left", "ArrowLeft"),
        ("right", "ArrowRight"),
        ("arrowup", "ArrowUp"),
        ("arrowdown", "ArrowDown"),
        ("arrowleft", "ArrowLeft"),
        ("arrowright", "ArrowRight"),
        ("home", "Home"),
        ("end", "End"),
        ("pageup", "PageUp"),
        ("pagedown", "PageDown"),
        ("capslock", "CapsLock"),
        ("numlock", "NumLock"),
        ("scrolllock", "ScrollLock"),
        ("pause", "Pause"),
        ("printscreen", "PrintScreen"),
        ("contextmenu", "ContextMenu"),
    ] {
        aliases.insert(alias, name);
    }
    aliases
});

/// Canonical names accepted in key expressions besides single characters
/// and function keys
static NAMED_KEYS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| KEY_ALIASES.values().copied().collect());

static FUNCTION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[fF]([1-9]|1[0-9]|2[0-4])$").expect("function key pattern is a valid regex")
});

const MODIFIER_KEYS: [&str; 4] = ["Control", "Shift", "Alt", "Meta"];

/// Normalize a raw key name to its canonical form.
///
/// Single characters are lower-cased so that `A` (shifted) and `a` name the
/// same physical key; known aliases map to one canonical spelling; anything
/// else is returned as delivered by the host.
///
/// # Examples
/// ```
/// use keyscope_core::normalize_key_name;
/// assert_eq!(normalize_key_name("A"), "a");
/// assert_eq!(normalize_key_name("ctrl"), "Control");
/// assert_eq!(normalize_key_name("PageDown"), "PageDown");
/// ```
pub fn normalize_key_name(raw: &str) -> String {
    if raw == " " {
        return "Space".to_string();
    }

    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.to_lowercase().collect();
    }

    let lower = raw.to_lowercase();
    if let Some(name) = KEY_ALIASES.get(lower.as_str()) {
        return (*name).to_string();
    }

    if is_function_key(raw) {
        return raw.to_uppercase();
    }

    raw.to_string()
}

/// Check whether a normalized name is a key that expressions may refer to
pub fn is_known_key(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !c.is_whitespace() && !c.is_control(),
        (Some(_), Some(_)) => NAMED_KEYS.contains(name) || is_function_key(name),
        _ => false,
    }
}

/// Check whether a normalized name is one of the modifier keys
pub fn is_modifier_key(name: &str) -> bool {
    MODIFIER_KEYS.contains(&name)
}

fn is_function_key(name: &str) -> bool {
    FUNCTION_KEY.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_single_characters() {
        assert_eq!(normalize_key_name("a"), "a");
        assert_eq!(normalize_key_name("A"), "a");
        assert_eq!(normalize_key_name("?"), "?");
        assert_eq!(normalize_key_name(" "), "Space");
    }

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(normalize_key_name("Ctrl"), "Control");
        assert_eq!(normalize_key_name("Control"), "Control");
        assert_eq!(normalize_key_name("cmd"), "Meta");
        assert_eq!(normalize_key_name("esc"), "Escape");
        assert_eq!(normalize_key_name("Up"), "ArrowUp");
        assert_eq!(normalize_key_name("plus"), "+");
    }

    #[test]
    fn test_normalize_function_keys() {
        assert_eq!(normalize_key_name("f5"), "F5");
        assert_eq!(normalize_key_name("F12"), "F12");
        assert_eq!(normalize_key_name("f25"), "f25");
    }

    #[test]
    fn test_normalize_unknown_passthrough() {
        assert_eq!(normalize_key_name("AudioVolumeUp"), "AudioVolumeUp");
    }

    #[test]
    fn test_known_keys() {
        assert!(is_known_key("a"));
        assert!(is_known_key("Control"));
        assert!(is_known_key("F1"));
        assert!(is_known_key("+"));
        assert!(!is_known_key("save"));
        assert!(!is_known_key(""));
        assert!(!is_known_key("\u{7}"));
    }

    #[test]
    fn test_modifier_keys() {
        assert!(is_modifier_key("Shift"));
        assert!(is_modifier_key("Meta"));
        assert!(!is_modifier_key("a"));
        assert!(!is_modifier_key("ctrl"));
    }
}
