// Keyscope Key Expressions
// Parses expressions like "ctrl+shift+a" or "g g" into combination descriptors

use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;

use crate::key::{is_known_key, normalize_key_name};
use crate::EventType;

/// Separator between the ids of consecutive combinations in a sequence id
pub const SEQUENCE_SEPARATOR: &str = " ";

/// Separator between key names in a combination id
pub const COMBINATION_SEPARATOR: char = '+';

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

/// Sorted, de-duplicated set of normalized key names
pub type KeySet = SmallVec<[String; 4]>;

/// Errors that can occur while parsing a key expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("key expression cannot be empty")]
    EmptyExpression,

    #[error("key expression '{0}' has a '+' with no key on one side")]
    DanglingSeparator(String),

    #[error("unknown key name '{key}' in key expression '{expression}'")]
    UnknownKey { key: String, expression: String },
}

/// The last combination of a parsed expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationDescriptor {
    /// Canonical id, see [`combination_id`]
    pub id: String,
    /// Keys that must be held together
    pub keys: KeySet,
    /// Number of keys in the combination
    pub size: usize,
    /// Event type the combination is matched against
    pub event_type: EventType,
}

impl CombinationDescriptor {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// Result of serializing a key expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSequence {
    /// Ids of every combination but the last, joined with [`SEQUENCE_SEPARATOR`]
    pub prefix_id: String,
    /// The final combination of the sequence
    pub combination: CombinationDescriptor,
    /// Number of combinations in the sequence
    pub length: usize,
}

/// Parse a key expression into its sequence prefix id and final combination
///
/// # Examples
/// ```
/// use keyscope_core::{parse_expression, EventType};
/// let parsed = parse_expression("g shift+g", EventType::KeyDown).unwrap();
/// assert_eq!(parsed.prefix_id, "g");
/// assert_eq!(parsed.combination.id, "Shift+g");
/// assert_eq!(parsed.length, 2);
/// ```
pub fn parse_expression(
    expression: &str,
    event_type: EventType,
) -> Result<ParsedSequence, ExpressionError> {
    let mut combinations = parse_combinations(expression)?;
    let length = combinations.len();

    // parse_combinations never returns an empty list
    let keys = combinations.pop().ok_or(ExpressionError::EmptyExpression)?;
    let prefix_id = combinations
        .iter()
        .map(|keys| combination_id(keys.iter().map(String::as_str)))
        .collect::<Vec<_>>()
        .join(SEQUENCE_SEPARATOR);

    Ok(ParsedSequence {
        prefix_id,
        combination: CombinationDescriptor {
            id: combination_id(keys.iter().map(String::as_str)),
            size: keys.len(),
            keys,
            event_type,
        },
        length,
    })
}

/// Split an expression into the key sets of its combinations, in order
pub fn parse_combinations(expression: &str) -> Result<Vec<KeySet>, ExpressionError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(ExpressionError::EmptyExpression);
    }

    WHITESPACE
        .split(trimmed)
        .map(|part| parse_combination(part, expression))
        .collect()
}

/// Check whether a string is a well-formed key expression
pub fn is_valid_expression(expression: &str) -> bool {
    parse_combinations(expression).is_ok()
}

/// Canonical id for a set of key names: sorted, de-duplicated, joined with `+`
pub fn combination_id<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = keys.into_iter().collect();
    names.sort_unstable();
    names.dedup();
    let mut id = String::new();
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            id.push(COMBINATION_SEPARATOR);
        }
        id.push_str(name);
    }
    id
}

fn parse_combination(text: &str, expression: &str) -> Result<KeySet, ExpressionError> {
    // A bare "+" is the plus key itself
    if text == "+" {
        return Ok(SmallVec::from_elem("+".to_string(), 1));
    }

    let mut keys = KeySet::new();
    for raw in text.split(COMBINATION_SEPARATOR) {
        if raw.is_empty() {
            return Err(ExpressionError::DanglingSeparator(expression.to_string()));
        }
        let name = normalize_key_name(raw);
        if !is_known_key(&name) {
            return Err(ExpressionError::UnknownKey {
                key: raw.to_string(),
                expression: expression.to_string(),
            });
        }
        if !keys.contains(&name) {
            keys.push(name);
        }
    }

    keys.sort_unstable();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_key() {
        let parsed = parse_expression("a", EventType::KeyDown).unwrap();
        assert_eq!(parsed.prefix_id, "");
        assert_eq!(parsed.combination.id, "a");
        assert_eq!(parsed.combination.size, 1);
        assert_eq!(parsed.length, 1);
    }

    #[test]
    fn test_parse_combination_is_order_independent() {
        let first = parse_expression("ctrl+shift+a", EventType::KeyDown).unwrap();
        let second = parse_expression("a+Shift+Control", EventType::KeyDown).unwrap();
        assert_eq!(first.combination.id, second.combination.id);
        assert_eq!(first.combination.id, "Control+Shift+a");
        assert_eq!(first.combination.size, 3);
    }

    #[test]
    fn test_parse_sequence_prefix() {
        let parsed = parse_expression("ctrl+k  ctrl+c x", EventType::KeyUp).unwrap();
        assert_eq!(parsed.prefix_id, "Control+k Control+c");
        assert_eq!(parsed.combination.id, "x");
        assert_eq!(parsed.combination.event_type, EventType::KeyUp);
        assert_eq!(parsed.length, 3);
    }

    #[test]
    fn test_parse_duplicate_keys_collapse() {
        let parsed = parse_expression("a+A", EventType::KeyDown).unwrap();
        assert_eq!(parsed.combination.size, 1);
        assert!(parsed.combination.contains("a"));
    }

    #[test]
    fn test_parse_plus_key() {
        let parsed = parse_expression("shift+plus", EventType::KeyDown).unwrap();
        assert!(parsed.combination.contains("+"));
        assert!(parsed.combination.contains("Shift"));

        let bare = parse_expression("+", EventType::KeyDown).unwrap();
        assert_eq!(bare.combination.id, "+");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_expression("   ", EventType::KeyDown),
            Err(ExpressionError::EmptyExpression)
        );
        assert!(matches!(
            parse_expression("ctrl+", EventType::KeyDown),
            Err(ExpressionError::DanglingSeparator(_))
        ));
        assert!(matches!(
            parse_expression("ctrl+banana", EventType::KeyDown),
            Err(ExpressionError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_is_valid_expression() {
        assert!(is_valid_expression("g g"));
        assert!(is_valid_expression("meta+enter"));
        assert!(!is_valid_expression("save"));
        assert!(!is_valid_expression(""));
    }

    #[test]
    fn test_combination_id_sorts_and_dedups() {
        assert_eq!(combination_id(["b", "a", "b"]), "a+b");
        assert_eq!(combination_id(Vec::<&str>::new()), "");
    }
}
