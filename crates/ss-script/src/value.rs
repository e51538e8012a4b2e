use std::fmt;

use ss_world::{EntityId, ItemId};

/// A script value.
///
/// Scripts see everything as text; the interpreter keeps the parsed form and
/// converts back with [`Value::literal`] whenever text is needed (call
/// resumption, variable splicing).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Signed integer literal.
    Int(i64),
    /// Quoted text, stored without the quotes.
    Text(String),
    /// `$Entity[n]` reference.
    Entity(EntityId),
    /// `$Item[n]` reference.
    Item(ItemId),
}

impl Default for Value {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Value {
    /// Parse a single literal token: an integer, `"text"`, `$Entity[n]`, or
    /// `$Item[n]`. Returns `None` for anything else.
    pub fn parse_literal(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(n) = text.parse::<i64>() {
            return Some(Self::Int(n));
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Some(Self::Text(text[1..text.len() - 1].to_string()));
        }
        if let Some(id) = parse_reference(text, "$Entity[") {
            return Some(Self::Entity(EntityId(id)));
        }
        if let Some(id) = parse_reference(text, "$Item[") {
            return Some(Self::Item(ItemId(id)));
        }
        None
    }

    /// Interpret data returned by a system function. Literal text parses to
    /// its typed form; anything else is kept verbatim as text.
    pub fn from_data(data: &str) -> Self {
        Self::parse_literal(data).unwrap_or_else(|| Self::Text(data.to_string()))
    }

    /// Literal text that parses back to this value.
    ///
    /// Resumed calls substitute this text into the caller's line, so a
    /// `Text` return keeps its quotes there: `exit("42")` resumes as `"42"`
    /// and compares unequal to the integer `42`.
    pub fn literal(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => format!("\"{s}\""),
            Self::Entity(id) => format!("$Entity[{id}]"),
            Self::Item(id) => format!("$Item[{id}]"),
        }
    }

    /// Integer view. Text coerces when its content is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<ItemId> {
        match self {
            Self::Item(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.literal()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Self::Entity(id)
    }
}

impl From<ItemId> for Value {
    fn from(id: ItemId) -> Self {
        Self::Item(id)
    }
}

fn parse_reference(text: &str, prefix: &str) -> Option<u32> {
    text.strip_prefix(prefix)?.strip_suffix(']')?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals() {
        assert_eq!(Value::parse_literal("42"), Some(Value::Int(42)));
        assert_eq!(Value::parse_literal("-7"), Some(Value::Int(-7)));
        assert_eq!(Value::parse_literal("\"hi there\""), Some(Value::Text("hi there".into())));
        assert_eq!(Value::parse_literal("\"\""), Some(Value::Text(String::new())));
        assert_eq!(Value::parse_literal("$Entity[3]"), Some(Value::Entity(EntityId(3))));
        assert_eq!(Value::parse_literal("$Item[0]"), Some(Value::Item(ItemId(0))));
    }

    #[test]
    fn rejects_non_literals() {
        assert_eq!(Value::parse_literal("health"), None);
        assert_eq!(Value::parse_literal("\""), None);
        assert_eq!(Value::parse_literal("$Entity[x]"), None);
        assert_eq!(Value::parse_literal("$Entity[1"), None);
    }

    #[test]
    fn literal_round_trips_text() {
        let v = Value::Text("a b".into());
        assert_eq!(v.literal(), "\"a b\"");
        assert_eq!(Value::parse_literal(&v.literal()), Some(v));
    }

    #[test]
    fn display_drops_quotes() {
        assert_eq!(Value::Text("hi".into()).to_string(), "hi");
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Entity(EntityId(2)).to_string(), "$Entity[2]");
    }

    #[test]
    fn from_data_keeps_unparsed_text() {
        assert_eq!(Value::from_data("12"), Value::Int(12));
        assert_eq!(Value::from_data("plain words"), Value::Text("plain words".into()));
    }

    #[test]
    fn int_coercion() {
        assert_eq!(Value::Text("9".into()).as_int(), Some(9));
        assert_eq!(Value::Text("nine".into()).as_int(), None);
        assert_eq!(Value::Entity(EntityId(1)).as_int(), None);
    }
}
