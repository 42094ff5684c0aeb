//! Remote identifiers and command scopes.

use serde_json::Value;
use std::fmt;

/// A numeric id assigned by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Reads an id from a payload field, accepting both the string and the
    /// numeric wire forms.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => s.parse().ok().map(Self),
            Value::Number(n) => n.as_u64().map(Self),
            _ => None,
        }
    }

    /// Returns the raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The administrative boundary a structured command is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scope {
    /// Registered for every guild and direct messages.
    #[default]
    Global,
    /// Registered for a single guild.
    Guild(Snowflake),
}

impl Scope {
    /// Returns the guild id, if this is a guild scope.
    pub fn guild_id(self) -> Option<Snowflake> {
        match self {
            Scope::Global => None,
            Scope::Guild(id) => Some(id),
        }
    }
}

impl From<Snowflake> for Scope {
    fn from(id: Snowflake) -> Self {
        Scope::Guild(id)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Guild(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snowflake_from_value() {
        assert_eq!(Snowflake::from_value(&json!("42")), Some(Snowflake(42)));
        assert_eq!(Snowflake::from_value(&json!(42)), Some(Snowflake(42)));
        assert_eq!(Snowflake::from_value(&json!("nope")), None);
        assert_eq!(Snowflake::from_value(&json!(null)), None);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Global.to_string(), "global");
        assert_eq!(Scope::Guild(Snowflake(7)).to_string(), "7");
    }
}
