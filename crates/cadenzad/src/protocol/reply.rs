//! Handler output, flattened into protocol lines.

use std::fmt::Display;

/// Lines a handler produces, without the terminating `OK`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Reply {
    lines: Vec<String>,
}

impl Reply {
    /// Reply with a single `key: value` line.
    pub(crate) fn field(key: &str, value: impl Display) -> Self {
        let mut reply = Self::default();
        reply.push_field(key, value);
        reply
    }

    pub(crate) fn push_field(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("{key}: {value}"));
    }

    pub(crate) fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub(crate) fn append(&mut self, other: Self) {
        self.lines.extend(other.lines);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl<K: AsRef<str>, V: Display> FromIterator<(K, V)> for Reply {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut reply = Self::default();
        for (key, value) in pairs {
            reply.push_field(key.as_ref(), value);
        }
        reply
    }
}
