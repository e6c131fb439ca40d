// In-memory model of a mission data literal: ordered tables of typed values.
use std::fmt;

use crate::writer::escape_str;

/// Slot of a table entry. Canonical integer text is always an `Index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(i64),
    Name(String),
}

impl Key {
    /// Applies the key rule: text that is a canonical integer literal names an
    /// index, everything else is a string name. Used by both parser and writer.
    pub fn classify(text: &str) -> Key {
        match text.parse::<i64>() {
            Ok(n) if n.to_string() == text => Key::Index(n),
            _ => Key::Name(text.to_string()),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(s) => Some(s),
            Key::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Index(n) => Some(*n),
            Key::Name(_) => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::classify(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::classify(&s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Index(n)
    }
}

// Surface form used in `[key] =` lines and `-- end of [key]` markers.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(n) => write!(f, "[{}]", n),
            Key::Name(s) => write!(f, "[\"{}\"]", escape_str(s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Table,
    String,
    Number,
    Boolean,
    Nil,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Table => "table",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Nil => "nil",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralNode {
    Table(Table),
    Str(String),
    Number(f64),
    Bool(bool),
    Nil,
}

impl LiteralNode {
    pub fn kind(&self) -> Kind {
        match self {
            LiteralNode::Table(_) => Kind::Table,
            LiteralNode::Str(_) => Kind::String,
            LiteralNode::Number(_) => Kind::Number,
            LiteralNode::Bool(_) => Kind::Boolean,
            LiteralNode::Nil => Kind::Nil,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            LiteralNode::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            LiteralNode::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralNode::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            LiteralNode::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LiteralNode::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<Table> for LiteralNode {
    fn from(t: Table) -> Self {
        LiteralNode::Table(t)
    }
}

impl From<&str> for LiteralNode {
    fn from(s: &str) -> Self {
        LiteralNode::Str(s.to_string())
    }
}

impl From<String> for LiteralNode {
    fn from(s: String) -> Self {
        LiteralNode::Str(s)
    }
}

impl From<f64> for LiteralNode {
    fn from(n: f64) -> Self {
        LiteralNode::Number(n)
    }
}

impl From<i32> for LiteralNode {
    fn from(n: i32) -> Self {
        LiteralNode::Number(n as f64)
    }
}

impl From<u32> for LiteralNode {
    fn from(n: u32) -> Self {
        LiteralNode::Number(n as f64)
    }
}

impl From<bool> for LiteralNode {
    fn from(b: bool) -> Self {
        LiteralNode::Bool(b)
    }
}

/// Table node. Entries keep insertion order; lookups are linear, which is
/// fine for the handful of paths the editor touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    entries: Vec<(Key, LiteralNode)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<&LiteralNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &Key) -> Option<&mut LiteralNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.get(key).is_some()
    }

    /// Overwrites in place when the key exists (position kept), else appends.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<LiteralNode>) -> Option<LiteralNode> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &Key) -> Option<LiteralNode> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &LiteralNode)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl<K: Into<Key>, V: Into<LiteralNode>> FromIterator<(K, V)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut t = Table::new();
        for (k, v) in iter {
            t.insert(k, v);
        }
        t
    }
}

/// `name = { ... }`: the single global assignment a mission member holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub root: Table,
}
