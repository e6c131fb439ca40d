// Typed navigation into a parsed literal tree.
//
// Paths are sequences of keys relative to the root table (`date.Day` is the
// `Day` entry of `mission.date`). Lookups never panic: a missing key or a
// non-table in the middle of a path comes back as a `LookupError`.
use std::fmt;

use crate::error::LookupError;
use crate::literal::{Key, Kind, LiteralNode, Table};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<Key>);

impl KeyPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Splits a dotted path; every segment goes through the key rule, so
    /// `coalition.red.1` ends with an index. An empty string is the root.
    pub fn parse(dotted: &str) -> Self {
        let dotted = dotted.trim();
        if dotted.is_empty() {
            return Self::root();
        }
        Self(dotted.split('.').map(Key::classify).collect())
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, key: impl Into<Key>) {
        self.0.push(key.into());
    }

    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut out = self.clone();
        out.push(key);
        out
    }

    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }
}

impl From<&[Key]> for KeyPath {
    fn from(keys: &[Key]) -> Self {
        Self(keys.to_vec())
    }
}

impl From<Vec<Key>> for KeyPath {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| Key::classify(s)).collect())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match key {
                Key::Index(n) => write!(f, "{}", n)?,
                Key::Name(s) => f.write_str(s)?,
            }
        }
        Ok(())
    }
}

/// Table at `path`; the empty path is the root itself.
pub fn table<'t>(root: &'t Table, path: &[Key]) -> Result<&'t Table, LookupError> {
    let mut cur = root;
    for (i, key) in path.iter().enumerate() {
        cur = match cur.get(key) {
            Some(LiteralNode::Table(t)) => t,
            Some(other) => {
                return Err(LookupError::NotATable {
                    path: KeyPath::from(&path[..=i]),
                    found: other.kind(),
                });
            }
            None => {
                return Err(LookupError::NotFound {
                    path: KeyPath::from(&path[..=i]),
                });
            }
        };
    }
    Ok(cur)
}

pub fn table_mut<'t>(root: &'t mut Table, path: &[Key]) -> Result<&'t mut Table, LookupError> {
    let mut cur = root;
    for (i, key) in path.iter().enumerate() {
        cur = match cur.get_mut(key) {
            Some(LiteralNode::Table(t)) => t,
            Some(other) => {
                return Err(LookupError::NotATable {
                    path: KeyPath::from(&path[..=i]),
                    found: other.kind(),
                });
            }
            None => {
                return Err(LookupError::NotFound {
                    path: KeyPath::from(&path[..=i]),
                });
            }
        };
    }
    Ok(cur)
}

/// Node at `path`. The root table is not a node, so the empty path is
/// reported as not found; use [`table`] to address it.
pub fn get<'t>(root: &'t Table, path: &[Key]) -> Result<&'t LiteralNode, LookupError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(LookupError::NotFound { path: KeyPath::root() });
    };
    table(root, parents)?
        .get(last)
        .ok_or_else(|| LookupError::NotFound { path: KeyPath::from(path) })
}

pub fn get_mut<'t>(root: &'t mut Table, path: &[Key]) -> Result<&'t mut LiteralNode, LookupError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(LookupError::NotFound { path: KeyPath::root() });
    };
    table_mut(root, parents)?
        .get_mut(last)
        .ok_or_else(|| LookupError::NotFound { path: KeyPath::from(path) })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildInfo {
    pub key: Key,
    pub kind: Kind,
    pub len: Option<usize>,
}

pub fn list_children(root: &Table, path: &[Key]) -> Result<Vec<ChildInfo>, LookupError> {
    let t = table(root, path)?;
    Ok(t.iter()
        .map(|(k, v)| ChildInfo {
            key: k.clone(),
            kind: v.kind(),
            len: v.as_table().map(Table::len),
        })
        .collect())
}
