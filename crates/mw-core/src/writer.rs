// Emits a literal tree in the layout the mission consumer expects:
//
//     mission =
//     {
//         ["date"] =
//         {
//             ["Day"] = 1,
//         }, -- end of ["date"]
//     } -- end of mission
use std::fmt::{self, Write as _};

use crate::literal::{Key, LiteralNode, Table};

const INDENT: &str = "    ";

// 2^53: integral values up to here print without a fraction.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// How the root table is closed. `Bare` reproduces older mission files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootTerminator {
    #[default]
    Commented,
    Bare,
}

pub fn serialize(root: &Table, name: &str) -> String {
    serialize_with(root, name, RootTerminator::Commented)
}

pub fn serialize_with(root: &Table, name: &str, terminator: RootTerminator) -> String {
    let mut w = Writer::new();
    w.assignment(root, name, terminator).ok();
    w.out
}

/// Scalar text as it appears after `=`; `None` for tables.
pub fn render_scalar(value: &LiteralNode) -> Option<String> {
    match value {
        LiteralNode::Table(_) => None,
        LiteralNode::Str(s) => Some(format!("\"{}\"", escape_str(s))),
        LiteralNode::Number(n) => Some(format_number(*n)),
        LiteralNode::Bool(b) => Some(b.to_string()),
        LiteralNode::Nil => Some("nil".to_string()),
    }
}

/// Escapes backslash, double quote and line breaks. A newline becomes a
/// backslash followed by a real newline, which reads back as a newline.
pub fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// A comment runs to the end of its line, so a line break in the key stays
// escaped as `\n`. The comment is never read back.
fn comment_key(key: &Key) -> String {
    key.to_string().replace('\n', "n")
}

struct Writer {
    out: String,
}

impl Writer {
    fn new() -> Self {
        Self {
            out: String::with_capacity(64 * 1024),
        }
    }

    fn assignment(&mut self, root: &Table, name: &str, terminator: RootTerminator) -> fmt::Result {
        write!(self.out, "{} = \n{{\n", name)?;
        self.table_body(root, 1)?;
        match terminator {
            RootTerminator::Commented => writeln!(self.out, "}} -- end of {}", name),
            RootTerminator::Bare => writeln!(self.out, "}}"),
        }
    }

    fn table_body(&mut self, table: &Table, depth: usize) -> fmt::Result {
        for (key, value) in table.iter() {
            self.entry(key, value, depth)?;
        }
        Ok(())
    }

    fn entry(&mut self, key: &Key, value: &LiteralNode, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        match value {
            LiteralNode::Table(t) => {
                write!(self.out, "{pad}{key} = \n{pad}{{\n")?;
                self.table_body(t, depth + 1)?;
                writeln!(self.out, "{pad}}}, -- end of {}", comment_key(key))
            }
            LiteralNode::Str(s) => writeln!(self.out, "{pad}{key} = \"{}\",", escape_str(s)),
            LiteralNode::Number(n) => writeln!(self.out, "{pad}{key} = {},", format_number(*n)),
            LiteralNode::Bool(b) => writeln!(self.out, "{pad}{key} = {},", b),
            LiteralNode::Nil => writeln!(self.out, "{pad}{key} = nil,"),
        }
    }
}
