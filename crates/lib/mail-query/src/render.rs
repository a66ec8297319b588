//! IMAP SEARCH criteria rendering.

use std::fmt::{self, Write as _};

use crate::{Field, Query};

impl Query {
    /// Render as IMAP `SEARCH` criteria.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the query; conjunctions get parentheses unless at the top.
    fn write_to(&self, f: &mut fmt::Formatter<'_>, top: bool) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("NOT ALL"),
            Self::All => f.write_str("ALL"),
            Self::Header { field, value } => {
                match dedicated_key(field) {
                    Some(key) => f.write_str(key)?,
                    None => {
                        f.write_str("HEADER ")?;
                        write_quoted(f, field.as_str())?;
                    }
                }
                f.write_char(' ')?;
                write_quoted(f, value)
            }
            Self::Seen => f.write_str("SEEN"),
            Self::Unseen => f.write_str("UNSEEN"),
            Self::Since(date) => write!(f, "SINCE {}", date.format("%-d-%b-%Y")),
            Self::UidFrom(uid) => write!(f, "UID {uid}:*"),
            Self::And(operands) => match operands.as_slice() {
                [] => f.write_str("ALL"),
                [single] => single.write_to(f, top),
                operands => {
                    if !top {
                        f.write_char('(')?;
                    }
                    for (index, operand) in operands.iter().enumerate() {
                        if index > 0 {
                            f.write_char(' ')?;
                        }
                        operand.write_to(f, false)?;
                    }
                    if !top {
                        f.write_char(')')?;
                    }
                    Ok(())
                }
            },
            Self::Or(operands) => write_or(f, operands, top),
            Self::Not(operand) => {
                f.write_str("NOT ")?;
                operand.write_to(f, false)
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, true)
    }
}

/// `OR` is binary in IMAP, so longer disjunctions nest to the right.
fn write_or(f: &mut fmt::Formatter<'_>, operands: &[Query], top: bool) -> fmt::Result {
    match operands {
        [] => f.write_str("NOT ALL"),
        [single] => single.write_to(f, top),
        [first, rest @ ..] => {
            f.write_str("OR ")?;
            first.write_to(f, false)?;
            f.write_char(' ')?;
            write_or(f, rest, false)
        }
    }
}

/// Search keys IMAP provides for specific header fields.
fn dedicated_key(field: &Field) -> Option<&'static str> {
    [
        (Field::FROM, "FROM"),
        (Field::TO, "TO"),
        (Field::CC, "CC"),
        (Field::BCC, "BCC"),
    ]
    .into_iter()
    .find(|(known, _)| known.is(field.as_str()))
    .map(|(_, key)| key)
}

/// Write an IMAP quoted string.
fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}
