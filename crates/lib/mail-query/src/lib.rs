//! Boolean search expressions over message headers.

mod address;
mod eval;
mod field;
mod render;

pub use address::{normalize_address, normalize_addresses};
pub use eval::Searchable;
pub use field::Field;

/// A search expression.
///
/// Leaves are predicates over a single message; interior nodes combine
/// them. [`Query::Nothing`] matches no message and is what every builder
/// returns for an empty input set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// Matches no message.
    Nothing,

    /// Matches every message.
    All,

    /// The header field contains the value (case-insensitive substring).
    Header {
        /// Header field name.
        field: Field,

        /// The value to look for.
        value: String,
    },

    /// The message has the `\Seen` flag.
    Seen,

    /// The message lacks the `\Seen` flag.
    Unseen,

    /// The internal date is on or after the given day.
    Since(chrono::NaiveDate),

    /// The UID is at least the given value (`UID n:*`).
    UidFrom(u32),

    /// Every operand matches.
    And(Vec<Query>),

    /// Any operand matches.
    Or(Vec<Query>),

    /// The operand does not match.
    Not(Box<Query>),
}

impl Query {
    /// A header predicate.
    pub fn header(field: Field, value: impl Into<String>) -> Self {
        Self::Header {
            field,
            value: value.into(),
        }
    }

    /// Narrow this query with another one.
    ///
    /// `Nothing` on either side yields `Nothing`; nested conjunctions are
    /// flattened.
    pub fn and(self, other: Query) -> Self {
        match (self, other) {
            (Self::Nothing, _) | (_, Self::Nothing) => Self::Nothing,
            (Self::All, other) | (other, Self::All) => other,
            (Self::And(mut lhs), Self::And(rhs)) => {
                lhs.extend(rhs);
                Self::And(lhs)
            }
            (Self::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Self::And(lhs)
            }
            (lhs, Self::And(rhs)) => {
                let mut operands = Vec::with_capacity(rhs.len() + 1);
                operands.push(lhs);
                operands.extend(rhs);
                Self::And(operands)
            }
            (lhs, rhs) => Self::And(vec![lhs, rhs]),
        }
    }

    /// Disjunction of the given queries.
    ///
    /// `Nothing` operands are dropped, and an empty disjunction is `Nothing`.
    pub fn any<I>(queries: I) -> Self
    where
        I: IntoIterator<Item = Query>,
    {
        let mut operands: Vec<Query> = Vec::new();
        for query in queries {
            match query {
                Self::Nothing => {}
                Self::Or(nested) => operands.extend(nested),
                other => operands.push(other),
            }
        }

        match operands.len() {
            0 => Self::Nothing,
            1 => operands.swap_remove(0),
            _ => Self::Or(operands),
        }
    }

    /// Whether this query is guaranteed to match no message.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}

impl std::ops::Not for Query {
    type Output = Query;

    fn not(self) -> Self::Output {
        Query::Not(Box::new(self))
    }
}

/// Match any of the `fields` against any of the `addresses`.
///
/// Produces one header leaf per (field, address) pair. Addresses are expected
/// to be normalized already; an empty address set yields [`Query::Nothing`].
pub fn any_of<'a, A>(fields: &[Field], addresses: A) -> Query
where
    A: IntoIterator<Item = &'a str>,
{
    let addresses: Vec<&str> = addresses.into_iter().collect();
    Query::any(fields.iter().flat_map(|field| {
        addresses
            .iter()
            .map(move |address| Query::header(field.clone(), *address))
    }))
}

/// Messages sent by any of the addresses.
pub fn originator_query<'a, A>(addresses: A) -> Query
where
    A: IntoIterator<Item = &'a str>,
{
    any_of(Field::ORIGINATORS, addresses)
}

/// Messages sent to any of the addresses.
pub fn recipient_query<'a, A>(addresses: A) -> Query
where
    A: IntoIterator<Item = &'a str>,
{
    any_of(Field::RECIPIENTS, addresses)
}
