//! In-memory evaluation.

use crate::Query;

/// A message view a [`Query`] can be evaluated against.
pub trait Searchable {
    /// All header fields as `(name, value)` pairs, in message order.
    fn header_fields(&self) -> &[(String, String)];

    /// Whether the `\Seen` flag is set.
    fn is_seen(&self) -> bool;

    /// The day the message was stored.
    fn internal_date(&self) -> chrono::NaiveDate;

    /// The message UID.
    fn uid(&self) -> u32;
}

impl Query {
    /// Evaluate against a message view.
    ///
    /// Header predicates use IMAP semantics: a case-insensitive substring
    /// match against the value of any header with that name.
    pub fn matches<S>(&self, message: &S) -> bool
    where
        S: Searchable + ?Sized,
    {
        match self {
            Self::Nothing => false,
            Self::All => true,
            Self::Header { field, value } => {
                let needle = value.to_lowercase();
                message
                    .header_fields()
                    .iter()
                    .filter(|(name, _)| field.is(name))
                    .any(|(_, haystack)| haystack.to_lowercase().contains(&needle))
            }
            Self::Seen => message.is_seen(),
            Self::Unseen => !message.is_seen(),
            Self::Since(date) => message.internal_date() >= *date,
            Self::UidFrom(uid) => message.uid() >= *uid,
            Self::And(operands) => operands.iter().all(|operand| operand.matches(message)),
            Self::Or(operands) => operands.iter().any(|operand| operand.matches(message)),
            Self::Not(operand) => !operand.matches(message),
        }
    }
}
