//! Header field names.

use std::borrow::Cow;

/// A message header field name.
///
/// Comparison against message headers is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field(Cow<'static, str>);

impl Field {
    /// `From`.
    pub const FROM: Self = Self::from_static("From");
    /// `Sender`.
    pub const SENDER: Self = Self::from_static("Sender");
    /// `Reply-To`.
    pub const REPLY_TO: Self = Self::from_static("Reply-To");
    /// `To`.
    pub const TO: Self = Self::from_static("To");
    /// `Cc`.
    pub const CC: Self = Self::from_static("Cc");
    /// `Bcc`.
    pub const BCC: Self = Self::from_static("Bcc");
    /// `Resent-To`.
    pub const RESENT_TO: Self = Self::from_static("Resent-To");
    /// `Resent-Cc`.
    pub const RESENT_CC: Self = Self::from_static("Resent-Cc");
    /// `Resent-Bcc`.
    pub const RESENT_BCC: Self = Self::from_static("Resent-Bcc");
    /// `Message-ID`.
    pub const MESSAGE_ID: Self = Self::from_static("Message-ID");
    /// `Return-Path`.
    pub const RETURN_PATH: Self = Self::from_static("Return-Path");
    /// `Auto-Submitted`.
    pub const AUTO_SUBMITTED: Self = Self::from_static("Auto-Submitted");

    /// Fields naming who a message came from.
    pub const ORIGINATORS: &'static [Self] = &[Self::FROM, Self::SENDER, Self::REPLY_TO];

    /// Fields naming who a message went to.
    pub const RECIPIENTS: &'static [Self] = &[
        Self::TO,
        Self::CC,
        Self::BCC,
        Self::RESENT_TO,
        Self::RESENT_CC,
        Self::RESENT_BCC,
    ];

    /// A field with a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// A field with an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The field name as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a header with this name belongs to this field.
    pub fn is(&self, header_name: &str) -> bool {
        self.0.eq_ignore_ascii_case(header_name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
