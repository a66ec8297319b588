//! Parsed header block.

/// The header fields of a message, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Parse a raw header block.
    pub fn parse(raw: &[u8]) -> Result<Self, mailparse::MailParseError> {
        let (headers, _) = mailparse::parse_headers(raw)?;
        Ok(Self(
            headers
                .iter()
                .map(|header| (header.get_key(), header.get_value()))
                .collect(),
        ))
    }

    /// The first value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// All values of a field.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether any field name starts with the prefix (case-insensitive).
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.iter().any(|(key, _)| {
            key.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }

    /// All fields.
    pub fn fields(&self) -> &[(String, String)] {
        &self.0
    }

    /// `Message-ID`, without angle brackets.
    pub fn message_id(&self) -> Option<String> {
        self.get("Message-ID")
            .and_then(|value| message_ids(value).into_iter().next())
    }

    /// Ids listed in `In-Reply-To`.
    pub fn in_reply_to(&self) -> Vec<String> {
        self.get("In-Reply-To").map(message_ids).unwrap_or_default()
    }

    /// Ids listed in `References`.
    pub fn references(&self) -> Vec<String> {
        self.get("References").map(message_ids).unwrap_or_default()
    }

    /// The bare `Return-Path` address.
    pub fn return_path(&self) -> Option<String> {
        self.get("Return-Path")
            .and_then(mail_query::normalize_address)
    }

    /// `Auto-Submitted`, trimmed.
    pub fn auto_submitted(&self) -> Option<&str> {
        self.get("Auto-Submitted").map(str::trim)
    }

    /// `Precedence`, trimmed.
    pub fn precedence(&self) -> Option<&str> {
        self.get("Precedence").map(str::trim)
    }

    /// `Subject`.
    pub fn subject(&self) -> Option<&str> {
        self.get("Subject")
    }
}

/// Extract message ids from a header value, stripping angle brackets.
pub(crate) fn message_ids(value: &str) -> Vec<String> {
    let ids: Vec<String> = match mailparse::msgidparse(value) {
        Ok(ids) => ids.iter().map(|id| strip_brackets(id)).collect(),
        Err(_) => value.split_whitespace().map(strip_brackets).collect(),
    };
    ids.into_iter().filter(|id| !id.is_empty()).collect()
}

/// Trim whitespace and one layer of angle brackets.
fn strip_brackets(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_owned()
}
