//! Authentication.

/// An auth error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Login failed.
    #[error("login: {0}")]
    Login(#[source] async_imap::error::Error),

    /// SASL PLAIN failed.
    #[error("plain: {0}")]
    Plain(#[source] async_imap::error::Error),

    /// OAuth2 failed.
    #[error("oauth2 ({mechanism}): {source}")]
    OAuth2 {
        /// The SASL mechanism used.
        mechanism: Mechanism,

        /// The cause.
        #[source]
        source: async_imap::error::Error,
    },
}

impl Error {
    /// The underlying protocol error.
    pub fn imap(&self) -> &async_imap::error::Error {
        match self {
            Self::Login(error) | Self::Plain(error) => error,
            Self::OAuth2 { source, .. } => source,
        }
    }
}

/// The SASL mechanism carrying an OAuth 2 token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mechanism {
    /// Google/Microsoft `XOAUTH2`.
    #[default]
    XOAuth2,

    /// RFC 7628 `OAUTHBEARER`.
    OAuthBearer,
}

impl Mechanism {
    /// The mechanism name sent with `AUTHENTICATE`.
    pub fn name(self) -> &'static str {
        match self {
            Self::XOAuth2 => "XOAUTH2",
            Self::OAuthBearer => "OAUTHBEARER",
        }
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Auth params.
#[derive(Debug, Clone, PartialEq)]
pub enum Params<'a> {
    /// Username/password login.
    Login {
        /// Username for IMAP authentication.
        ///
        /// Typically an email address.
        username: &'a str,

        /// Password for IMAP authentication.
        password: &'a str,
    },

    /// SASL PLAIN.
    Plain {
        /// Authentication identity.
        identity: &'a str,

        /// Password for the authentication identity.
        password: &'a str,

        /// Identity to act as, if different from `identity`.
        authorization_identity: Option<&'a str>,
    },

    /// OAuth 2 authentication.
    OAuth2 {
        /// The user for IMAP authentication.
        ///
        /// Typically an email address.
        user: &'a str,

        /// The access token for IMAP authentication.
        access_token: &'a str,

        /// SASL mechanism.
        mechanism: Mechanism,

        /// Vendor name some providers expect alongside `XOAUTH2`.
        vendor: Option<&'a str>,
    },
}

impl Params<'_> {
    /// The user being authenticated, for logs.
    pub fn user(&self) -> &str {
        match self {
            Self::Login { username, .. } => username,
            Self::Plain { identity, .. } => identity,
            Self::OAuth2 { user, .. } => user,
        }
    }
}

/// Authenticate to the client to obtain a session.
pub(crate) async fn execute(
    client: crate::Client,
    auth: Params<'_>,
) -> Result<crate::Session, Error> {
    match auth {
        Params::Login { username, password } => client
            .login(username, password)
            .await
            .map_err(|(err, _client)| err)
            .map_err(Error::Login),
        Params::Plain {
            identity,
            password,
            authorization_identity,
        } => client
            .authenticate(
                "PLAIN",
                Initial(plain_response(identity, password, authorization_identity)),
            )
            .await
            .map_err(|(err, _client)| err)
            .map_err(Error::Plain),
        Params::OAuth2 {
            user,
            access_token,
            mechanism,
            vendor,
        } => client
            .authenticate(
                mechanism.name(),
                Initial(oauth2_response(mechanism, user, access_token, vendor)),
            )
            .await
            .map_err(|(err, _client)| err)
            .map_err(|source| Error::OAuth2 { mechanism, source }),
    }
}

/// The RFC 4616 PLAIN message.
pub(crate) fn plain_response(
    identity: &str,
    password: &str,
    authorization_identity: Option<&str>,
) -> String {
    format!(
        "{}\0{identity}\0{password}",
        authorization_identity.unwrap_or_default()
    )
}

/// The initial client response of an OAuth 2 mechanism.
pub(crate) fn oauth2_response(
    mechanism: Mechanism,
    user: &str,
    access_token: &str,
    vendor: Option<&str>,
) -> String {
    match mechanism {
        Mechanism::XOAuth2 => {
            let mut response = format!("user={user}\x01auth=Bearer {access_token}\x01");
            if let Some(vendor) = vendor {
                response.push_str(&format!("vendor={vendor}\x01"));
            }
            response.push('\x01');
            response
        }
        Mechanism::OAuthBearer => {
            format!("n,a={user},\x01auth=Bearer {access_token}\x01\x01")
        }
    }
}

/// Answers the server's first challenge with a prepared response and every
/// later one (an error report) with an empty line.
struct Initial(String);

impl async_imap::Authenticator for Initial {
    type Response = String;

    fn process(&mut self, _: &[u8]) -> Self::Response {
        std::mem::take(&mut self.0)
    }
}
