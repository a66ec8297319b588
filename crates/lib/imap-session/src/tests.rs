use crate::auth::{Mechanism, Params, oauth2_response, plain_response};

#[test]
fn plain_message_layout() {
    assert_eq!(plain_response("alice", "secret", None), "\0alice\0secret");
    assert_eq!(
        plain_response("admin", "secret", Some("alice")),
        "alice\0admin\0secret"
    );
}

#[test]
fn xoauth2_message_layout() {
    assert_eq!(
        oauth2_response(Mechanism::XOAuth2, "me@example.com", "tok", None),
        "user=me@example.com\x01auth=Bearer tok\x01\x01"
    );
    assert_eq!(
        oauth2_response(Mechanism::XOAuth2, "me@example.com", "tok", Some("acme")),
        "user=me@example.com\x01auth=Bearer tok\x01vendor=acme\x01\x01"
    );
}

#[test]
fn oauthbearer_message_layout() {
    assert_eq!(
        oauth2_response(Mechanism::OAuthBearer, "me@example.com", "tok", Some("acme")),
        "n,a=me@example.com,\x01auth=Bearer tok\x01\x01"
    );
}

#[test]
fn mechanism_names() {
    assert_eq!(Mechanism::default(), Mechanism::XOAuth2);
    assert_eq!(Mechanism::XOAuth2.to_string(), "XOAUTH2");
    assert_eq!(Mechanism::OAuthBearer.to_string(), "OAUTHBEARER");
}

#[test]
fn logged_user() {
    let login = Params::Login {
        username: "alice",
        password: "secret",
    };
    let plain = Params::Plain {
        identity: "admin",
        password: "secret",
        authorization_identity: Some("alice"),
    };
    let oauth2 = Params::OAuth2 {
        user: "bob",
        access_token: "tok",
        mechanism: Mechanism::OAuthBearer,
        vendor: None,
    };

    assert_eq!(login.user(), "alice");
    assert_eq!(plain.user(), "admin");
    assert_eq!(oauth2.user(), "bob");
}
