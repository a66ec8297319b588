//! Conversions between `async-imap` values and the client interface types.

use std::borrow::Cow;

use async_imap::imap_proto;
use async_imap::types::Capability;
use imap_client_core::{Address, Envelope};

/// Encode a mailbox name (or LIST pattern) to modified UTF-7.
pub fn encode_mailbox(name: &str) -> String {
    if name.is_ascii() && !name.contains('&') {
        return name.to_owned();
    }
    utf7_imap::encode_utf7_imap(name.to_owned())
}

/// Decode a modified UTF-7 mailbox name.
pub fn decode_mailbox(name: &str) -> String {
    if !name.contains('&') {
        return name.to_owned();
    }
    utf7_imap::decode_utf7_imap(name.to_owned())
}

pub(crate) fn capability(capability: &Capability) -> String {
    match capability {
        Capability::Imap4rev1 => "IMAP4REV1".to_owned(),
        Capability::Auth(mechanism) => format!("AUTH={mechanism}"),
        Capability::Atom(atom) => atom.clone(),
    }
}

/// Lossy text of an envelope field.
fn text(value: &Option<Cow<'_, [u8]>>) -> Option<String> {
    value
        .as_deref()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

fn addresses(list: &Option<Vec<imap_proto::Address<'_>>>) -> Vec<Address> {
    list.iter()
        .flatten()
        .map(|address| Address {
            name: text(&address.name),
            mailbox: text(&address.mailbox),
            host: text(&address.host),
        })
        .collect()
}

pub(crate) fn envelope(envelope: &imap_proto::Envelope<'_>) -> Envelope {
    Envelope {
        date: text(&envelope.date),
        subject: text(&envelope.subject),
        from: addresses(&envelope.from),
        sender: addresses(&envelope.sender),
        reply_to: addresses(&envelope.reply_to),
        to: addresses(&envelope.to),
        cc: addresses(&envelope.cc),
        bcc: addresses(&envelope.bcc),
        in_reply_to: text(&envelope.in_reply_to),
        message_id: text(&envelope.message_id),
    }
}
