//! Address normalization.

/// Reduce an address to its bare `mailbox@host` form.
///
/// Display names are discarded and surrounding whitespace is trimmed, case is
/// preserved. Returns `None` when the input does not carry a usable address
/// (missing local part or domain, or unparseable).
pub fn normalize_address(raw: &str) -> Option<String> {
    normalize_addresses(raw).into_iter().next()
}

/// Extract every usable bare address from an address-list header value.
///
/// Group syntax is flattened. Malformed entries are dropped silently.
pub fn normalize_addresses(raw: &str) -> Vec<String> {
    let Ok(list) = mailparse::addrparse(raw) else {
        return Vec::new();
    };

    let mut addresses = Vec::new();
    for entry in list.iter() {
        match entry {
            mailparse::MailAddr::Single(info) => addresses.extend(bare(&info.addr)),
            mailparse::MailAddr::Group(group) => {
                addresses.extend(group.addrs.iter().filter_map(|info| bare(&info.addr)))
            }
        }
    }
    addresses
}

/// Validate and trim a single addr-spec.
fn bare(addr: &str) -> Option<String> {
    let addr = addr.trim();
    let addr = addr
        .strip_prefix('<')
        .and_then(|addr| addr.strip_suffix('>'))
        .unwrap_or(addr)
        .trim();

    let (local, domain) = addr.rsplit_once('@')?;
    if local.trim().is_empty() || domain.trim().is_empty() {
        return None;
    }
    if addr.chars().any(char::is_whitespace) {
        return None;
    }

    Some(addr.to_owned())
}
