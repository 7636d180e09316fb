//! Shared utilities for adapter-layer validation.

/// Normalize a device address to upper case.
///
/// Accepts a MAC separated by colons or hyphens (`0c:6e:39:37:78:b4`,
/// `0c-6e-39-37-78-b4`) or a UUID as used by platforms that hide MACs
/// (`0C6E3937-78B4-BA7E-A934-D4C5C9EDEC2A`).  MACs come back colon-separated.
/// Returns `None` for anything else.
pub(super) fn normalize_address(addr: &str) -> Option<String> {
    let upper = addr.trim().to_ascii_uppercase();
    if is_mac(&upper, ':') {
        Some(upper)
    } else if is_mac(&upper, '-') {
        Some(upper.replace('-', ":"))
    } else if is_uuid(&upper) {
        Some(upper)
    } else {
        None
    }
}

fn is_hex_group(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_mac(s: &str, sep: char) -> bool {
    let groups: Vec<&str> = s.split(sep).collect();
    groups.len() == 6 && groups.iter().all(|g| is_hex_group(g, 2))
}

fn is_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| is_hex_group(g, len))
}
