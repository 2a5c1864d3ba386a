//! Hardware address normalization.
//!
//! The cloud directory reports addresses as `AA:BB:CC:DD:EE:FF` (or already
//! stripped), while Home Assistant stores them in whatever form the owning
//! integration chose. Both sides are compared in the canonical form produced
//! by [`normalize`]: colons removed, lowercase.

/// Number of hex digits in a normalized 48-bit hardware address.
pub const ADDRESS_LEN: usize = 12;

/// Strip colons and lowercase.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ':')
        .flat_map(char::to_lowercase)
        .collect()
}

/// True if `normalized` looks like a full hardware address (12 hex digits).
pub fn is_hardware_address(normalized: &str) -> bool {
    normalized.len() == ADDRESS_LEN && normalized.bytes().all(|b| b.is_ascii_hexdigit())
}
