//! Query fingerprinting for baseline keys.
//!
//! A whitespace-normalized, lower-cased SHA-256 digest of the query text,
//! used as the baseline store key.

use sha2::{Digest, Sha256};

/// Whitespace-normalize (collapse runs of whitespace to a single space, trim
/// ends) and lower-case a SQL string.
pub fn normalize(sql: &str) -> String {
    let mut normalized = String::with_capacity(sql.len());
    let mut last_was_space = true;
    for ch in sql.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
            }
            last_was_space = true;
        } else {
            normalized.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    if normalized.ends_with(' ') {
        normalized.pop();
    }
    normalized
}

/// Derive the SHA-256 fingerprint (hex-encoded) of a SQL statement, used as
/// the baseline store key. Immutable per analysis: identical normalized SQL
/// always yields the same fingerprint.
pub fn fingerprint(sql: &str) -> String {
    let normalized = normalize(sql);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(
            normalize("SELECT  *\nFROM   Users"),
            "select * from users"
        );
    }

    #[test]
    fn fingerprint_is_stable_across_whitespace_variance() {
        let a = fingerprint("SELECT * FROM users WHERE id = 1");
        let b = fingerprint("select *   from users\n where id = 1");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_for_different_queries() {
        let a = fingerprint("SELECT * FROM users");
        let b = fingerprint("SELECT * FROM orders");
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_sha256_hex_length() {
        let f = fingerprint("SELECT 1");
        assert_eq!(f.len(), 64);
    }
}
