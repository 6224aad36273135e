//! 64-bit FNV-1a hashing of field and constant names.
//!
//! Three flavours are used by the match tables:
//! - [`fnv1a_64`]: the exact bytes of a name;
//! - [`fnv1a_64_folded`]: ASCII-lowercased, used for case-insensitive enum lookup;
//! - [`fnv1a_64_smart`]: ASCII-lowercased with `_` and `-` removed, used for smart
//!   field matching (`user_name`, `UserName` and `user-name` all collide on purpose).

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash the exact bytes of `name`.
pub const fn fnv1a_64(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

/// Hash `name` with ASCII letters lowercased.
pub const fn fnv1a_64_folded(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i].to_ascii_lowercase() as u64;
        hash = hash.wrapping_mul(PRIME);
        i += 1;
    }
    hash
}

/// Hash `name` lowercased, skipping `_` and `-` separators.
pub const fn fnv1a_64_smart(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'_' && b != b'-' {
            hash ^= b.to_ascii_lowercase() as u64;
            hash = hash.wrapping_mul(PRIME);
        }
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn known_vectors() {
        assert_eq!(fnv1a_64(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn folded_ignores_case_only() {
        assert_eq!(fnv1a_64_folded("Red"), fnv1a_64("red"));
        assert_ne!(fnv1a_64_folded("re_d"), fnv1a_64("red"));
    }

    #[test]
    fn smart_ignores_case_and_separators() {
        let expected = fnv1a_64("username");
        assert_eq!(fnv1a_64_smart("user_name"), expected);
        assert_eq!(fnv1a_64_smart("UserName"), expected);
        assert_eq!(fnv1a_64_smart("user-name"), expected);
        assert_eq!(fnv1a_64_smart("_user_name"), expected);
    }
}
