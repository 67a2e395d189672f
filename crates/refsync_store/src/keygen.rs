//! Generation of entity keys for locally created objects.

use rand::Rng;

/// Characters allowed in entity keys. Excludes `0`, `1` and `O`.
pub const KEY_ALPHABET: &[u8] = b"23456789ABCDEFGHIJKLMNPQRSTUVWXYZ";

/// Length of an entity key.
pub const KEY_LENGTH: usize = 8;

/// Generates a random entity key.
#[must_use]
pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_LENGTH)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// Returns true if `key` has the shape of a generated entity key.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    key.len() == KEY_LENGTH && key.bytes().all(|b| KEY_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_valid() {
        for _ in 0..100 {
            let key = generate_key();
            assert!(is_valid_key(&key), "bad key {key}");
        }
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(!is_valid_key("ABC"));
        assert!(!is_valid_key("ABCDEFG0"));
        assert!(is_valid_key("ABCDEFG2"));
    }
}
