//! Opaque id generation for sessions and cards.
//!
//! Ids use the url-safe nanoid alphabet so they survive in shareable links
//! without escaping. Session ids are shorter than card ids because they are
//! typed and spoken aloud; card ids only ever travel by machine.

use rand::Rng;

const ALPHABET: &[u8] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

const SESSION_ID_LENGTH: usize = 10;
const CARD_ID_LENGTH: usize = 12;

fn nanoid(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a shareable session slug.
#[must_use]
pub fn generate_session_id() -> String {
    nanoid(SESSION_ID_LENGTH)
}

/// Generate a client-side card id.
#[must_use]
pub fn generate_card_id() -> String {
    nanoid(CARD_ID_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(generate_session_id().len(), 10);
        assert_eq!(generate_card_id().len(), 12);
    }

    #[test]
    fn alphabet_is_url_safe() {
        for _ in 0..50 {
            let id = generate_card_id();
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'), "{id}");
        }
    }

    #[test]
    fn ids_are_distinct() {
        let a = generate_card_id();
        let b = generate_card_id();
        assert_ne!(a, b);
    }
}
