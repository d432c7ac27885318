//! Random display names for anonymous visitors and fresh sessions.

use rand::Rng;
use rand::prelude::IndexedRandom;

const ADJECTIVES: [&str; 20] = [
    "Fluffy", "Whiskers", "Purrfect", "Sleepy", "Curious", "Sneaky", "Cozy", "Fuzzy", "Chonky",
    "Sassy", "Zoomie", "Midnight", "Shadow", "Velvet", "Silky", "Ginger", "Marble", "Spotted",
    "Stripy", "Golden",
];

const CAT_NAMES: [&str; 20] = [
    "Paws", "Meowster", "Whisker", "Mittens", "Tabby", "Calico", "Siamese", "Ragdoll", "Munchkin",
    "Bengal", "Sphinx", "Maine", "Persian", "Tuxedo", "Tortie", "Neko", "Kitty", "Furball",
    "Purrito", "Biscuit",
];

/// Generate a two-word visitor name, e.g. `"Cozy Tabby"`.
#[must_use]
pub fn generate_username() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).unwrap_or(&ADJECTIVES[0]);
    let cat = CAT_NAMES.choose(&mut rng).unwrap_or(&CAT_NAMES[0]);
    format!("{adjective} {cat}")
}

/// Generate a default session name, e.g. `"Sneaky Calico Ideas 42"`.
#[must_use]
pub fn generate_session_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).unwrap_or(&ADJECTIVES[0]);
    let cat = CAT_NAMES.choose(&mut rng).unwrap_or(&CAT_NAMES[0]);
    let n: u8 = rng.random_range(1..100);
    format!("{adjective} {cat} Ideas {n}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::model::{validate_session_name, validate_username};

    #[test]
    fn usernames_pass_validation() {
        for _ in 0..20 {
            let name = generate_username();
            assert!(validate_username(&name).is_ok(), "{name}");
        }
    }

    #[test]
    fn session_names_pass_validation() {
        for _ in 0..20 {
            let name = generate_session_name();
            assert!(validate_session_name(&name).is_ok(), "{name}");
        }
    }
}
