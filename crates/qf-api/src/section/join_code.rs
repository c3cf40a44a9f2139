use rand::{Rng, seq::SliceRandom};

pub const JOIN_CODE_LEN: usize = 8;

/// Uppercase letters and digits without the easily confused 0, O, 1 and I
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_join_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .filter_map(|_| ALPHABET.choose(rng).map(|&b| char::from(b)))
        .collect()
}

/// Canonical form of a code typed by a user, or `None` if it cannot be valid
pub fn normalize_join_code(input: &str) -> Option<String> {
    let code: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    (code.len() == JOIN_CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b))).then_some(code)
}
