//! Referral code generation.
//!
//! Codes are 8 characters drawn from an alphabet with no 0/O/1/I/L, so a
//! code read over the phone or typed from a flyer cannot be mistyped into
//! a different valid code.

use rand::Rng;

/// Unambiguous alphabet: uppercase letters and digits minus 0, O, 1, I, L.
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Length of a referral code
pub const CODE_LEN: usize = 8;

/// Generate a fresh referral code.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Check that a candidate has the shape of a referral code.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LEN
        && code
            .bytes()
            .all(|b| CODE_ALPHABET.contains(&b))
}
