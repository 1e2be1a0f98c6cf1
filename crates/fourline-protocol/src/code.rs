//! Random short codes for rooms and participants.
//!
//! Codes are drawn uniformly from [`ROOM_CODE_ALPHABET`]. Nothing here checks
//! for uniqueness: the persistence layer rejects duplicate room codes on
//! create, and the gateway retries with a fresh draw.

use rand::Rng;

/// The characters a generated code is built from.
///
/// Upper-case only, so a generated code always survives the
/// trim-and-uppercase normalization applied at lookup time.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random code of `len` characters.
///
/// Uses the thread-local RNG, so it is cheap and can be called from any
/// task without coordination.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}
