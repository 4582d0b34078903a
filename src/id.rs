use rand::seq::SliceRandom;
use rand::thread_rng;

/// Alphabet for paste identifiers. 36^6 ≈ 2.18 billion combinations.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const LENGTH: usize = 6;

/// Generate one candidate paste identifier.
///
/// `ThreadRng` is a CSPRNG; identifiers double as capability tokens for
/// private pastes, so they must not come from a predictable source.
pub fn generate() -> String {
    let mut rng = thread_rng();
    (0..LENGTH)
        .map(|_| *ALPHABET.choose(&mut rng).unwrap() as char)
        .collect()
}
