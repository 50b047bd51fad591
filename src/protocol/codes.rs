use rand::RngExt;

use super::types::{ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH};

/// Generate a 4-letter room code from the clean alphabet (A-Z minus I and O).
///
/// Codes are easy to read out loud; the confusable letters are excluded so a
/// code scribbled on a whiteboard survives transcription.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = ROOM_CODE_ALPHABET[idx] as char;
            ch
        })
        .collect()
}
