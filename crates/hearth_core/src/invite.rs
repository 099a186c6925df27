//! crates/hearth_core/src/invite.rs
//!
//! Short, human-friendly invite codes for joining a house.

use std::collections::HashSet;

use tracing::warn;

use crate::ids::Env;

/// 32 symbols; 0/O and 1/I are left out so codes survive being read aloud.
pub const INVITE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 8;
pub const MAX_INVITE_ATTEMPTS: usize = 50;
pub const FALLBACK_PREFIX: &str = "INV-";

/// Draws a code that is not in `taken`.
///
/// Gives up after [`MAX_INVITE_ATTEMPTS`] collisions and returns a prefixed
/// opaque id instead, so the call always terminates.
pub fn generate_invite_code(env: &mut Env<'_>, taken: &HashSet<String>) -> String {
    for _ in 0..MAX_INVITE_ATTEMPTS {
        let candidate = draw(env);
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
    let fallback = format!("{FALLBACK_PREFIX}{}", env.new_id());
    warn!(
        attempts = MAX_INVITE_ATTEMPTS,
        code = %fallback,
        "invite code space exhausted, using fallback id"
    );
    fallback
}

/// Trims and uppercases a code typed by a user.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn draw(env: &mut Env<'_>) -> String {
    (0..INVITE_CODE_LEN)
        .map(|_| {
            // 32 divides 2^32, so the modulo is unbiased.
            let index = env.rng.next_u32() as usize % INVITE_ALPHABET.len();
            INVITE_ALPHABET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut env = Env::new(Utc::now(), &mut rng);
        for _ in 0..200 {
            let code = generate_invite_code(&mut env, &HashSet::new());
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn skips_codes_already_taken() {
        // StepRng(0, 1) yields 0, 1, 2, ... so the first draw is "ABCDEFGH".
        let mut rng = StepRng::new(0, 1);
        let mut env = Env::new(Utc::now(), &mut rng);
        let taken: HashSet<String> = ["ABCDEFGH".to_string()].into_iter().collect();
        let code = generate_invite_code(&mut env, &taken);
        assert_eq!(code, "JKLMNPQR");
    }

    #[test]
    fn exhausted_retries_fall_back_to_prefixed_id() {
        // A constant RNG draws "AAAAAAAA" every time.
        let mut rng = StepRng::new(0, 0);
        let mut env = Env::new(Utc::now(), &mut rng);
        let taken: HashSet<String> = ["AAAAAAAA".to_string()].into_iter().collect();
        let code = generate_invite_code(&mut env, &taken);
        assert!(code.starts_with(FALLBACK_PREFIX));
        assert!(!taken.contains(&code));
    }

    #[test]
    fn typed_codes_are_normalized() {
        assert_eq!(normalize_code("  abcd2345 "), "ABCD2345");
    }
}
