//! Deterministic per-component random streams.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

pub const DOMAIN_DAY: &[u8] = b"day";
pub const DOMAIN_QUEUE: &[u8] = b"queue";
pub const DOMAIN_MINIGAME: &[u8] = b"minigame";
pub const DOMAIN_BIOME: &[u8] = b"biome";
pub const DOMAIN_PROPS: &[u8] = b"props";

/// Derive an independent stream seed for `domain_tag` from a user seed.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

#[must_use]
pub fn stream_rng(user_seed: u64, domain_tag: &[u8]) -> SmallRng {
    SmallRng::seed_from_u64(derive_stream_seed(user_seed, domain_tag))
}
