//! RNG seed derivation for deterministic sessions.
//!
//! With an engine seed configured, every session gets its own seed derived
//! from that base and the order in which the session was created, so a
//! replay that creates sessions in the same order sees the same turn orders
//! and hint picks.

/// Derive the seed for the `ordinal`-th session created by an engine.
pub fn derive_session_seed(engine_seed: u64, ordinal: u64) -> u64 {
    // splitmix64 finalizer over the combined input
    let mut z = engine_seed.wrapping_add(ordinal.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
