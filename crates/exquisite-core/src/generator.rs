//! Random data generation for seeding and tests
//!
//! Nothing here touches a store. The only shared state is the thread-local
//! PRNG behind `rand::thread_rng`.

use exquisite_types::Entity;
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// Characters random payloads are drawn from
pub const DATA_CHARSET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ :;~`\\|/?.,<>{}()&*%$#@";

/// Lowercase hex digits
pub const HEX_CHARSET: &str = "0123456789abcdef";

/// Marker every generated payload starts with
pub const DATA_PREFIX: &str = "RANDOM DATA: ";

/// Payload length used when the caller does not pick one
pub const DATA_SIZE_DEFAULT: usize = 20000;

/// Fresh unique identifier for a new entity.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A string of exactly `size` characters.
///
/// The first characters come from `prefix` (cut short when it is longer
/// than `size`); the rest are drawn from `charset`. With an empty `charset`
/// there is nothing to draw from and only the prefix is returned.
pub fn random_string(size: usize, prefix: &str, charset: &str) -> String {
    let mut result: String = prefix.chars().take(size).collect();
    let remaining = size - result.chars().count();
    let charset: Vec<char> = charset.chars().collect();
    if remaining == 0 || charset.is_empty() {
        return result;
    }

    let mut rng = rand::thread_rng();
    result.extend((0..remaining).map(|_| charset[rng.gen_range(0..charset.len())]));
    result
}

/// `count` entities with unique ids and `size`-character payloads.
pub fn generate_entities(count: usize, size: usize) -> Vec<Entity> {
    let started = Instant::now();

    let entities: Vec<Entity> = (0..count)
        .map(|_| Entity::new(generate_id(), random_string(size, DATA_PREFIX, DATA_CHARSET)))
        .collect();

    debug!(
        "Generated {} entities of size {} in {:?}",
        count,
        size,
        started.elapsed()
    );
    entities
}
