//! HTTP handlers

pub mod entities;

use exquisite_core::generator::{random_string, HEX_CHARSET};

/// Liveness probe: `OK` plus a random suffix so responses are never cached
pub async fn root() -> String {
    random_string(10, "OK", HEX_CHARSET)
}
