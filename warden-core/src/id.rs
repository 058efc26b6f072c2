//! ID generation utilities with prefix support
//!
//! This module provides utilities for generating unique IDs with prefixes,
//! similar to Stripe's API. IDs are generated with at least 96 bits of entropy
//! and are URL-safe.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Generate a prefixed ID with at least 96 bits of entropy
///
/// The ID format is: `{prefix}_{random_string}`
/// Where the random string is base64 URL-safe encoded without padding.
///
/// # Arguments
/// * `prefix` - The prefix for the ID (e.g., "acct")
///
/// # Example
/// ```
/// use warden_core::id::generate_prefixed_id;
///
/// let account_id = generate_prefixed_id("acct");
/// assert!(account_id.starts_with("acct_"));
/// ```
pub fn generate_prefixed_id(prefix: &str) -> String {
    // Generate 12 bytes (96 bits) of random data
    let mut bytes = [0u8; 12];
    OsRng.try_fill_bytes(&mut bytes).unwrap();

    // Encode to base64 URL-safe without padding
    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    format!("{prefix}_{encoded}")
}

/// Validate that a prefixed ID has the expected format
///
/// # Arguments
/// * `id` - The ID to validate
/// * `expected_prefix` - The expected prefix
///
/// # Returns
/// `true` if the ID has the correct format, `false` otherwise
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    // Check if ID starts with prefix followed by underscore
    if !id.starts_with(&format!("{expected_prefix}_")) {
        return false;
    }

    // Extract the random part
    let random_part = &id[expected_prefix.len() + 1..];

    // Try to decode to ensure it's valid base64
    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12, // At least 96 bits
        Err(_) => false,
    }
}
