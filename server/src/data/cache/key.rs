//! Cache key builder.
//!
//! Key shapes are part of the deployed contract: the auth hash is populated
//! by an out-of-band loader and the events-listing keys are shared with
//! operational tooling, so both are built here and nowhere else.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

pub struct CacheKey;

impl CacheKey {
    /// Events listing response body for a (page, size) pair
    pub fn events_list(page: u32, page_size: u32) -> String {
        format!("events:list:page:{}:size:{}", page, page_size)
    }

    /// Glob matching every cached events listing
    pub fn events_list_pattern() -> &'static str {
        "events:list:*"
    }

    /// Field inside the users auth hash: base64("email:sha256hex(password)")
    pub fn auth_field(email: &str, password_hash: &str) -> String {
        BASE64.encode(format!("{}:{}", email, password_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_list_key_shape() {
        assert_eq!(CacheKey::events_list(1, 20), "events:list:page:1:size:20");
        assert_eq!(CacheKey::events_list(3, 5), "events:list:page:3:size:5");
    }

    #[test]
    fn auth_field_is_base64_of_email_and_hash() {
        let field = CacheKey::auth_field("user@example.com", "abc123");
        let decoded = BASE64.decode(field).unwrap();
        assert_eq!(decoded, b"user@example.com:abc123");
    }
}
