// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure token generation for session identifiers
This module provides cryptographically secure, URL-safe session ids. */
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
pub const SESSION_ID_BYTES: usize = 32;

/** Generate a cryptographically secure random session id
This uses the thread-local CSPRNG (seeded from the OS) to create
a token suitable for session ids.
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_session_id() -> String {
    generate_secure_token_with_size(SESSION_ID_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
