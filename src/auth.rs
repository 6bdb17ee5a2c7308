use sha2::{Digest, Sha256};

/// SHA-256 hex of a bearer token. Sessions are keyed by this, never by the
/// raw token.
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}
