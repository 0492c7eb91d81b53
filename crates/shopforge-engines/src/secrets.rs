//! Chart secret generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

/// MySQL password length in characters
pub const MYSQL_PASSWORD_LEN: usize = 16;
/// WordPress admin password length in characters
pub const ADMIN_PASSWORD_LEN: usize = 12;

/// Generate a password: OS-level CSPRNG bytes, base64url-encoded without
/// padding, truncated to `len` characters.
pub fn generate_password(len: usize) -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
    encoded.truncate(len);
    encoded
}
