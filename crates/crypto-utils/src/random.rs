use rand::RngCore;
use rand_core::OsRng;

use crate::zeroizing::SecretKeyBytes;

/// Generates a fixed-size array of cryptographically secure random bytes.
pub fn random_bytes_fixed<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Fresh 32-byte secret key candidate from the OS generator.
///
/// The caller still checks the value is a valid curve scalar.
pub fn random_secret_key() -> SecretKeyBytes {
    SecretKeyBytes::new(random_bytes_fixed())
}
