/// Opaque confirmation-token generation
///
/// Confirmation tokens authorize exactly one password change. They are
/// random base62 strings with no structure to validate; lookup either
/// matches an account or it does not.
///
/// Generation is a pure function of OS entropy with no shared generator
/// state, so it is safe to call from any number of concurrent requests.
use rand::Rng;

/// Length of a confirmation token in characters
///
/// 43 base62 characters carry ~256 bits of entropy.
pub const CONFIRMATION_TOKEN_LENGTH: usize = 43;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a cryptographically unguessable confirmation token
pub fn generate_confirmation_token() -> String {
    let mut rng = rand::thread_rng();

    (0..CONFIRMATION_TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
