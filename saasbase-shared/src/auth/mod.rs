/// Authentication utilities
///
/// # Modules
///
/// - [`context`]: Resolution chain from an authenticated principal to the
///   current account, user and subscription
/// - [`jwt`]: Access-token creation and validation (HS256)
/// - [`password`]: Argon2id password hashing
/// - [`token`]: Opaque confirmation-token generation
pub mod context;
pub mod jwt;
pub mod password;
pub mod token;
