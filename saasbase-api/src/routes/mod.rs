/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `account`: Signup, password reset and active-user binding
pub mod account;
pub mod health;
