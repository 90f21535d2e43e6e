//! Bearer-token identity verification for the coop backend.
//!
//! Accounts live elsewhere; this service only checks HS256 tokens signed
//! with the shared secret and reads the caller's user id from `sub`.

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::JwtManager;
