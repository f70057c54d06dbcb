//! Authentication module for ReReadery
//!
//! Token issuance belongs to the identity provider; this crate only verifies
//! bearer tokens signed with the shared secret and hashes account passwords
//! at registration.

mod jwt;
mod password;

pub use jwt::{generate_access_token, Claims, JwtError, TokenVerifier};
pub use password::{hash_password, verify_password};
