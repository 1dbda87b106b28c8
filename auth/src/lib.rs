//! # Raffle Authentication
//!
//! Credentials for the raffle API:
//!
//! - [`PasswordHasher`]: Argon2id hashes stored as PHC strings
//! - [`TokenIssuer`]: HS256 bearer tokens carrying the user's id, email, and role
//!
//! ## Example
//!
//! ```rust,ignore
//! use raffle_auth::{PasswordHasher, TokenIssuer};
//!
//! let hash = PasswordHasher::new().hash("hunter22")?;
//! let issued = TokenIssuer::new(secret).issue(&user.profile(), clock.now())?;
//! let claims = issuer.verify(&issued.token, clock.now())?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod error;
pub mod password;
pub mod token;

pub use error::{AuthError, Result};
pub use password::{DUMMY_PASSWORD_HASH, PasswordHasher};
pub use token::{Claims, IssuedToken, TokenIssuer};
