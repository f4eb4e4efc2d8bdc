#![deny(missing_docs)]

//! # Callout Models
//!
//! Core data types for the NATS authorization callout.
//!
//! ## Claim hierarchy
//!
//! ```text
//! ClaimsData<T>                        (jti, iat, iss, name, sub, aud, exp)
//! ├── UserClaims                       issued to the connecting client
//! ├── AuthorizationRequestClaims       sent by the server on $SYS.REQ.USER.AUTH
//! └── AuthorizationResponseClaims      returned by the callout
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`account`] | Account names (`AccountName`) |
//! | [`claims`] | NATS JWT claim types in wire format |
//! | [`credential`] | Registered users (`CredentialEntry`, `PrivilegeLevel`) |
//! | [`permissions`] | Allow / deny rule sets and subject matching |
//! | [`request`] | Validated request / response views over the claims |
//! | [`subjects`] | Canonical subject names |

pub mod account;
pub mod claims;
pub mod credential;
pub mod error;
pub mod permissions;
pub mod request;
pub mod subjects;

// Re-export all public types at crate root for convenience.
pub use account::*;
pub use claims::*;
pub use credential::*;
pub use error::*;
pub use permissions::*;
pub use request::*;
pub use subjects::*;
