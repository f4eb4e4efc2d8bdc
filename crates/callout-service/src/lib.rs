//! NATS authorization callout service.
//!
//! The NATS server forwards every client connection attempt to
//! `$SYS.REQ.USER.AUTH` as a signed request JWT. This crate verifies the
//! request, checks the presented username and password against an
//! in-memory [`CredentialStore`], and answers with a signed response that
//! carries either a scoped user JWT or a generic error.
//!
//! | Module      | Responsibility                                       |
//! |-------------|------------------------------------------------------|
//! | [`config`]  | JSON configuration and overrides                     |
//! | [`error`]   | [`CalloutError`] and client-facing messages          |
//! | [`handler`] | Per-request pipeline, exactly one reply per request  |
//! | [`jwt`]     | NATS JWT encoding, decoding and verification         |
//! | [`policy`]  | Privilege level → permission rule set                |
//! | [`service`] | Subscription lifecycle (start / drain / stop)        |
//! | [`signing`] | Account nkey the service signs with                  |
//! | [`store`]   | Username → credential entry lookup                   |

pub mod config;
pub mod error;
pub mod handler;
pub mod jwt;
pub mod policy;
pub mod service;
pub mod signing;
pub mod store;

pub use config::AppConfig;
pub use error::CalloutError;
pub use handler::{CalloutHandler, CalloutMessage, Replier};
pub use service::{CalloutService, RequestSource, Transport};
pub use signing::SigningIdentity;
pub use store::CredentialStore;
