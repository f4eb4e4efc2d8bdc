//! NATS account naming.
//!
//! Every issued user token is scoped to exactly one account: the token's
//! audience. In server configurations without an operator, accounts are
//! plain names such as `"APP"` or the global account `"$G"`.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the global account a server places users in when no account is
/// configured.
pub const GLOBAL_ACCOUNT: &str = "$G";

/// Name of a NATS account that issued tokens are bound to.
///
/// # Examples
///
/// ```
/// use callout_models::AccountName;
///
/// let account = AccountName::new("APP");
/// assert_eq!(account.to_string(), "APP");
///
/// let global: AccountName = "$G".into();
/// assert!(global.is_global());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountName(String);

impl AccountName {
    /// Create a new `AccountName` from a string slice.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the name is empty (not a usable token audience).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `true` for the server's implicit global account.
    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL_ACCOUNT
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for AccountName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}
