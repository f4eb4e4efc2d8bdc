//! Credential entries and privilege levels.
//!
//! A [`CredentialEntry`] is what the credential store keeps per username:
//! the expected password, the account the user lands in, and the
//! [`PrivilegeLevel`] that drives permission derivation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::account::AccountName;
use crate::error::ModelError;

// ---------------------------------------------------------------------------
// PrivilegeLevel
// ---------------------------------------------------------------------------

/// Coarse two-tier authorization class of a user.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrivilegeLevel {
    /// Unrestricted access, including the JetStream control plane.
    Privileged,
    /// Data-plane access only; stream topology changes are denied.
    Standard,
}

impl From<bool> for PrivilegeLevel {
    fn from(privileged: bool) -> Self {
        if privileged {
            Self::Privileged
        } else {
            Self::Standard
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialEntry
// ---------------------------------------------------------------------------

/// A registered user as resolved at startup.
///
/// Immutable once built. The password never appears in `Debug` output so
/// entries can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    password: String,
    target_account: AccountName,
    privilege: PrivilegeLevel,
}

impl CredentialEntry {
    /// Build an entry, rejecting an empty target account.
    ///
    /// # Examples
    ///
    /// ```
    /// use callout_models::{CredentialEntry, PrivilegeLevel};
    ///
    /// let entry = CredentialEntry::new("s3cret", "APP", PrivilegeLevel::Privileged).unwrap();
    /// assert!(entry.password_matches("s3cret"));
    /// assert!(!format!("{entry:?}").contains("s3cret"));
    ///
    /// assert!(CredentialEntry::new("pw", "", PrivilegeLevel::Standard).is_err());
    /// ```
    pub fn new(
        password: impl Into<String>,
        target_account: impl Into<AccountName>,
        privilege: PrivilegeLevel,
    ) -> Result<Self, ModelError> {
        let target_account = target_account.into();
        if target_account.is_empty() {
            return Err(ModelError::InvalidAccount {
                value: target_account.to_string(),
                reason: "must not be empty".into(),
            });
        }

        Ok(Self {
            password: password.into(),
            target_account,
            privilege,
        })
    }

    /// Exact comparison of a presented password against the stored one.
    pub fn password_matches(&self, presented: &str) -> bool {
        self.password == presented
    }

    /// Account the user's token is issued for.
    pub fn target_account(&self) -> &AccountName {
        &self.target_account
    }

    /// Privilege level of the user.
    pub fn privilege(&self) -> PrivilegeLevel {
        self.privilege
    }
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("password", &"<redacted>")
            .field("target_account", &self.target_account)
            .field("privilege", &self.privilege)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_from_bool() {
        assert_eq!(PrivilegeLevel::from(true), PrivilegeLevel::Privileged);
        assert_eq!(PrivilegeLevel::from(false), PrivilegeLevel::Standard);
    }

    #[test]
    fn privilege_display_and_parse() {
        use std::str::FromStr;
        assert_eq!(PrivilegeLevel::Privileged.to_string(), "privileged");
        assert_eq!(PrivilegeLevel::Standard.to_string(), "standard");
        assert_eq!(
            PrivilegeLevel::from_str("standard").unwrap(),
            PrivilegeLevel::Standard
        );
        assert!(PrivilegeLevel::from_str("root").is_err());
    }

    #[test]
    fn privilege_enum_iter_is_total() {
        use strum::IntoEnumIterator;
        let variants: Vec<_> = PrivilegeLevel::iter().collect();
        assert_eq!(
            variants,
            vec![PrivilegeLevel::Privileged, PrivilegeLevel::Standard]
        );
    }

    #[test]
    fn password_match_is_exact() {
        let entry = CredentialEntry::new("admin", "APP", PrivilegeLevel::Privileged).unwrap();
        assert!(entry.password_matches("admin"));
        assert!(!entry.password_matches("Admin"));
        assert!(!entry.password_matches("admin "));
        assert!(!entry.password_matches(""));
    }

    #[test]
    fn debug_redacts_password() {
        let entry = CredentialEntry::new("hunter2", "$G", PrivilegeLevel::Standard).unwrap();
        let dbg = format!("{entry:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
        assert!(dbg.contains("$G"));
    }

    #[test]
    fn empty_account_rejected() {
        let err = CredentialEntry::new("pw", " ", PrivilegeLevel::Standard).unwrap_err();
        assert!(matches!(err, ModelError::InvalidAccount { .. }));
    }
}
