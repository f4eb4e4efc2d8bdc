//! In-memory credential store.
//!
//! Built once from the configuration and never mutated afterwards, so any
//! number of in-flight requests can read it through a shared reference.

use std::collections::HashMap;

use callout_models::CredentialEntry;

use crate::error::CalloutError;

/// Registered users keyed by username.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<String, CredentialEntry>,
}

impl CredentialStore {
    /// Build the store from `(username, entry)` pairs; a later duplicate
    /// username replaces an earlier one.
    pub fn new(entries: impl IntoIterator<Item = (String, CredentialEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up a user by name.
    pub fn lookup(&self, username: &str) -> Option<&CredentialEntry> {
        self.entries.get(username)
    }

    /// Return the entry for `username` if `password` matches exactly.
    ///
    /// Unknown users and wrong passwords yield the same
    /// [`CalloutError::InvalidCredentials`].
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<&CredentialEntry, CalloutError> {
        self.lookup(username)
            .filter(|entry| entry.password_matches(password))
            .ok_or(CalloutError::InvalidCredentials)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no user is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered usernames, in no particular order.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callout_models::{AccountName, PrivilegeLevel};

    fn store() -> CredentialStore {
        CredentialStore::new([
            (
                "admin".to_string(),
                CredentialEntry::new("admin", "APP", PrivilegeLevel::Privileged).unwrap(),
            ),
            (
                "test-2".to_string(),
                CredentialEntry::new("test-2", "$G", PrivilegeLevel::Standard).unwrap(),
            ),
        ])
    }

    #[test]
    fn lookup_hit_and_miss() {
        let store = store();
        let admin = store.lookup("admin").unwrap();
        assert_eq!(admin.target_account(), &AccountName::new("APP"));
        assert_eq!(admin.privilege(), PrivilegeLevel::Privileged);
        assert!(store.lookup("ghost").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn correct_password_authenticates() {
        let store = store();
        let entry = store.authenticate("test-2", "test-2").unwrap();
        assert_eq!(entry.privilege(), PrivilegeLevel::Standard);
    }

    #[test]
    fn wrong_password_and_unknown_user_are_indistinguishable() {
        let store = store();
        let wrong = store.authenticate("admin", "nope").unwrap_err();
        let unknown = store.authenticate("ghost", "anything").unwrap_err();

        assert!(matches!(wrong, CalloutError::InvalidCredentials));
        assert!(matches!(unknown, CalloutError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.client_message(), unknown.client_message());
    }

    #[test]
    fn every_registered_user_authenticates_with_own_password() {
        let store = store();
        for name in store.usernames() {
            assert!(store.authenticate(name, name).is_ok(), "{name}");
            assert!(store.authenticate(name, "wrong").is_err(), "{name}");
        }
    }

    #[test]
    fn empty_username_is_not_special() {
        let store = store();
        assert!(store.authenticate("", "").is_err());
    }
}
