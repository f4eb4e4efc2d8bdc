//! Permission rule sets granted to connecting users.
//!
//! A [`PermissionRuleSet`] holds one [`SubjectRules`] per direction
//! (publish and subscribe) plus the [`ResponseLimits`] applied to reply
//! subjects. Deny entries always win over allow entries.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::subjects::CalloutSubjects;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which side of a permission a subject is checked against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Publishing messages.
    Publish,
    /// Subscribing to messages.
    Subscribe,
}

// ---------------------------------------------------------------------------
// SubjectRules
// ---------------------------------------------------------------------------

/// Allow / deny subject patterns for one direction.
///
/// `allow` keeps insertion order since it is encoded as-is into the token;
/// `deny` is a set, so two rule sets with the same entries compare equal
/// regardless of how they were built.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectRules {
    /// Patterns the user may use.
    pub allow: Vec<String>,
    /// Patterns the user may never use, overriding `allow`.
    pub deny: BTreeSet<String>,
}

impl SubjectRules {
    /// Rules allowing every subject with nothing denied.
    pub fn allow_all() -> Self {
        Self {
            allow: vec![CalloutSubjects::ALL.to_string()],
            deny: BTreeSet::new(),
        }
    }

    /// Add a denied pattern.
    pub fn deny(mut self, pattern: impl Into<String>) -> Self {
        self.deny.insert(pattern.into());
        self
    }

    /// `true` if `subject` is allowed and not denied.
    ///
    /// # Examples
    ///
    /// ```
    /// use callout_models::SubjectRules;
    ///
    /// let rules = SubjectRules::allow_all().deny("$JS.API.STREAM.DELETE.>");
    /// assert!(rules.permits("orders.new"));
    /// assert!(!rules.permits("$JS.API.STREAM.DELETE.orders"));
    /// ```
    pub fn permits(&self, subject: &str) -> bool {
        let denied = self
            .deny
            .iter()
            .any(|pattern| CalloutSubjects::matches(pattern, subject));
        if denied {
            return false;
        }
        self.allow
            .iter()
            .any(|pattern| CalloutSubjects::matches(pattern, subject))
    }

    /// Every pattern in the rules, allow entries first.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.allow
            .iter()
            .chain(self.deny.iter())
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// ResponseLimits
// ---------------------------------------------------------------------------

/// Limits on publishing to reply subjects of received requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLimits {
    /// How many responses may be sent per request.
    pub max_responses: u32,
    /// How long the reply permission lasts; zero means no expiry.
    pub expiry: Duration,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            max_responses: 1,
            expiry: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// PermissionRuleSet
// ---------------------------------------------------------------------------

/// Complete permission set embedded in an issued user token.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionRuleSet {
    /// Publish rules.
    pub publish: SubjectRules,
    /// Subscribe rules.
    pub subscribe: SubjectRules,
    /// Reply subject limits.
    pub response_limits: ResponseLimits,
}

impl PermissionRuleSet {
    /// Rules for one direction.
    pub fn rules(&self, direction: Direction) -> &SubjectRules {
        match direction {
            Direction::Publish => &self.publish,
            Direction::Subscribe => &self.subscribe,
        }
    }

    /// `true` if `subject` is permitted in `direction`.
    pub fn permits(&self, direction: Direction, subject: &str) -> bool {
        self.rules(direction).permits(subject)
    }

    /// `true` when neither direction denies anything.
    pub fn is_unrestricted(&self) -> bool {
        self.publish.deny.is_empty() && self.subscribe.deny.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
