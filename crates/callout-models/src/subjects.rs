//! Canonical NATS subject definitions for the authorization callout.
//!
//! All subject strings the callout touches are built through
//! [`CalloutSubjects`] so the service, its tests, and tooling agree on a
//! single spelling.
//!
//! # Subject layout
//!
//! ```text
//! $SYS.REQ.USER.AUTH                    ← server PUBLISHES auth requests here
//! >                                     ← every subject
//! $JS.API.STREAM.CREATE.>               ← JetStream control plane (create)
//! $JS.API.STREAM.DELETE.>               ←                          (delete)
//! $JS.API.STREAM.PURGE.>                ←                          (purge)
//! $JS.API.STREAM.PEER.REMOVE.>          ←                          (peer removal)
//! $JS.API.STREAM.LEADER.STEPDOWN.>      ←                          (leader stepdown)
//! ```

use crate::error::ModelError;

/// Prefix of the JetStream stream-management API.
const JS_STREAM_API: &str = "$JS.API.STREAM";

/// Central authority for all subject names used by the callout.
///
/// # Examples
///
/// ```
/// use callout_models::CalloutSubjects;
///
/// assert_eq!(CalloutSubjects::AUTH_REQUEST, "$SYS.REQ.USER.AUTH");
/// assert_eq!(CalloutSubjects::stream_create(), "$JS.API.STREAM.CREATE.>");
/// assert!(CalloutSubjects::matches("$JS.API.STREAM.CREATE.>", "$JS.API.STREAM.CREATE.orders"));
/// ```
pub struct CalloutSubjects;

impl CalloutSubjects {
    /// System subject the server publishes authorization requests on.
    pub const AUTH_REQUEST: &'static str = "$SYS.REQ.USER.AUTH";

    /// Full wildcard matching every subject.
    pub const ALL: &'static str = ">";

    // ------------------------------------------------------------------
    // JetStream control plane
    // ------------------------------------------------------------------

    /// Stream creation requests.
    pub fn stream_create() -> String {
        format!("{JS_STREAM_API}.CREATE.>")
    }

    /// Stream deletion requests.
    pub fn stream_delete() -> String {
        format!("{JS_STREAM_API}.DELETE.>")
    }

    /// Stream purge requests.
    pub fn stream_purge() -> String {
        format!("{JS_STREAM_API}.PURGE.>")
    }

    /// Removal of a peer from a clustered stream.
    pub fn stream_peer_remove() -> String {
        format!("{JS_STREAM_API}.PEER.REMOVE.>")
    }

    /// Forced leader stepdown of a clustered stream.
    pub fn stream_leader_stepdown() -> String {
        format!("{JS_STREAM_API}.LEADER.STEPDOWN.>")
    }

    /// Every stream-management subject that alters topology, in a stable
    /// order.
    pub fn stream_control_plane() -> [String; 5] {
        [
            Self::stream_create(),
            Self::stream_delete(),
            Self::stream_purge(),
            Self::stream_peer_remove(),
            Self::stream_leader_stepdown(),
        ]
    }

    // ------------------------------------------------------------------
    // Validation & matching
    // ------------------------------------------------------------------

    /// Check that `subject` is a well-formed subject or subject pattern.
    ///
    /// Tokens are separated by `.`, may not be empty or contain
    /// whitespace, and `>` may only appear as the last token.
    pub fn validate(subject: &str) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidSubject {
            value: subject.to_string(),
            reason: reason.to_string(),
        };

        if subject.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if subject.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }

        let tokens: Vec<&str> = subject.split('.').collect();
        let last = tokens.len() - 1;
        for (i, token) in tokens.iter().enumerate() {
            if token.is_empty() {
                return Err(invalid("empty token"));
            }
            if token.len() > 1 && (token.contains('*') || token.contains('>')) {
                return Err(invalid("wildcards must be a whole token"));
            }
            if *token == ">" && i != last {
                return Err(invalid("'>' must be the last token"));
            }
        }
        Ok(())
    }

    /// `true` if the literal `subject` is matched by `pattern`.
    ///
    /// `*` matches exactly one token, `>` matches one or more trailing
    /// tokens.
    pub fn matches(pattern: &str, subject: &str) -> bool {
        let mut pattern_tokens = pattern.split('.');
        let mut subject_tokens = subject.split('.');

        loop {
            match (pattern_tokens.next(), subject_tokens.next()) {
                (Some(">"), Some(_)) => return true,
                (Some("*"), Some(_)) => continue,
                (Some(p), Some(s)) if p == s => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_plane_has_five_distinct_subjects() {
        let subjects = CalloutSubjects::stream_control_plane();
        let unique: std::collections::HashSet<_> = subjects.iter().collect();
        assert_eq!(unique.len(), 5);
        assert!(subjects.iter().all(|s| s.starts_with("$JS.API.STREAM.")));
    }

    #[test]
    fn control_plane_subjects_are_valid() {
        for subject in CalloutSubjects::stream_control_plane() {
            CalloutSubjects::validate(&subject).unwrap();
        }
        CalloutSubjects::validate(CalloutSubjects::ALL).unwrap();
        CalloutSubjects::validate(CalloutSubjects::AUTH_REQUEST).unwrap();
    }

    #[test]
    fn validate_rejects_malformed() {
        assert!(CalloutSubjects::validate("").is_err());
        assert!(CalloutSubjects::validate("a..b").is_err());
        assert!(CalloutSubjects::validate("a. b").is_err());
        assert!(CalloutSubjects::validate("a.>.b").is_err());
        assert!(CalloutSubjects::validate("a.b*").is_err());
        assert!(CalloutSubjects::validate("a.").is_err());
    }

    #[test]
    fn full_wildcard_matches_everything() {
        assert!(CalloutSubjects::matches(">", "orders"));
        assert!(CalloutSubjects::matches(">", "$JS.API.STREAM.CREATE.orders"));
    }

    #[test]
    fn tail_wildcard_needs_at_least_one_token() {
        assert!(CalloutSubjects::matches("a.>", "a.b"));
        assert!(CalloutSubjects::matches("a.>", "a.b.c"));
        assert!(!CalloutSubjects::matches("a.>", "a"));
    }

    #[test]
    fn single_token_wildcard() {
        assert!(CalloutSubjects::matches("chat.*.42", "chat.room.42"));
        assert!(!CalloutSubjects::matches("chat.*.42", "chat.room.43"));
        assert!(!CalloutSubjects::matches("chat.*", "chat.room.42"));
    }

    #[test]
    fn literal_match() {
        assert!(CalloutSubjects::matches("$JS.API.INFO", "$JS.API.INFO"));
        assert!(!CalloutSubjects::matches("$JS.API.INFO", "$JS.API.INFO.x"));
        assert!(!CalloutSubjects::matches(
            "$JS.API.STREAM.PEER.REMOVE.>",
            "$JS.API.STREAM.PEER"
        ));
    }
}
