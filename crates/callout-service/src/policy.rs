//! Permission policy: privilege level → permission rule set.
//!
//! Both levels may publish and subscribe anywhere. Standard users are
//! additionally denied the JetStream stream-management subjects that alter
//! topology, in both directions, so they can use streams but not create,
//! delete, purge, or re-shape them.

use callout_models::{
    CalloutSubjects, PermissionRuleSet, PrivilegeLevel, ResponseLimits, SubjectRules,
};

/// Rule set granted to a user of the given privilege level.
///
/// Total and deterministic: the same level always yields an identical
/// rule set.
pub fn derive(privilege: PrivilegeLevel) -> PermissionRuleSet {
    let rules = match privilege {
        PrivilegeLevel::Privileged => SubjectRules::allow_all(),
        PrivilegeLevel::Standard => CalloutSubjects::stream_control_plane()
            .into_iter()
            .fold(SubjectRules::allow_all(), SubjectRules::deny),
    };

    PermissionRuleSet {
        publish: rules.clone(),
        subscribe: rules,
        response_limits: ResponseLimits::default(),
    }
}
