use std::collections::BTreeSet;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Identity provider subject (`sub` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Signed-in user as decoded from the id token.
///
/// Never stored on its own: it is recomputed from the live token set and
/// disappears with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub subject_id: SubjectId,
    pub email: String,
    pub display_name: String,
    pub roles: BTreeSet<String>,
}

impl AuthUser {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_display() {
        let id = SubjectId::from("f3a1c2d4");
        assert_eq!(id.to_string(), "f3a1c2d4");
        assert_eq!(id.as_str(), "f3a1c2d4");
    }

    #[test]
    fn subject_id_serializes_transparently() {
        let id = SubjectId::from("abc".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn has_role() {
        let user = AuthUser {
            subject_id: "u1".into(),
            email: "a@b.c".into(),
            display_name: "A".into(),
            roles: ["admin".to_string()].into_iter().collect(),
        };
        assert!(user.has_role("admin"));
        assert!(!user.has_role("worker"));
    }
}
