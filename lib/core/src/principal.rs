//! The authenticated principal and its claims.

use serde::{Deserialize, Serialize};

use crate::id::Uid;

/// An authenticated identity as asserted by the identity provider.
///
/// On the client this is whatever the provider SDK reports as the signed-in
/// user. On the server it is only ever produced by verifying a session
/// artifact, and the `admin` flag reflects the claim embedded at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    uid: Uid,
    #[serde(default)]
    admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl Principal {
    /// Creates a principal without the elevated-role claim.
    #[must_use]
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            admin: false,
            email: None,
        }
    }

    /// Sets the administrator claim.
    #[must_use]
    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Sets the email claim.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Returns the principal's identifier.
    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Returns true if the principal carries the administrator claim.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Returns the email claim, if present.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> Uid {
        Uid::new(s).expect("valid uid")
    }

    #[test]
    fn principal_defaults_to_non_admin() {
        let principal = Principal::new(uid("u1"));
        assert_eq!(principal.uid().as_str(), "u1");
        assert!(!principal.is_admin());
        assert!(principal.email().is_none());
    }

    #[test]
    fn principal_builder() {
        let principal = Principal::new(uid("u2"))
            .with_admin(true)
            .with_email(Some("steward@example.org".to_string()));
        assert!(principal.is_admin());
        assert_eq!(principal.email(), Some("steward@example.org"));
    }

    #[test]
    fn missing_admin_claim_deserializes_as_false() {
        let principal: Principal = serde_json::from_str(r#"{"uid":"u3"}"#).expect("deserialize");
        assert!(!principal.is_admin());
    }
}
