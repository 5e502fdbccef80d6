//! # Identity Newtypes
//!
//! The identity dimensions a scope can be isolated by: the user running the
//! process, the application domain, the assembly (the executing code unit),
//! and the application. Each dimension is a distinct type, so a `DomainId`
//! cannot be passed where an `AssemblyId` is expected.
//!
//! ## Validation
//!
//! Every dimension value must be non-empty after trimming and must not
//! contain NUL. Values are otherwise opaque: they are hashed into a
//! [`ScopeId`](crate::ScopeId) and never used as path components.

use serde::{Deserialize, Serialize};

use crate::error::IsoError;

/// Defines a validated string newtype for one identity dimension.
///
/// Deserialization routes through `new()` so that invalid values are
/// rejected at deserialization time rather than silently accepted.
macro_rules! identity_newtype {
    ($(#[$meta:meta])* $ty:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $ty(String);

        impl $ty {
            /// Create the identifier, validating that it is non-empty and NUL-free.
            ///
            /// # Errors
            ///
            /// Returns [`IsoError::InvalidArgument`] for an empty, whitespace-only,
            /// or NUL-containing value.
            pub fn new(value: impl Into<String>) -> Result<Self, IsoError> {
                let s = value.into();
                validate_dimension($label, &s)?;
                Ok(Self(s))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn validate_dimension(label: &str, value: &str) -> Result<(), IsoError> {
    if value.trim().is_empty() {
        return Err(IsoError::InvalidArgument(format!("{label} identity is empty")));
    }
    if value.contains('\0') {
        return Err(IsoError::InvalidArgument(format!(
            "{label} identity contains NUL"
        )));
    }
    Ok(())
}

identity_newtype!(
    /// The user a store is isolated to.
    UserId,
    "user"
);

identity_newtype!(
    /// The application domain a store is isolated to.
    DomainId,
    "domain"
);

identity_newtype!(
    /// The assembly (executing code unit) a store is isolated to.
    AssemblyId,
    "assembly"
);

identity_newtype!(
    /// The application a store is isolated to.
    ApplicationId,
    "application"
);

/// The identity dimensions an identity source could determine.
///
/// A missing dimension is `None`; whether that makes a scope unavailable
/// depends on which dimensions the requested scope needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEvidence {
    pub user: Option<UserId>,
    pub domain: Option<DomainId>,
    pub assembly: Option<AssemblyId>,
    pub application: Option<ApplicationId>,
}

impl IdentityEvidence {
    /// Evidence with no dimensions resolved.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_domain(mut self, domain: DomainId) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_assembly(mut self, assembly: AssemblyId) -> Self {
        self.assembly = Some(assembly);
        self
    }

    pub fn with_application(mut self, application: ApplicationId) -> Self {
        self.application = Some(application);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_ordinary_values() {
        assert_eq!(UserId::new("alice").unwrap().as_str(), "alice");
        assert_eq!(AssemblyId::new("MyApp, Version=1.0").unwrap().to_string(), "MyApp, Version=1.0");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(UserId::new("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(DomainId::new("   ").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejects_nul() {
        let err = ApplicationId::new("app\0x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("application"));
    }

    #[test]
    fn deserialize_validates() {
        let ok: UserId = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(ok.as_str(), "bob");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn evidence_builder_sets_dimensions() {
        let ev = IdentityEvidence::empty()
            .with_user(UserId::new("u").unwrap())
            .with_assembly(AssemblyId::new("a").unwrap());
        assert!(ev.user.is_some());
        assert!(ev.assembly.is_some());
        assert!(ev.domain.is_none());
        assert!(ev.application.is_none());
    }
}
