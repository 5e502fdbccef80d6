//! # Scopes — Which Identity Dimensions Isolate a Store
//!
//! A [`ScopeDescriptor`] says which identity dimensions apply to a store
//! (user or machine ownership, plus any of domain, assembly, application).
//! Combined with resolved [`IdentityEvidence`] it yields a [`ScopeId`], the
//! stable key for the store's root directory and quota entry.
//!
//! ## Legal Shapes
//!
//! ```text
//! owner ∈ {User, Machine}
//!   × { none, assembly, domain, domain+assembly, application }
//! ```
//!
//! Application isolation is exclusive: it cannot be combined with domain or
//! assembly isolation.
//!
//! ## Scope Identifier Derivation
//!
//! The identifier is `sha256(canonical_key)` in lowercase hex, truncated to
//! 32 characters. The canonical key lists the owner, the shape tag, and each
//! applicable dimension as `name=len:value` in fixed order, so two distinct
//! evidence sets cannot produce the same key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::IsoError;
use crate::identity::IdentityEvidence;

/// Length of the hex scope identifier used as a directory name.
pub const SCOPE_ID_HEX_LEN: usize = 32;

// ─── Owner ───────────────────────────────────────────────────────────

/// Who owns a store: the current user, or the machine as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeOwner {
    User,
    Machine,
}

impl ScopeOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Machine => "machine",
        }
    }
}

impl std::fmt::Display for ScopeOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Descriptor ──────────────────────────────────────────────────────

/// The isolation dimensions that apply to a store.
///
/// Immutable once a store is opened. Construct through
/// [`ScopeDescriptor::new()`] or [`PresetScope::descriptor()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeDescriptor {
    owner: ScopeOwner,
    domain: bool,
    assembly: bool,
    application: bool,
}

impl ScopeDescriptor {
    /// Create a descriptor, rejecting illegal dimension combinations.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::InvalidArgument`] if `application` is combined
    /// with `domain` or `assembly`.
    pub fn new(
        owner: ScopeOwner,
        domain: bool,
        assembly: bool,
        application: bool,
    ) -> Result<Self, IsoError> {
        if application && (domain || assembly) {
            return Err(IsoError::InvalidArgument(
                "application isolation cannot be combined with domain or assembly isolation"
                    .into(),
            ));
        }
        Ok(Self {
            owner,
            domain,
            assembly,
            application,
        })
    }

    /// Owner-only scope, with no further dimensions.
    pub fn owner_only(owner: ScopeOwner) -> Self {
        Self {
            owner,
            domain: false,
            assembly: false,
            application: false,
        }
    }

    pub fn owner(&self) -> ScopeOwner {
        self.owner
    }

    pub fn is_domain(&self) -> bool {
        self.domain
    }

    pub fn is_assembly(&self) -> bool {
        self.assembly
    }

    pub fn is_application(&self) -> bool {
        self.application
    }

    /// Directory tag naming the shape of this descriptor, e.g. `domain-assembly`.
    pub fn shape_tag(&self) -> &'static str {
        match (self.domain, self.assembly, self.application) {
            (false, false, false) => "none",
            (false, true, false) => "assembly",
            (true, false, false) => "domain",
            (true, true, false) => "domain-assembly",
            (false, false, true) => "application",
            // Unreachable through the validated constructor.
            _ => "invalid",
        }
    }

    /// Derive the stable scope identifier from resolved identity evidence.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::StorageUnavailable`] if a dimension this
    /// descriptor requires is missing from `evidence`.
    pub fn scope_id(&self, evidence: &IdentityEvidence) -> Result<ScopeId, IsoError> {
        let mut key = format!("v1|owner={}|shape={}", self.owner, self.shape_tag());

        if self.owner == ScopeOwner::User {
            let user = evidence
                .user
                .as_ref()
                .ok_or_else(|| unavailable("user"))?;
            push_dimension(&mut key, "user", user.as_str());
        }
        if self.domain {
            let domain = evidence
                .domain
                .as_ref()
                .ok_or_else(|| unavailable("domain"))?;
            push_dimension(&mut key, "domain", domain.as_str());
        }
        if self.assembly {
            let assembly = evidence
                .assembly
                .as_ref()
                .ok_or_else(|| unavailable("assembly"))?;
            push_dimension(&mut key, "assembly", assembly.as_str());
        }
        if self.application {
            let application = evidence
                .application
                .as_ref()
                .ok_or_else(|| unavailable("application"))?;
            push_dimension(&mut key, "application", application.as_str());
        }

        Ok(ScopeId::from_canonical_key(&key))
    }
}

impl<'de> Deserialize<'de> for ScopeDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            owner: ScopeOwner,
            #[serde(default)]
            domain: bool,
            #[serde(default)]
            assembly: bool,
            #[serde(default)]
            application: bool,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.owner, raw.domain, raw.assembly, raw.application)
            .map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for ScopeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.shape_tag())
    }
}

fn push_dimension(key: &mut String, name: &str, value: &str) {
    key.push_str(&format!("|{name}={}:{value}", value.len()));
}

fn unavailable(dimension: &str) -> IsoError {
    IsoError::StorageUnavailable(format!(
        "unable to determine the {dimension} identity required by this scope"
    ))
}

// ─── Presets ─────────────────────────────────────────────────────────

/// The scope-acquisition presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetScope {
    /// User + assembly.
    UserStoreForAssembly,
    /// User + domain + assembly.
    UserStoreForDomain,
    /// User + application.
    UserStoreForApplication,
    /// Machine + assembly.
    MachineStoreForAssembly,
    /// Machine + domain + assembly.
    MachineStoreForDomain,
    /// Machine + application.
    MachineStoreForApplication,
}

impl PresetScope {
    /// Every preset, in declaration order.
    pub const ALL: [PresetScope; 6] = [
        Self::UserStoreForAssembly,
        Self::UserStoreForDomain,
        Self::UserStoreForApplication,
        Self::MachineStoreForAssembly,
        Self::MachineStoreForDomain,
        Self::MachineStoreForApplication,
    ];

    /// The descriptor this preset requests.
    pub fn descriptor(&self) -> ScopeDescriptor {
        let (owner, domain, assembly, application) = match self {
            Self::UserStoreForAssembly => (ScopeOwner::User, false, true, false),
            Self::UserStoreForDomain => (ScopeOwner::User, true, true, false),
            Self::UserStoreForApplication => (ScopeOwner::User, false, false, true),
            Self::MachineStoreForAssembly => (ScopeOwner::Machine, false, true, false),
            Self::MachineStoreForDomain => (ScopeOwner::Machine, true, true, false),
            Self::MachineStoreForApplication => (ScopeOwner::Machine, false, false, true),
        };
        ScopeDescriptor {
            owner,
            domain,
            assembly,
            application,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserStoreForAssembly => "user-store-for-assembly",
            Self::UserStoreForDomain => "user-store-for-domain",
            Self::UserStoreForApplication => "user-store-for-application",
            Self::MachineStoreForAssembly => "machine-store-for-assembly",
            Self::MachineStoreForDomain => "machine-store-for-domain",
            Self::MachineStoreForApplication => "machine-store-for-application",
        }
    }
}

impl std::fmt::Display for PresetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Scope identifier and root ───────────────────────────────────────

/// Stable identifier of a resolved scope.
///
/// Lowercase hex, [`SCOPE_ID_HEX_LEN`] characters. Safe to use as a
/// single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(String);

impl ScopeId {
    fn from_canonical_key(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex[..SCOPE_ID_HEX_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope:{}", self.0)
    }
}

/// The resolved on-disk root of a store.
///
/// Handles that resolve to equal roots refer to the same logical store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreRoot {
    scope: ScopeId,
    descriptor: ScopeDescriptor,
    path: PathBuf,
}

impl StoreRoot {
    /// Place the root for `scope` under `owner_root`.
    ///
    /// The layout is `<owner_root>/<shape-tag>/<scope-id>`.
    pub fn under(owner_root: &Path, descriptor: ScopeDescriptor, scope: ScopeId) -> Self {
        let path = owner_root
            .join(descriptor.shape_tag())
            .join(scope.as_str());
        Self {
            scope,
            descriptor,
            path,
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn descriptor(&self) -> ScopeDescriptor {
        self.descriptor
    }

    /// Absolute directory backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::identity::{ApplicationId, AssemblyId, DomainId, UserId};

    fn full_evidence() -> IdentityEvidence {
        IdentityEvidence::empty()
            .with_user(UserId::new("alice").unwrap())
            .with_domain(DomainId::new("domain-1").unwrap())
            .with_assembly(AssemblyId::new("app.exe").unwrap())
            .with_application(ApplicationId::new("com.example.app").unwrap())
    }

    #[test]
    fn application_excludes_domain_and_assembly() {
        assert!(ScopeDescriptor::new(ScopeOwner::User, true, false, true).is_err());
        assert!(ScopeDescriptor::new(ScopeOwner::User, false, true, true).is_err());
        assert!(ScopeDescriptor::new(ScopeOwner::Machine, false, false, true).is_ok());
    }

    #[test]
    fn all_documented_shapes_are_legal() {
        for owner in [ScopeOwner::User, ScopeOwner::Machine] {
            for (d, a) in [(false, false), (false, true), (true, false), (true, true)] {
                let desc = ScopeDescriptor::new(owner, d, a, false).unwrap();
                assert_ne!(desc.shape_tag(), "invalid");
            }
        }
    }

    #[test]
    fn presets_map_to_expected_shapes() {
        assert_eq!(PresetScope::UserStoreForAssembly.descriptor().shape_tag(), "assembly");
        assert_eq!(
            PresetScope::UserStoreForDomain.descriptor().shape_tag(),
            "domain-assembly"
        );
        assert_eq!(
            PresetScope::MachineStoreForApplication.descriptor().owner(),
            ScopeOwner::Machine
        );
    }

    #[test]
    fn scope_id_is_deterministic() {
        let desc = PresetScope::UserStoreForAssembly.descriptor();
        let a = desc.scope_id(&full_evidence()).unwrap();
        let b = desc.scope_id(&full_evidence()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), SCOPE_ID_HEX_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn scope_id_ignores_inapplicable_dimensions() {
        let desc = PresetScope::UserStoreForAssembly.descriptor();
        let mut other = full_evidence();
        other.domain = Some(DomainId::new("another-domain").unwrap());
        assert_eq!(
            desc.scope_id(&full_evidence()).unwrap(),
            desc.scope_id(&other).unwrap()
        );
    }

    #[test]
    fn scope_id_differs_across_shapes_and_users() {
        let ev = full_evidence();
        let assembly = PresetScope::UserStoreForAssembly.descriptor().scope_id(&ev).unwrap();
        let domain = PresetScope::UserStoreForDomain.descriptor().scope_id(&ev).unwrap();
        assert_ne!(assembly, domain);

        let mut bob = full_evidence();
        bob.user = Some(UserId::new("bob").unwrap());
        let bob_assembly = PresetScope::UserStoreForAssembly.descriptor().scope_id(&bob).unwrap();
        assert_ne!(assembly, bob_assembly);
    }

    #[test]
    fn machine_scope_does_not_need_user() {
        let mut ev = full_evidence();
        ev.user = None;
        assert!(PresetScope::MachineStoreForAssembly
            .descriptor()
            .scope_id(&ev)
            .is_ok());
        let err = PresetScope::UserStoreForAssembly
            .descriptor()
            .scope_id(&ev)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[test]
    fn missing_assembly_is_unavailable() {
        let mut ev = full_evidence();
        ev.assembly = None;
        let err = PresetScope::UserStoreForDomain
            .descriptor()
            .scope_id(&ev)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(err.to_string().contains("assembly"));
    }

    #[test]
    fn length_prefix_prevents_key_collisions() {
        let desc = ScopeDescriptor::new(ScopeOwner::User, true, true, false).unwrap();
        let a = IdentityEvidence::empty()
            .with_user(UserId::new("u").unwrap())
            .with_domain(DomainId::new("x|assembly=1:y").unwrap())
            .with_assembly(AssemblyId::new("z").unwrap());
        let b = IdentityEvidence::empty()
            .with_user(UserId::new("u").unwrap())
            .with_domain(DomainId::new("x").unwrap())
            .with_assembly(AssemblyId::new("y|assembly=1:z").unwrap());
        assert_ne!(desc.scope_id(&a).unwrap(), desc.scope_id(&b).unwrap());
    }

    #[test]
    fn store_root_layout() {
        let desc = PresetScope::UserStoreForDomain.descriptor();
        let id = desc.scope_id(&full_evidence()).unwrap();
        let root = StoreRoot::under(Path::new("/data/user"), desc, id.clone());
        assert_eq!(
            root.path(),
            Path::new("/data/user").join("domain-assembly").join(id.as_str())
        );
        assert_eq!(root.scope(), &id);
    }

    #[test]
    fn descriptor_deserialize_validates() {
        let ok: ScopeDescriptor =
            serde_json::from_str(r#"{"owner":"User","assembly":true}"#).unwrap();
        assert!(ok.is_assembly());
        assert!(serde_json::from_str::<ScopeDescriptor>(
            r#"{"owner":"User","assembly":true,"application":true}"#
        )
        .is_err());
    }

    #[test]
    fn preset_serializes_kebab_case() {
        let s = serde_json::to_string(&PresetScope::MachineStoreForDomain).unwrap();
        assert_eq!(s, "\"machine-store-for-domain\"");
        for preset in PresetScope::ALL {
            assert_eq!(
                serde_json::to_string(&preset).unwrap(),
                format!("\"{}\"", preset.as_str())
            );
        }
    }
}
