//! # Identity Sources
//!
//! Supplies the identity dimensions the scope resolver hashes into a store
//! root. A source reports what it knows; it never fails for a missing
//! dimension. The scope descriptor decides which dimensions are required
//! and reports `StorageUnavailable` when one is absent.

use iso_core::{ApplicationId, AssemblyId, DomainId, IdentityEvidence, IsoError, UserId};

/// Environment variable naming the domain dimension.
pub const DOMAIN_ENV: &str = "ISO_STORAGE_DOMAIN";
/// Environment variable naming the application dimension.
pub const APPLICATION_ENV: &str = "ISO_STORAGE_APPLICATION";

/// Source of the current identity evidence.
pub trait IdentitySource: Send + Sync + std::fmt::Debug {
    /// Resolve the evidence for the calling context.
    ///
    /// # Errors
    ///
    /// Only for a source that cannot be consulted at all. Missing
    /// dimensions are reported as `None` fields instead.
    fn evidence(&self) -> Result<IdentityEvidence, IsoError>;
}

/// Fixed evidence, supplied at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    evidence: IdentityEvidence,
}

impl StaticIdentity {
    pub fn new(evidence: IdentityEvidence) -> Self {
        Self { evidence }
    }

    /// Evidence with every dimension set from plain strings.
    ///
    /// # Errors
    ///
    /// Returns [`IsoError::InvalidArgument`] if any value is not a valid identifier.
    pub fn full(user: &str, domain: &str, assembly: &str, application: &str) -> Result<Self, IsoError> {
        Ok(Self::new(
            IdentityEvidence::empty()
                .with_user(UserId::new(user)?)
                .with_domain(DomainId::new(domain)?)
                .with_assembly(AssemblyId::new(assembly)?)
                .with_application(ApplicationId::new(application)?),
        ))
    }
}

impl From<IdentityEvidence> for StaticIdentity {
    fn from(evidence: IdentityEvidence) -> Self {
        Self::new(evidence)
    }
}

impl IdentitySource for StaticIdentity {
    fn evidence(&self) -> Result<IdentityEvidence, IsoError> {
        Ok(self.evidence.clone())
    }
}

/// Evidence read from the host process.
///
/// - user: `USER`, then `USERNAME`
/// - assembly: file stem of the running executable
/// - domain: [`DOMAIN_ENV`], defaulting to the assembly name
/// - application: [`APPLICATION_ENV`] only
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIdentity;

impl IdentitySource for ProcessIdentity {
    fn evidence(&self) -> Result<IdentityEvidence, IsoError> {
        let user = env_value("USER")
            .or_else(|| env_value("USERNAME"))
            .and_then(|v| UserId::new(v).ok());

        let assembly = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .and_then(|stem| AssemblyId::new(stem).ok());

        let domain = match env_value(DOMAIN_ENV) {
            Some(v) => DomainId::new(v).ok(),
            None => assembly.as_ref().and_then(|a| DomainId::new(a.as_str()).ok()),
        };

        let application = env_value(APPLICATION_ENV).and_then(|v| ApplicationId::new(v).ok());

        Ok(IdentityEvidence {
            user,
            domain,
            assembly,
            application,
        })
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
