//! Closed table of attribute names the user wrapper recognizes.

pub const AUTHENTICATED_SUBJECT_IDENTIFIER: &str = "authenticatedSubjectIdentifier";
pub const SUBJECT_IDENTIFIER: &str = "subjectIdentifier";
pub const USERNAME: &str = "username";
pub const USER_STORE_DOMAIN: &str = "userStoreDomain";
pub const TENANT_DOMAIN: &str = "tenantDomain";
pub const LOCAL_CLAIMS: &str = "localClaims";
pub const REMOTE_CLAIMS: &str = "remoteClaims";
pub const CLAIMS: &str = "claims";
pub const LOCAL_ROLES: &str = "localRoles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonical {
    SubjectIdentifier,
    Username,
    UserStoreDomain,
    TenantDomain,
    LocalClaims,
    RemoteClaims,
    Claims,
    LocalRoles,
}

/// The only identity fields scripts may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritableField {
    Username,
    UserStoreDomain,
    TenantDomain,
}

impl Canonical {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            AUTHENTICATED_SUBJECT_IDENTIFIER | SUBJECT_IDENTIFIER => Canonical::SubjectIdentifier,
            USERNAME => Canonical::Username,
            USER_STORE_DOMAIN => Canonical::UserStoreDomain,
            TENANT_DOMAIN => Canonical::TenantDomain,
            LOCAL_CLAIMS => Canonical::LocalClaims,
            REMOTE_CLAIMS => Canonical::RemoteClaims,
            CLAIMS => Canonical::Claims,
            LOCAL_ROLES => Canonical::LocalRoles,
            _ => return None,
        })
    }

    pub fn writable(self) -> Option<WritableField> {
        match self {
            Canonical::Username => Some(WritableField::Username),
            Canonical::UserStoreDomain => Some(WritableField::UserStoreDomain),
            Canonical::TenantDomain => Some(WritableField::TenantDomain),
            _ => None,
        }
    }
}
