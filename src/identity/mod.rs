//! Authentication domain model and the collaborators the script bridge consumes.
//! Keep the public surface thin and split implementation across sub-modules.

mod user;
mod context;
mod store;
mod claims;

pub use user::{AuthenticatedUser, SharedUser, IdpRef, UserScope, LOCAL_IDP, PRIMARY_DOMAIN};
pub use context::AuthenticationContext;
pub use store::{
    add_domain_to_name, InMemoryRealm, InMemoryUserStore, StoreError, UserRealm, UserStoreGateway,
    SUPER_TENANT_DOMAIN, SUPER_TENANT_ID,
};
pub use claims::{ClaimError, ClaimResolver, ClaimScope, ClaimTarget, Claims, InMemoryClaimResolver};
