//! Resource authorization: identity-provider token sources and the
//! resource-keyed token cache in front of them.

pub mod app_registration;
pub mod authorization;
pub mod context;
pub mod managed_identity;
pub mod source;
pub mod token;
pub mod token_cache;

pub use app_registration::AppRegistrationSource;
pub use authorization::ResourceAuthorization;
pub use context::ResourceAuthorizationContext;
pub use managed_identity::ManagedIdentitySource;
pub use source::TokenSource;
pub use token::Token;
