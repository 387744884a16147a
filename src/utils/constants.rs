//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// Hosting environment bindings
pub const ENV_IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
pub const ENV_IDENTITY_HEADER: &str = "IDENTITY_HEADER";
pub const IDENTITY_HEADER_NAME: &str = "X-IDENTITY-HEADER";
pub const MANAGED_IDENTITY_API_VERSION: &str = "2019-08-01";

// Registered application (client credentials)
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

// Authorization registry ids
pub const MANAGED_IDENTITY_ID: &str = "managed-identity";

// Remote configuration store
pub const APP_CONFIG_DOMAIN: &str = "azconfig.io";
pub const APP_CONFIG_API_VERSION: &str = "1.0";
pub const CONTENT_TYPE_FEATURE_FLAG: &str = "application/vnd.microsoft.appconfig.ff+json";
pub const CONTENT_TYPE_VAULT_REFERENCE: &str = "application/vnd.microsoft.appconfig.keyvaultref+json";

// Vault
pub const VAULT_RESOURCE: &str = "https://vault.azure.net";
pub const VAULT_API_VERSION: &str = "7.1";
pub const VAULT_SETTING_PREFIX: &str = "@Microsoft.KeyVault(";

// Supported handler types
pub const HANDLER_ENV: &str = "env";
pub const HANDLER_ENV_VAULT: &str = "env_vault";
pub const HANDLER_APP_CONFIG: &str = "app_config";
