//! Client configuration, populated from environment variables.

use crate::credentials::Credentials;

/// Root URL of the production FluidDB instance.
pub const MAIN: &str = "https://fluiddb.fluidinfo.com";

/// Root URL of the sandbox instance, for experiments and tests.
pub const SANDBOX: &str = "https://sandbox.fluidinfo.com";

/// Which instance to talk to and, optionally, who to log in as.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `FLUIDDB_INSTANCE` | `main` | `main`, `sandbox`, or an absolute URL |
/// | `FLUIDDB_USERNAME` | (absent) | User to log in as |
/// | `FLUIDDB_PASSWORD` | (absent) | Password; ignored without a username |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub instance: String,
    pub credentials: Option<Credentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            instance: MAIN.to_string(),
            credentials: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let instance = lookup("FLUIDDB_INSTANCE")
            .map(|value| resolve_instance(&value))
            .unwrap_or_else(|| MAIN.to_string());

        let credentials = match (lookup("FLUIDDB_USERNAME"), lookup("FLUIDDB_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Some(Credentials::new(username, password))
            }
            _ => None,
        };

        Self {
            instance,
            credentials,
        }
    }
}

/// Map the `main`/`sandbox` aliases to their URLs; anything else is a URL.
pub fn resolve_instance(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "main" => MAIN.to_string(),
        "sandbox" => SANDBOX.to_string(),
        _ => value.trim().trim_end_matches('/').to_string(),
    }
}
