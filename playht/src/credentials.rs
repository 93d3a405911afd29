//! PlayHT account credentials.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Default prefix for credential environment variables.
pub const DEFAULT_ENV_PREFIX: &str = "PLAY_HT_";

/// PlayHT account credentials (user ID + API key).
///
/// Both fields are guaranteed non-empty after construction. The API key is
/// stored without any `Bearer` marker; `Session` adds the scheme when it
/// builds the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    user_id: String,
    api_key: String,
    env_prefix: String,
}

impl Credentials {
    /// Creates credentials from explicit values.
    ///
    /// A leading `Bearer` marker on the key (case and surrounding whitespace
    /// tolerant) is stripped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use playht::Credentials;
    ///
    /// let creds = Credentials::new("my-user", "Bearer my-key")?;
    /// assert_eq!(creds.api_key(), "my-key");
    /// # Ok::<(), playht::Error>(())
    /// ```
    pub fn new(user_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::build(user_id.into(), api_key.into(), DEFAULT_ENV_PREFIX.to_string())
    }

    /// Loads credentials from the process environment with the default
    /// `PLAY_HT_` prefix.
    ///
    /// Expects `PLAY_HT_USER_ID` and `PLAY_HT_API_KEY`. An adjacent `.env`
    /// file is loaded first, if present.
    pub fn from_env() -> Result<Self> {
        Self::load(None, None, DEFAULT_ENV_PREFIX)
    }

    /// Loads credentials, resolving explicit values first and the
    /// environment second.
    ///
    /// Every environment variable starting with `env_prefix` contributes:
    /// the prefix is stripped and the remainder lower-cased, so
    /// `{prefix}USER_ID` and `{prefix}API_KEY` resolve `user_id` and
    /// `api_key`.
    pub fn load(
        user_id: Option<&str>,
        api_key: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self> {
        // Merge an adjacent .env file into the process environment first.
        let _ = dotenvy::dotenv();

        let env_values: HashMap<String, String> = std::env::vars()
            .filter_map(|(name, value)| {
                name.strip_prefix(env_prefix)
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect();

        let user_id = user_id
            .map(str::to_string)
            .or_else(|| env_values.get("user_id").cloned())
            .unwrap_or_default();
        let api_key = api_key
            .map(str::to_string)
            .or_else(|| env_values.get("api_key").cloned())
            .unwrap_or_default();

        Self::build(user_id, api_key, env_prefix.to_string())
    }

    fn build(user_id: String, api_key: String, env_prefix: String) -> Result<Self> {
        let api_key = strip_bearer(&api_key).to_string();
        if user_id.is_empty() || api_key.is_empty() {
            return Err(Error::Config(format!(
                "unable to locate `{env_prefix}USER_ID` or `{env_prefix}API_KEY` in the environment"
            )));
        }
        Ok(Self {
            user_id,
            api_key,
            env_prefix,
        })
    }

    /// Returns the user ID.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the API key (without any `Bearer` marker).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the environment variable prefix these credentials were
    /// resolved with.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}

/// Strips a leading `Bearer` scheme marker, tolerating case and whitespace.
fn strip_bearer(api_key: &str) -> &str {
    let trimmed = api_key.trim();
    match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer") => trimmed[6..].trim_start(),
        _ => trimmed,
    }
}
