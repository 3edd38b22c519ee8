use std::fmt;

use crate::errors::{HunyuanError, Result};
use crate::redact::{mask_secret_id, Redacted, REDACTED};

pub const DEFAULT_ENDPOINT: &str = "https://hunyuan.tencentcloudapi.com";
pub const DEFAULT_REGION: &str = "ap-guangzhou";

pub const ENV_SECRET_ID: &str = "TENCENTCLOUD_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "TENCENTCLOUD_SECRET_KEY";
pub const ENV_REGION: &str = "TENCENTCLOUD_REGION";

/// A Tencent Cloud API key pair plus where to send requests.
///
/// `Debug` prints the secret id masked and never prints the secret key.
#[derive(Clone)]
pub struct Credentials {
    secret_id: String,
    secret_key: Redacted<String>,
    region: String,
    endpoint: String,
}

impl Credentials {
    /// Credentials for the default region and endpoint.
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: Redacted::new(secret_key.into()),
            region: DEFAULT_REGION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Override the endpoint (scheme and host, e.g. `https://hunyuan.tencentcloudapi.com`).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub(crate) fn secret_key(&self) -> &str {
        self.secret_key.expose()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The secret id as it may appear in logs and error text.
    pub fn masked_id(&self) -> String {
        mask_secret_id(&self.secret_id)
    }

    /// Read credentials from `TENCENTCLOUD_SECRET_ID` / `TENCENTCLOUD_SECRET_KEY`
    /// (and optionally `TENCENTCLOUD_REGION`). Both keys must be set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let id = lookup(ENV_SECRET_ID).filter(|v| !v.trim().is_empty())?;
        let key = lookup(ENV_SECRET_KEY).filter(|v| !v.trim().is_empty())?;
        let mut creds = Self::new(id.trim(), key.trim());
        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.trim().is_empty()) {
            creds.region = region.trim().to_string();
        }
        Some(creds)
    }

    /// Pick credentials by precedence: environment, then call-time, then the
    /// startup default.
    pub fn resolve(call: Option<Credentials>, startup: Option<Credentials>) -> Result<Self> {
        Self::resolve_with(|name| std::env::var(name).ok(), call, startup)
    }

    pub(crate) fn resolve_with(
        lookup: impl Fn(&str) -> Option<String>,
        call: Option<Credentials>,
        startup: Option<Credentials>,
    ) -> Result<Self> {
        let supplied = call.is_some() || startup.is_some();
        let mut resolved = Self::from_lookup(lookup)
            .or_else(|| call.filter(Self::is_complete))
            .or_else(|| startup.filter(Self::is_complete))
            .ok_or_else(|| {
                if supplied {
                    HunyuanError::InvalidInput(
                        "secret id and secret key must both be non-empty".into(),
                    )
                } else {
                    HunyuanError::InvalidInput(format!(
                        "Tencent Cloud credentials are required. Set {ENV_SECRET_ID} and \
                         {ENV_SECRET_KEY}, or pass credentials explicitly."
                    ))
                }
            })?;

        resolved.validate()?;
        resolved.endpoint = resolved.endpoint.trim_end_matches('/').to_string();
        Ok(resolved)
    }

    /// Check that both the secret id and the secret key are set.
    ///
    /// # Errors
    ///
    /// Returns [`HunyuanError::InvalidInput`] if either one is empty.
    pub fn validate(&self) -> Result<()> {
        if !self.is_complete() {
            return Err(HunyuanError::InvalidInput(
                "secret id and secret key must both be non-empty".into(),
            ));
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        !self.secret_id.trim().is_empty() && !self.secret_key().trim().is_empty()
    }

    /// Strip the raw secret key and secret id out of text that came back from
    /// the server before it is surfaced to callers.
    pub(crate) fn scrub(&self, text: &str) -> String {
        let mut out = text.to_string();
        if !self.secret_key().is_empty() {
            out = out.replace(self.secret_key(), REDACTED);
        }
        if !self.secret_id.is_empty() {
            out = out.replace(&self.secret_id, &self.masked_id());
        }
        out
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.masked_id())
            .field("secret_key", &self.secret_key)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_environment_wins_over_call_and_startup() {
        let lookup = env(&[
            (ENV_SECRET_ID, "AKIDfromenvironment"),
            (ENV_SECRET_KEY, "envkey"),
            (ENV_REGION, "ap-beijing"),
        ]);
        let call = Credentials::new("AKIDfromcall0000", "callkey");
        let startup = Credentials::new("AKIDfromstartup0", "startkey");
        let creds = Credentials::resolve_with(lookup, Some(call), Some(startup)).unwrap();
        assert_eq!(creds.secret_id(), "AKIDfromenvironment");
        assert_eq!(creds.region(), "ap-beijing");
    }

    #[test]
    fn test_call_wins_over_startup() {
        let call = Credentials::new("AKIDfromcall0000", "callkey");
        let startup = Credentials::new("AKIDfromstartup0", "startkey");
        let creds = Credentials::resolve_with(env(&[]), Some(call), Some(startup)).unwrap();
        assert_eq!(creds.secret_id(), "AKIDfromcall0000");
        assert_eq!(creds.region(), DEFAULT_REGION);
    }

    #[test]
    fn test_partial_environment_is_ignored() {
        let lookup = env(&[(ENV_SECRET_ID, "AKIDonlyid")]);
        let startup = Credentials::new("AKIDfromstartup0", "startkey");
        let creds = Credentials::resolve_with(lookup, None, Some(startup)).unwrap();
        assert_eq!(creds.secret_id(), "AKIDfromstartup0");
    }

    #[test]
    fn test_incomplete_call_credentials_fall_through_to_startup() {
        let call = Credentials::new("AKIDfromcall0000", "");
        let startup = Credentials::new("AKIDfromstartup0", "startkey");
        let creds = Credentials::resolve_with(env(&[]), Some(call), Some(startup)).unwrap();
        assert_eq!(creds.secret_id(), "AKIDfromstartup0");
    }

    #[test]
    fn test_only_incomplete_credentials_is_input_error() {
        let call = Credentials::new("", "callkey");
        let err = Credentials::resolve_with(env(&[]), Some(call), None).unwrap_err();
        assert!(matches!(err, HunyuanError::InvalidInput(_)));
        assert!(err.to_string().contains("non-empty"));
        assert!(Credentials::new(" ", "k").validate().is_err());
        assert!(Credentials::new("AKIDfromcall0000", "k").validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_is_input_error() {
        let err = Credentials::resolve_with(env(&[]), None, None).unwrap_err();
        assert!(matches!(err, HunyuanError::InvalidInput(_)));
        assert!(err.to_string().contains(ENV_SECRET_ID));
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds =
            Credentials::new("AKIDz8krbsJ5yKBZQpn74WFkmLPx3abcd", "Gu5t9xGARNpq86cd98joQYCN3");
        let debug = format!("{creds:?}");
        assert!(debug.contains("****abcd"));
        assert!(!debug.contains("Gu5t9xGARNpq86cd98joQYCN3"));
        assert!(!debug.contains("AKIDz8krbs"));
    }

    #[test]
    fn test_scrub_replaces_raw_values() {
        let creds =
            Credentials::new("AKIDz8krbsJ5yKBZQpn74WFkmLPx3abcd", "Gu5t9xGARNpq86cd98joQYCN3");
        let text = creds.scrub(
            "The SecretId AKIDz8krbsJ5yKBZQpn74WFkmLPx3abcd \
             with key Gu5t9xGARNpq86cd98joQYCN3 is invalid",
        );
        assert_eq!(text, "The SecretId ****abcd with key [REDACTED] is invalid");
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let creds =
            Credentials::new("AKIDfromcall0000", "k").with_endpoint("http://127.0.0.1:9000/");
        assert_eq!(creds.endpoint(), "http://127.0.0.1:9000");
    }
}
