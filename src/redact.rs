use std::fmt;

/// Placeholder written wherever a secret would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// Wraps a value so that `Display` and `Debug` never print it.
///
/// ```
/// use hunyuan_video::Redacted;
///
/// let key = Redacted::new("Gu5t9xGARNpq86cd98joQYCN3");
/// assert_eq!(format!("{key:?}"), "[REDACTED]");
/// assert_eq!(key.expose(), &"Gu5t9xGARNpq86cd98joQYCN3");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted<T>(T);

impl<T> Redacted<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the wrapped value. Call sites should be easy to audit.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Mask a secret id down to a fixed-length suffix: `****` plus the last four
/// characters. Ids of eight characters or fewer are masked entirely.
pub fn mask_secret_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// True for parameter names that carry credentials.
pub fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    lower.contains("secret")
        || lower.contains("token")
        || lower.contains("key")
        || lower.contains("password")
        || lower.contains("authorization")
}

/// Render a parameter value for user-facing text. Secret ids keep a masked
/// suffix, every other sensitive field is replaced outright.
pub fn sanitize_param(field_name: &str, value: &str) -> String {
    let lower = field_name.to_lowercase();
    if lower.contains("secret_id") || lower.contains("secretid") {
        mask_secret_id(value)
    } else if is_sensitive_field(&lower) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}
