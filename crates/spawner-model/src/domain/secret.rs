use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// String holding secret material.
///
/// `Debug` never prints the value and the buffer is wiped on drop.
/// Use [`Secret::expose`] at the few places that hand the value to a provider or to the caller.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plaintext value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let s = Secret::new("hunter2");
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(s.expose(), "hunter2");
    }

    #[test]
    fn serde_is_transparent() {
        let s = Secret::new("token");
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""token""#);
        let back: Secret = serde_json::from_str(r#""token""#).unwrap();
        assert_eq!(back, s);
    }
}
