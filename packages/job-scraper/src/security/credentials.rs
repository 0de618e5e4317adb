//! Login credentials and API keys.
//!
//! Values live in `secrecy` boxes and format as `[REDACTED]`.

use secrecy::ExposeSecret;
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Secret text that only ever formats as `[REDACTED]`.
pub struct SecretString(secrecy::SecretString);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().into())
    }

    /// Only call this at the point of use (filling an input, sending a header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Login credentials for the catalog site.
///
/// Both halves are treated as secrets: the identity is personal data and is
/// never logged either.
#[derive(Clone)]
pub struct Credentials {
    email: SecretString,
    password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: SecretString::new(email),
            password: SecretString::new(password),
        }
    }

    pub fn email(&self) -> &SecretString {
        &self.email
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password)
            .finish()
    }
}
