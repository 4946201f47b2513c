//! Customer contact details captured at checkout.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating customer contact details.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// A required field is missing or blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The email address is longer than RFC 5321 allows.
    #[error("email must be at most {max} characters")]
    EmailTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The email address is not of the form `local@domain`.
    #[error("email address is malformed")]
    MalformedEmail,
}

/// A syntactically valid email address.
///
/// Only structure is checked: one `@` with non-empty parts on either side.
/// Deliverability is the payment provider's concern.
///
/// ```
/// use timberline_core::Email;
///
/// assert!(Email::parse("buyer@example.com").is_ok());
/// assert!(Email::parse("buyer@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize (trim) an email address.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError`] if the input is blank, too long or malformed.
    pub fn parse(raw: &str) -> Result<Self, ContactError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(ContactError::Missing("email"));
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(ContactError::EmailTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_owned()))
            }
            _ => Err(ContactError::MalformedEmail),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = ContactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

/// Who is buying and where the furniture goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerContact {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
}

impl CustomerContact {
    /// Check that every free-text field is present.
    ///
    /// The email is already validated by construction.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::Missing`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ContactError> {
        for (field, value) in [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
        ] {
            if value.trim().is_empty() {
                return Err(ContactError::Missing(field));
            }
        }
        Ok(())
    }
}
