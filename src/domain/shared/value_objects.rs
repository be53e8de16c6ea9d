//! Shared value objects used across multiple bounded contexts

use super::error::DomainError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum digits after the `+` in an E.164 number
pub const E164_MIN_DIGITS: usize = 8;
/// Maximum digits after the `+` in an E.164 number
pub const E164_MAX_DIGITS: usize = 15;

/// Correlation identifier
///
/// Ties a dispatch request to its call session and every trunk event
/// reported for that call. Opaque to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id of the form `call-<digits>-<suffix>` for a destination
    pub fn generate(destination: &str) -> Self {
        let digits: String = destination.chars().filter(|c| c.is_ascii_digit()).collect();
        let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self(format!("call-{}-{}", digits, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// E.164 phone number value object
///
/// Always `+` followed by 8 to 15 digits, the first of which (the country
/// code) is never zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse a strictly formatted E.164 number
    pub fn parse(number: &str) -> Result<Self, DomainError> {
        let digits = number
            .strip_prefix('+')
            .ok_or_else(|| DomainError::InvalidPhoneNumber(format!("{} is missing leading '+'", number)))?;

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidPhoneNumber(format!(
                "{} contains non-digit characters",
                number
            )));
        }

        if digits.len() < E164_MIN_DIGITS || digits.len() > E164_MAX_DIGITS {
            return Err(DomainError::InvalidPhoneNumber(format!(
                "{} must have between {} and {} digits",
                number, E164_MIN_DIGITS, E164_MAX_DIGITS
            )));
        }

        if digits.starts_with('0') {
            return Err(DomainError::InvalidPhoneNumber(format!(
                "{} has an invalid country code",
                number
            )));
        }

        Ok(Self(number.to_string()))
    }

    /// Check a number against the E.164 rule without keeping it
    pub fn is_valid(number: &str) -> bool {
        Self::parse(number).is_ok()
    }

    /// Normalize free-form input into `+<digits>`
    ///
    /// Every non-digit is dropped. Returns an empty string when no digits remain.
    pub fn normalize(input: &str) -> String {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            String::new()
        } else {
            format!("+{}", digits)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits without the leading `+`
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_parse() {
        let number = PhoneNumber::parse("+919988776655").unwrap();
        assert_eq!(number.as_str(), "+919988776655");
        assert_eq!(number.digits(), "919988776655");

        assert!(PhoneNumber::parse("+15551234567").is_ok());
        assert!(PhoneNumber::parse("+12345678").is_ok());
        assert!(PhoneNumber::parse("+123456789012345").is_ok());
    }

    #[test]
    fn test_phone_number_rejects_malformed() {
        assert!(PhoneNumber::parse("919988776655").is_err());
        assert!(PhoneNumber::parse("+91 99887 76655").is_err());
        assert!(PhoneNumber::parse("+1-555-123-4567").is_err());
        assert!(PhoneNumber::parse("+1234567").is_err());
        assert!(PhoneNumber::parse("+1234567890123456").is_err());
        assert!(PhoneNumber::parse("+0123456789").is_err());
        assert!(PhoneNumber::parse("+").is_err());
        assert!(PhoneNumber::parse("").is_err());
    }

    #[test]
    fn test_phone_number_normalize() {
        assert_eq!(PhoneNumber::normalize(" +91 99887-76655 "), "+919988776655");
        assert_eq!(PhoneNumber::normalize("(555) 123 4567"), "+5551234567");
        assert_eq!(PhoneNumber::normalize("abc"), "");
    }

    #[test]
    fn test_phone_number_serde() {
        let number: PhoneNumber = serde_json::from_str("\"+15551234567\"").unwrap();
        assert_eq!(number.as_str(), "+15551234567");
        assert!(serde_json::from_str::<PhoneNumber>("\"5551234567\"").is_err());
    }

    #[test]
    fn test_correlation_id_generate() {
        let id = CorrelationId::generate("+919988776655");
        assert!(id.as_str().starts_with("call-919988776655-"));

        let suffix: u16 = id.as_str().rsplit('-').next().unwrap().parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }
}
