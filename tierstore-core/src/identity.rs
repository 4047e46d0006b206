//! Record identifiers: validation and generation capabilities.
//!
//! Identifiers are produced and checked by an external collaborator. The
//! storage layer only consumes the [`UidValidator`] capability; the API layer
//! additionally needs a [`UidGenerator`] to mint identifiers for new records.
//! [`PatternUidGenerator`] is the stock implementation driven by an alphabet,
//! a format mask and a validation regex.

use rand::Rng;
use regex::Regex;

use crate::config::UidConfig;
use crate::error::{ConfigError, IdentifierError};

/// Placeholder character in a format mask that is replaced by a random
/// alphabet character.
pub const FORMAT_PLACEHOLDER: char = 'X';

/// Validates candidate identifiers.
pub trait UidValidator: Send + Sync {
    /// Search `candidate` for an identifier and return its canonical form.
    ///
    /// Callers that need an exact match must compare the returned value with
    /// the input themselves.
    fn validate(&self, candidate: &str) -> Result<String, IdentifierError>;
}

/// Mints new identifiers.
pub trait UidGenerator: UidValidator {
    fn generate(&self) -> String;
}

impl<T: UidValidator + ?Sized> UidValidator for std::sync::Arc<T> {
    fn validate(&self, candidate: &str) -> Result<String, IdentifierError> {
        (**self).validate(candidate)
    }
}

impl<T: UidGenerator + ?Sized> UidGenerator for std::sync::Arc<T> {
    fn generate(&self) -> String {
        (**self).generate()
    }
}

/// Alphabet + mask + regex identifier generator.
#[derive(Debug, Clone)]
pub struct PatternUidGenerator {
    alphabet: Vec<char>,
    format: String,
    validator: Regex,
}

impl PatternUidGenerator {
    /// Build a generator.
    ///
    /// Fails if the alphabet is empty, the mask has no placeholder, the regex
    /// does not compile, or a freshly generated identifier does not validate
    /// to itself.
    pub fn new(alphabet: &str, format: &str, pattern: &str) -> Result<Self, ConfigError> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "uid.chars".to_string(),
                value: String::new(),
                reason: "alphabet must not be empty".to_string(),
            });
        }
        if !format.contains(FORMAT_PLACEHOLDER) {
            return Err(ConfigError::InvalidValue {
                field: "uid.format".to_string(),
                value: format.to_string(),
                reason: format!("mask must contain at least one '{}'", FORMAT_PLACEHOLDER),
            });
        }
        let validator = Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
            field: "uid.validator_regexp".to_string(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let generator = Self {
            alphabet,
            format: format.to_string(),
            validator,
        };

        let sample = generator.generate();
        match generator.validate(&sample) {
            Ok(canonical) if canonical == sample => Ok(generator),
            _ => Err(ConfigError::InvalidValue {
                field: "uid.validator_regexp".to_string(),
                value: pattern.to_string(),
                reason: format!("generated identifier {:?} does not validate", sample),
            }),
        }
    }

    pub fn from_config(config: &UidConfig) -> Result<Self, ConfigError> {
        Self::new(&config.chars, &config.format, &config.validator_regexp)
    }

    /// Length in characters of every generated identifier.
    pub fn uid_len(&self) -> usize {
        self.format.chars().count()
    }
}

impl Default for PatternUidGenerator {
    fn default() -> Self {
        let config = UidConfig::default();
        Self {
            alphabet: config.chars.chars().collect(),
            format: config.format,
            validator: Regex::new(&config.validator_regexp)
                .expect("default uid pattern is a valid regex"),
        }
    }
}

impl UidValidator for PatternUidGenerator {
    fn validate(&self, candidate: &str) -> Result<String, IdentifierError> {
        self.validator
            .find(candidate)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| IdentifierError::PatternMismatch {
                candidate: candidate.to_string(),
            })
    }
}

impl UidGenerator for PatternUidGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        self.format
            .chars()
            .map(|c| {
                if c == FORMAT_PLACEHOLDER {
                    self.alphabet[rng.random_range(0..self.alphabet.len())]
                } else {
                    c
                }
            })
            .collect()
    }
}
