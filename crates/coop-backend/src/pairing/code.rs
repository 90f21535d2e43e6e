//! Pairing codes: eight decimal digits, zero-padded.

use std::fmt;

use rand::RngExt;

use super::PairingError;

pub const CODE_LENGTH: usize = 8;

/// Number of distinct codes (`10^CODE_LENGTH`).
const CODE_SPACE: u32 = 100_000_000;

/// A syntactically valid pairing code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingCode(String);

impl PairingCode {
    /// Accepts exactly [`CODE_LENGTH`] ASCII digits, ignoring surrounding
    /// whitespace. A blank code is invalid input; any other string that
    /// cannot be a code names no relay and is reported as not found.
    pub fn parse(raw: &str) -> Result<Self, PairingError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(PairingError::InvalidArgument(
                "pairing code is required".into(),
            ));
        }
        if code.len() != CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PairingError::NotFound("relay for pairing code".into()));
        }
        Ok(Self(code.to_string()))
    }

    fn from_number(n: u32) -> Self {
        Self(format!("{n:08}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of candidate codes. Uniqueness is the store's job; a generator
/// only has to spread candidates over the code space.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> PairingCode;
}

/// Uniform draw from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> PairingCode {
        PairingCode::from_number(rand::rng().random_range(0..CODE_SPACE))
    }
}

/// Hands out a fixed sequence of codes, repeating the last one when drained.
#[cfg(test)]
pub(crate) struct ScriptedCodes {
    codes: std::sync::Mutex<std::collections::VecDeque<&'static str>>,
    last: std::sync::Mutex<&'static str>,
}

#[cfg(test)]
impl ScriptedCodes {
    pub(crate) fn new(codes: &[&'static str]) -> Self {
        Self {
            codes: std::sync::Mutex::new(codes.iter().copied().collect()),
            last: std::sync::Mutex::new(codes.last().copied().unwrap_or("00000000")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl CodeGenerator for ScriptedCodes {
    fn generate(&self) -> PairingCode {
        let next = self.codes.lock().unwrap().pop_front();
        let code = match next {
            Some(code) => {
                *self.last.lock().unwrap() = code;
                code
            }
            None => *self.last.lock().unwrap(),
        };
        PairingCode::parse(code).unwrap()
    }
}
