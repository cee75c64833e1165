//! Parsing of SAM CIGAR strings into ordered operation lists.
//!
//! A CIGAR string is a sequence of `<length><operator>` pairs such as
//! `14S15M1P1D3P54M1D34M5S`. Lengths are positive decimal integers and the
//! operator is one of `MIDNSHP=X`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{CigarOp, CigarOpKind};

/// Errors raised while tokenizing a CIGAR string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CigarError {
    /// The string does not follow the `<digits><operator>` grammar.
    #[error("invalid CIGAR '{cigar}': {reason}")]
    InvalidCigar {
        /// CIGAR text as found in the record.
        cigar: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A length was followed by a character outside `MIDNSHP=X`.
    #[error("unsupported CIGAR operator '{operator}' in '{cigar}'")]
    UnsupportedOperator {
        /// Offending operator character.
        operator: char,
        /// CIGAR text as found in the record.
        cigar: String,
    },
}

impl CigarError {
    fn invalid(cigar: &[u8], reason: &'static str) -> Self {
        Self::InvalidCigar {
            cigar: String::from_utf8_lossy(cigar).into_owned(),
            reason,
        }
    }
}

/// Ordered list of CIGAR operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<CigarOp>,
}

impl Cigar {
    /// Wrap an already-built operation list.
    pub fn from_ops(ops: Vec<CigarOp>) -> Self {
        Self { ops }
    }

    /// Tokenize raw CIGAR bytes.
    pub fn parse(text: &[u8]) -> Result<Self, CigarError> {
        if text.is_empty() {
            return Err(CigarError::invalid(text, "empty string"));
        }
        if text == b"*" {
            return Err(CigarError::invalid(text, "CIGAR is unavailable"));
        }

        let mut ops = Vec::new();
        let mut len: u32 = 0;
        let mut digits = 0usize;

        for &byte in text {
            if byte.is_ascii_digit() {
                len = len
                    .checked_mul(10)
                    .and_then(|value| value.checked_add(u32::from(byte - b'0')))
                    .ok_or_else(|| CigarError::invalid(text, "operation length overflows"))?;
                digits += 1;
                continue;
            }

            let kind = match CigarOpKind::from_symbol(byte) {
                Some(kind) if digits > 0 => kind,
                Some(_) => {
                    return Err(CigarError::invalid(text, "operator without a length"));
                }
                None if digits > 0 => {
                    return Err(CigarError::UnsupportedOperator {
                        operator: byte as char,
                        cigar: String::from_utf8_lossy(text).into_owned(),
                    });
                }
                None => {
                    return Err(CigarError::invalid(text, "unexpected character"));
                }
            };

            if len == 0 {
                return Err(CigarError::invalid(text, "zero-length operation"));
            }
            ops.push(CigarOp::new(kind, len));
            len = 0;
            digits = 0;
        }

        if digits > 0 {
            return Err(CigarError::invalid(text, "ends with a length but no operator"));
        }

        Ok(Self { ops })
    }

    /// Operations in alignment order.
    pub fn ops(&self) -> &[CigarOp] {
        &self.ops
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` when there are no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of read bases the program expects in the stored sequence.
    pub fn read_len(&self) -> usize {
        self.ops.iter().map(CigarOp::read_len).sum()
    }

    /// Number of reference bases covered by the alignment.
    pub fn reference_span(&self) -> usize {
        self.ops.iter().map(CigarOp::reference_len).sum()
    }
}

impl FromStr for Cigar {
    type Err = CigarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
