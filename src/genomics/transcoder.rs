//! Reference-relative recoding of read sequences.
//!
//! Bases that match the reference under an `M`, `=` or `X` operation are
//! replaced with [`SENTINEL`] when encoding and restored from the reference
//! when decoding. Everything else (soft clips, insertions) is copied through,
//! so the output always has the same length as the input read.
//!
//! The walk keeps two cursors: one into the stored read sequence and one into
//! the reference, starting at the 0-based alignment position.

use std::fmt;

use thiserror::Error;

use super::{Cigar, CigarError, CigarOp, CigarOpKind};

/// Placeholder written in place of a base identical to the reference.
pub const SENTINEL: u8 = b'=';

/// Direction of the recoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Replace reference-matching bases with the sentinel.
    #[default]
    Encode,
    /// Restore sentinels from the reference.
    Decode,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Encode => f.write_str("encode"),
            Mode::Decode => f.write_str("decode"),
        }
    }
}

/// Errors that abort the recoding of a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    /// CIGAR text could not be tokenized.
    #[error(transparent)]
    Cigar(#[from] CigarError),

    /// An `=` or `X` operation contradicts the bases actually observed.
    #[error(
        "CIGAR operator '{kind}' contradicts read base '{read_base}' vs reference base \
         '{reference_base}' at read offset {read_offset}, reference offset {reference_offset}"
    )]
    CigarConsistency {
        /// Operation asserting equality (`=`) or inequality (`X`).
        kind: CigarOpKind,
        /// Read base as stored in the record.
        read_base: char,
        /// Reference base at the aligned position.
        reference_base: char,
        /// 0-based offset into the read sequence.
        read_offset: usize,
        /// 0-based offset into the reference.
        reference_offset: usize,
    },

    /// The CIGAR accounts for fewer bases than the read holds.
    #[error("CIGAR consumed {consumed} of {read_len} read bases")]
    TruncatedCigar {
        /// Read bases consumed by the whole program.
        consumed: usize,
        /// Length of the stored read sequence.
        read_len: usize,
    },

    /// An operation needs more read bases than remain.
    #[error("only {remaining} read bases left for {op}")]
    CigarOverrun {
        /// Operation that ran past the end of the read.
        op: CigarOp,
        /// Read bases still unconsumed when the operation started.
        remaining: usize,
    },
}

/// Non-fatal notice that an aligned span ran past the end of the reference.
///
/// Positions beyond the reference are never substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceOverrun {
    /// Operation whose span crossed the reference end.
    pub op: CigarOp,
    /// 0-based reference offset where the operation starts.
    pub reference_offset: usize,
    /// Length of the loaded reference.
    pub reference_len: usize,
    /// Number of positions of the span lying past the reference end.
    pub overrun: usize,
}

impl fmt::Display for ReferenceOverrun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at reference offset {} ran off the end of the {} bp reference by {} bp",
            self.op, self.reference_offset, self.reference_len, self.overrun
        )
    }
}

/// Outcome of recoding a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded {
    /// Recoded sequence, same length as the input read.
    pub sequence: Vec<u8>,
    /// Reference overruns met along the way.
    pub warnings: Vec<ReferenceOverrun>,
}

/// CIGAR-driven recoder for a fixed [`Mode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Transcoder {
    mode: Mode,
}

impl Transcoder {
    /// Create a transcoder for the given direction.
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Direction applied by this transcoder.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Recode `read`, aligned at 0-based `start` on `reference` by `cigar`.
    pub fn transcode(
        &self,
        reference: &[u8],
        read: &[u8],
        start: usize,
        cigar: &Cigar,
    ) -> Result<Transcoded, TranscodeError> {
        let mut sequence = Vec::with_capacity(read.len());
        let mut warnings = Vec::new();
        let mut read_pos = 0usize;
        let mut ref_pos = start;

        for op in cigar.ops() {
            let len = op.len as usize;
            let remaining = read.len() - read_pos;
            if op.kind.consumes_read() && len > remaining {
                return Err(TranscodeError::CigarOverrun { op: *op, remaining });
            }
            if op.kind.consumes_reference() && ref_pos + len > reference.len() {
                warnings.push(ReferenceOverrun {
                    op: *op,
                    reference_offset: ref_pos,
                    reference_len: reference.len(),
                    overrun: (ref_pos + len - reference.len()).min(len),
                });
            }

            match op.kind {
                CigarOpKind::HardClip | CigarOpKind::Padding => {}
                CigarOpKind::SoftClip | CigarOpKind::Insertion => {
                    sequence.extend_from_slice(&read[read_pos..read_pos + len]);
                    read_pos += len;
                }
                CigarOpKind::Deletion | CigarOpKind::Skip => {
                    ref_pos += len;
                }
                CigarOpKind::Match
                | CigarOpKind::SequenceMatch
                | CigarOpKind::SequenceMismatch => {
                    for i in 0..len {
                        let base = self.recode_base(
                            op.kind,
                            read[read_pos + i],
                            reference.get(ref_pos + i).copied(),
                            read_pos + i,
                            ref_pos + i,
                        )?;
                        sequence.push(base);
                    }
                    read_pos += len;
                    ref_pos += len;
                }
            }
        }

        if read_pos < read.len() {
            return Err(TranscodeError::TruncatedCigar {
                consumed: read_pos,
                read_len: read.len(),
            });
        }
        debug_assert_eq!(sequence.len(), read.len());

        Ok(Transcoded { sequence, warnings })
    }

    /// Apply the per-base rule for aligned positions. `None` marks a
    /// reference position past the end, which never matches.
    fn recode_base(
        &self,
        kind: CigarOpKind,
        read_base: u8,
        reference_base: Option<u8>,
        read_offset: usize,
        reference_offset: usize,
    ) -> Result<u8, TranscodeError> {
        let Some(reference_base) = reference_base else {
            return Ok(read_base);
        };

        match self.mode {
            Mode::Encode => {
                // References are upper-cased on load; a lowercase read base never
                // matches, so its case survives the round trip.
                let same = read_base == SENTINEL || read_base == reference_base;
                let contradicts = match kind {
                    CigarOpKind::SequenceMatch => !same,
                    CigarOpKind::SequenceMismatch => same,
                    _ => false,
                };
                if contradicts {
                    return Err(TranscodeError::CigarConsistency {
                        kind,
                        read_base: read_base as char,
                        reference_base: reference_base as char,
                        read_offset,
                        reference_offset,
                    });
                }
                Ok(if same { SENTINEL } else { read_base })
            }
            // Sentinels carry no record of the operator, so `=`/`X` are not checked here.
            Mode::Decode => Ok(if read_base == SENTINEL {
                reference_base
            } else {
                read_base
            }),
        }
    }
}

/// Replace reference-matching bases of `read` with [`SENTINEL`].
pub fn encode(
    reference: &[u8],
    read: &[u8],
    start: usize,
    cigar: &Cigar,
) -> Result<Transcoded, TranscodeError> {
    Transcoder::new(Mode::Encode).transcode(reference, read, start, cigar)
}

/// Restore [`SENTINEL`] positions of `read` from the reference.
pub fn decode(
    reference: &[u8],
    read: &[u8],
    start: usize,
    cigar: &Cigar,
) -> Result<Transcoded, TranscodeError> {
    Transcoder::new(Mode::Decode).transcode(reference, read, start, cigar)
}
