//! # Reference-based recoding of SAM read sequences
//!
//! Aligned reads mostly repeat the reference they were mapped to. Replacing
//! every base that matches the reference with `=` makes SAM/BAM files far
//! more compressible, and the substitution is exactly reversible given the
//! same reference.
//!
//! ## Components
//!
//! 1. **CIGAR tokenizer**: `14S15M1D34M` → ordered `(length, operator)` list
//! 2. **Base transcoder**: walks the CIGAR with a read cursor and a reference
//!    cursor, encoding or decoding aligned bases
//! 3. **Reference provider**: named, upper-cased sequences behind a
//!    single-slot cache
//! 4. **Record adapter**: SAM lines split into the fields the transcoder
//!    needs, everything else passed through byte for byte
//!
//! ## Usage Example
//!
//! ```
//! use samequals::genomics::{decode, encode, Cigar};
//!
//! let reference = b"ACGTWWWACGT";
//! let cigar: Cigar = "5M".parse()?;
//! let encoded = encode(reference, b"TWW==", 3, &cigar)?;
//! assert_eq!(encoded.sequence, b"=====");
//! let decoded = decode(reference, &encoded.sequence, 3, &cigar)?;
//! assert_eq!(decoded.sequence, b"TWWWA");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod genomics; // CIGAR, references, SAM records, transcoder
pub mod pipeline; // Streaming controller and run summary

pub use genomics::{Cigar, Mode, ReferenceProvider, ReferenceSet, Transcoder, SENTINEL};
pub use pipeline::{recode_stream, PipelineError, RecodeConfig, RecodePipeline, RunSummary};
