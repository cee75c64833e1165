//! SAM recoding primitives: CIGAR handling, reference lookup, record access
//! and the base transcoder built on top of them.

mod cigar;
mod io;
mod reference;
mod sam;
mod transcoder;
mod types;

pub use cigar::{Cigar, CigarError};
pub use io::{open_input, open_output};
pub use reference::{ReferenceCache, ReferenceError, ReferenceProvider, ReferenceSet};
pub use sam::{RecordError, SamLine, SamRecord, FLAG_UNMAPPED, HEADER_MARKER};
pub use transcoder::{
    decode, encode, Mode, ReferenceOverrun, TranscodeError, Transcoded, Transcoder, SENTINEL,
};
pub use types::{CigarOp, CigarOpKind};
