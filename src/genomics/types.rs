use std::fmt;

/// CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOpKind {
    /// Alignment match (`M`), bases may or may not be equal.
    Match,
    /// Insertion relative to the reference (`I`).
    Insertion,
    /// Deletion relative to the reference (`D`).
    Deletion,
    /// Skipped reference region, e.g. an intron (`N`).
    Skip,
    /// Soft clipping (sequence present in read only, `S`).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read, `H`).
    HardClip,
    /// Silent deletion from a padded reference (`P`).
    Padding,
    /// Sequence match (`=`), bases asserted equal.
    SequenceMatch,
    /// Sequence mismatch (`X`), bases asserted different.
    SequenceMismatch,
}

impl CigarOpKind {
    /// Map a SAM operator character to its kind.
    pub fn from_symbol(symbol: u8) -> Option<Self> {
        let kind = match symbol {
            b'M' => Self::Match,
            b'I' => Self::Insertion,
            b'D' => Self::Deletion,
            b'N' => Self::Skip,
            b'S' => Self::SoftClip,
            b'H' => Self::HardClip,
            b'P' => Self::Padding,
            b'=' => Self::SequenceMatch,
            b'X' => Self::SequenceMismatch,
            _ => return None,
        };
        Some(kind)
    }

    /// SAM operator character.
    pub fn symbol(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Padding => 'P',
            Self::SequenceMatch => '=',
            Self::SequenceMismatch => 'X',
        }
    }

    /// Whether the operation consumes bases from the stored read sequence.
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Insertion
                | Self::SoftClip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }

    /// Whether the operation advances along the reference.
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Deletion
                | Self::Skip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }
}

impl fmt::Display for CigarOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Read bases consumed by this operation.
    pub fn read_len(&self) -> usize {
        if self.kind.consumes_read() {
            self.len as usize
        } else {
            0
        }
    }

    /// Reference bases spanned by this operation.
    pub fn reference_len(&self) -> usize {
        if self.kind.consumes_reference() {
            self.len as usize
        } else {
            0
        }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.symbol())
    }
}
