//! Reference sequences keyed by name.
//!
//! References are loaded in full before any record is processed and handed
//! out as shared, upper-cased byte slices. [`ReferenceCache`] keeps the most
//! recently used sequence hot, since sorted alignment streams visit one
//! reference for long runs of records.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use rust_htslib::faidx;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading or looking up references.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// A record named a reference that was never loaded.
    #[error("reference '{0}' not found in the loaded sequences")]
    UnknownReference(String),

    /// Failure reading the FASTA input.
    #[error("failed to read reference: {0}")]
    Io(#[from] io::Error),

    /// The FASTA input held no records.
    #[error("no sequences found in reference input")]
    EmptyReference,

    /// Two FASTA records share a name.
    #[error("duplicate reference name '{0}'")]
    DuplicateName(String),

    /// Sequence data appeared before the first `>` header.
    #[error("sequence data before the first FASTA header on line {0}")]
    MissingHeader(usize),

    /// The FASTA index lists more sequences than htslib can address.
    #[error("FASTA index lists {0} sequences, more than htslib can address")]
    TooManySequences(u64),

    /// Failure reported by htslib while reading an indexed FASTA.
    #[error("indexed FASTA error: {0}")]
    Index(#[from] rust_htslib::errors::Error),
}

/// Source of reference sequences by name.
pub trait ReferenceProvider {
    /// Upper-cased sequence for `name`.
    fn lookup(&self, name: &str) -> Result<Arc<[u8]>, ReferenceError>;
}

/// In-memory set of named reference sequences.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    sequences: HashMap<String, Arc<[u8]>>,
}

impl ReferenceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sequence, upper-casing it. Fails if the name is already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        sequence: impl AsRef<[u8]>,
    ) -> Result<(), ReferenceError> {
        let name = name.into();
        if self.sequences.contains_key(&name) {
            return Err(ReferenceError::DuplicateName(name));
        }
        let upper = sequence.as_ref().to_ascii_uppercase();
        self.sequences.insert(name, Arc::from(upper.into_boxed_slice()));
        Ok(())
    }

    /// Parse a plain FASTA stream.
    ///
    /// The record name is the first whitespace-delimited word of the header;
    /// wrapped sequence lines are joined.
    pub fn from_fasta_reader<R: BufRead>(reader: R) -> Result<Self, ReferenceError> {
        let mut set = Self::new();
        let mut current: Option<(String, Vec<u8>)> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                if let Some((name, sequence)) = current.take() {
                    set.insert(name, sequence)?;
                }
                let name = header.split_whitespace().next().unwrap_or_default();
                current = Some((name.to_string(), Vec::new()));
            } else {
                let (_, sequence) = current
                    .as_mut()
                    .ok_or(ReferenceError::MissingHeader(line_no + 1))?;
                sequence.extend_from_slice(line.trim().as_bytes());
            }
        }

        if let Some((name, sequence)) = current {
            set.insert(name, sequence)?;
        }
        if set.is_empty() {
            return Err(ReferenceError::EmptyReference);
        }
        Ok(set)
    }

    /// Load every record of a plain FASTA file.
    pub fn from_fasta_path<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let set = Self::from_fasta_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            sequences = set.len(),
            "loaded FASTA reference"
        );
        Ok(set)
    }

    /// Load every record through the htslib FASTA index.
    ///
    /// Accepts plain or bgzip-compressed FASTA; the `.fai` index is built
    /// next to the file when missing.
    pub fn from_faidx<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let reader = faidx::Reader::from_path(path)?;
        let mut set = Self::new();

        for idx in 0..index_count(reader.n_seqs())? {
            let name = reader.seq_name(idx)?;
            let len = reader.fetch_seq_len(&name) as usize;
            let sequence = if len == 0 {
                String::new()
            } else {
                reader.fetch_seq_string(&name, 0, len - 1)?
            };
            set.insert(name, sequence)?;
        }

        if set.is_empty() {
            return Err(ReferenceError::EmptyReference);
        }
        info!(
            path = %path.display(),
            sequences = set.len(),
            "loaded indexed FASTA reference"
        );
        Ok(set)
    }

    /// Number of loaded sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Returns `true` when no sequence is loaded.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Loaded reference names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sequences.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// htslib addresses index entries with an `i32`.
fn index_count(n_seqs: u64) -> Result<i32, ReferenceError> {
    i32::try_from(n_seqs).map_err(|_| ReferenceError::TooManySequences(n_seqs))
}

impl ReferenceProvider for ReferenceSet {
    fn lookup(&self, name: &str) -> Result<Arc<[u8]>, ReferenceError> {
        self.sequences
            .get(name)
            .cloned()
            .ok_or_else(|| ReferenceError::UnknownReference(name.to_string()))
    }
}

/// Single-slot cache in front of a [`ReferenceProvider`].
#[derive(Debug)]
pub struct ReferenceCache<'a, P: ?Sized> {
    provider: &'a P,
    current: Option<(String, Arc<[u8]>)>,
    hits: u64,
    misses: u64,
}

impl<'a, P: ReferenceProvider + ?Sized> ReferenceCache<'a, P> {
    /// Wrap a provider with an empty cache.
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            current: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Sequence for `name`, served from the slot when it holds the same name.
    pub fn get(&mut self, name: &str) -> Result<Arc<[u8]>, ReferenceError> {
        if let Some((cached, sequence)) = &self.current {
            if cached == name {
                self.hits += 1;
                return Ok(Arc::clone(sequence));
            }
        }

        let sequence = self.provider.lookup(name)?;
        self.misses += 1;
        debug!(reference = name, len = sequence.len(), "switching hot reference");
        self.current = Some((name.to_string(), Arc::clone(&sequence)));
        Ok(sequence)
    }

    /// Name currently held in the slot.
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_ref().map(|(name, _)| name.as_str())
    }

    /// Lookups answered from the slot.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that went to the provider.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
