//! Validation and expansion of the primer FASTA into a search library.
//!
//! Primers come in pairs `F0, R0, F1, R1, ...`; each pair shares a combo
//! index. `F` is read 5'->3' on the transcript, `R` is given as it appears
//! on the 3' end of a forward-strand read.

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use bstr::ByteSlice;
use log::info;

use crate::error::ClassifyError;
use crate::io::{create_fasta, fasta_record, open_fasta};
use crate::utils::{contains, rev_compl};

/// Tag used to tell apart a pair whose primers are reverse complements of each other.
const SELF_IDENTITY_TAG: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimerEntry {
    pub name: String,
    pub sequence: Vec<u8>,
}

impl PrimerEntry {
    fn new(name: impl Into<String>, sequence: Vec<u8>) -> Self {
        Self { name: name.into(), sequence }
    }
}

/// Which search the primer library is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimerMode {
    /// Edge-anchored search over the read windows: `Fi` and `revcomp(Ri)`.
    Detection,
    /// Search over whole trimmed reads: `Fi`, `Ri` and both reverse complements.
    Chimera,
}

#[derive(Debug, Clone)]
pub struct PrimerTable {
    entries: Vec<PrimerEntry>,
    num_combos: usize,
}

impl PrimerTable {
    /// Read and validate a primer FASTA file.
    pub fn from_path<P: AsRef<Path>>(path: P, window_size: usize, mode: PrimerMode) -> Result<Self> {
        let mut reader = open_fasta(path.as_ref())?;
        let records = reader
            .records()
            .map(|record| {
                let record = record.with_context(|| format!("error reading primers from {}", path.as_ref().display()))?;
                Ok((record.name().to_str_lossy().into_owned(), record.sequence().as_ref().to_vec()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(records, window_size, mode)
    }

    /// Build the library from `(name, sequence)` records given in `F0, R0, F1, R1, ...` order.
    pub fn new<I>(records: I, window_size: usize, mode: PrimerMode) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        info!(
            "Process primers for {}.",
            match mode {
                PrimerMode::Detection => "finding primers",
                PrimerMode::Chimera => "detecting chimeras",
            }
        );

        let mut entries = Vec::new();
        let mut pending_forward: Option<Vec<u8>> = None;
        let mut num_combos = 0;
        for (i, (name, sequence)) in records.into_iter().enumerate() {
            let combo = i / 2;
            let expected = format!("{}{}", if i % 2 == 0 { 'F' } else { 'R' }, combo);
            if name != expected {
                return Err(ClassifyError::config(
                    "Primers should be placed in order F0, R0, F1, R1...",
                ).into());
            }
            if sequence.len() > window_size {
                return Err(ClassifyError::config(format!(
                    "Primer {} has length {} which is longer than {}.",
                    expected,
                    sequence.len(),
                    window_size
                )).into());
            }

            match pending_forward.take() {
                None => pending_forward = Some(sequence),
                Some(forward) => {
                    expand_pair(&mut entries, combo, forward, sequence, mode);
                    num_combos += 1;
                }
            }
        }

        if pending_forward.is_some() {
            return Err(ClassifyError::config(format!(
                "Primer F{} has no matching R{}.",
                num_combos, num_combos
            )).into());
        }
        if num_combos == 0 {
            return Err(ClassifyError::config("No primers found.").into());
        }

        Ok(Self { entries, num_combos })
    }

    pub fn entries(&self) -> &[PrimerEntry] {
        &self.entries
    }

    /// Valid primer combo indices, `0..n`.
    pub fn combo_indices(&self) -> Range<usize> {
        0..self.num_combos
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = create_fasta(path.as_ref())?;
        for entry in &self.entries {
            writer
                .write_record(&fasta_record(&entry.name, &entry.sequence))
                .with_context(|| format!("cannot write primers to {}", path.as_ref().display()))?;
        }
        Ok(())
    }
}

/// Whether `F` and `R` of a pair are reverse-complementarily identical, in
/// which case a poly-A/poly-T tag is needed to distinguish them.
pub fn is_self_identical(forward: &[u8], reverse: &[u8]) -> bool {
    let rc_reverse = rev_compl(reverse);
    contains(forward, &rc_reverse) || contains(&rc_reverse, forward)
}

fn expand_pair(entries: &mut Vec<PrimerEntry>, combo: usize, forward: Vec<u8>, reverse: Vec<u8>, mode: PrimerMode) {
    let rc_forward = rev_compl(&forward);
    let rc_reverse = rev_compl(&reverse);
    let self_identical = is_self_identical(&forward, &reverse);
    if self_identical {
        info!(
            "Primer F{n}, R{n} are reverse complementarily identical. \
            Need to add 'AAAA' to 3' to distinguish them.",
            n = combo
        );
    }
    let poly_t = |mut seq: Vec<u8>| {
        if self_identical {
            seq.extend(std::iter::repeat_n(b'T', SELF_IDENTITY_TAG));
        }
        seq
    };

    entries.push(PrimerEntry::new(format!("F{}", combo), forward));
    match mode {
        PrimerMode::Detection => {
            entries.push(PrimerEntry::new(format!("R{}", combo), poly_t(rc_reverse)));
        }
        PrimerMode::Chimera => {
            let reverse = if self_identical {
                let mut tagged = vec![b'A'; SELF_IDENTITY_TAG];
                tagged.extend(reverse);
                tagged
            } else {
                reverse
            };
            entries.push(PrimerEntry::new(format!("R{}", combo), reverse));
            entries.push(PrimerEntry::new(format!("F{}_revcmp", combo), rc_forward));
            entries.push(PrimerEntry::new(format!("R{}_revcmp", combo), poly_t(rc_reverse)));
        }
    }
}
