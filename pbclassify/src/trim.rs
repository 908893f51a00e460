//! Primer and poly-A trimming of raw reads.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use bstr::ByteSlice;
use log::{debug, info};

use crate::annotation::{ReadAnnotation, Strand};
use crate::arbiter::{pick_best_combo, PrimerComboDecision};
use crate::hits::EdgeHits;
use crate::io::{create_fasta, fasta_record, open_fasta, FastaWriter};
use crate::options::ChimeraDetectionOptions;
use crate::polya::find_poly_a;
use crate::qc::ClassifySummary;
use crate::read::ReadIdentity;
use crate::utils::rev_compl;

/// Minimum number of consecutive A's seeding a poly-A tail.
const MIN_POLY_A: usize = 8;

/// A read after trimming, oriented 5' to 3' on the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedRead {
    pub annotation: ReadAnnotation,
    pub sequence: Vec<u8>,
}

/// Where a trimmed read ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    FilteredShort,
    NonFullLength,
    FullLength,
}

/// Classifies reads from their edge-anchored primer hits.
pub struct ReadTrimmer<'a> {
    edge_hits: &'a EdgeHits,
    combos: Range<usize>,
    opts: ChimeraDetectionOptions,
    rename_reads: bool,
    ignore_poly_a: bool,
}

impl<'a> ReadTrimmer<'a> {
    pub fn new(edge_hits: &'a EdgeHits, combos: Range<usize>, opts: ChimeraDetectionOptions) -> Self {
        Self {
            edge_hits,
            combos,
            opts,
            rename_reads: true,
            ignore_poly_a: false,
        }
    }

    pub fn with_rename_reads(mut self, rename: bool) -> Self {
        self.rename_reads = rename;
        self
    }

    pub fn with_ignore_poly_a(mut self, ignore: bool) -> Self {
        self.ignore_poly_a = ignore;
        self
    }

    /// Trim one read and annotate it.
    pub fn trim(&self, name: &str, seq: &[u8]) -> Result<TrimmedRead> {
        let identity = ReadIdentity::parse(name, seq.len())?;
        let decision = pick_best_combo(
            self.edge_hits.front(name),
            self.edge_hits.back(name),
            self.combos.clone(),
            self.opts.min_score,
        );
        debug!(
            "read={} primer={:?} strand={:?} fw={:?} rc={:?}",
            name, decision.combo, decision.strand, decision.front_hit, decision.back_hit
        );

        let (Some(strand), true) = (decision.strand, decision.has_primer_evidence()) else {
            let id = self.read_id(name, &identity, identity.start, identity.end);
            let mut annotation = ReadAnnotation::new(id);
            annotation.ignore_poly_a = self.ignore_poly_a;
            return Ok(TrimmedRead { annotation, sequence: seq.to_vec() });
        };
        Ok(self.clip(name, &identity, seq, strand, &decision))
    }

    fn clip(&self, name: &str, identity: &ReadIdentity, seq: &[u8], strand: Strand, decision: &PrimerComboDecision) -> TrimmedRead {
        let oriented = match strand {
            Strand::Forward => seq.to_vec(),
            Strand::Reverse => rev_compl(seq),
        };
        let len = oriented.len();
        let five_end = decision.front_hit.as_ref().map(|h| h.query_end.min(len));
        let three_start = decision.back_hit.as_ref().map(|h| len.saturating_sub(h.query_end));
        let poly_a = find_poly_a(&oriented, MIN_POLY_A, three_start);

        let (s, e) = (identity.start, identity.end);
        // Map an offset in the oriented read back to original read coordinates.
        let remap = |pos: usize| match strand {
            Strand::Forward => s + pos,
            Strand::Reverse => e.saturating_sub(pos),
        };
        let three_clip = poly_a.or(three_start);
        let end1 = match (three_clip, strand) {
            (Some(pos), _) => remap(pos),
            (None, Strand::Forward) => e,
            (None, Strand::Reverse) => s,
        };
        let start1 = remap(five_end.unwrap_or(0));

        let (from, to) = (five_end.unwrap_or(0), three_clip.unwrap_or(len));
        let sequence = oriented.get(from..to).unwrap_or_default().to_vec();

        let annotation = ReadAnnotation {
            id: self.read_id(name, identity, start1, end1),
            strand: Some(strand),
            five_end,
            poly_a_end: poly_a,
            three_end: three_start,
            primer: decision.combo,
            chimera: None,
            ignore_poly_a: self.ignore_poly_a,
        };
        TrimmedRead { annotation, sequence }
    }

    fn read_id(&self, name: &str, identity: &ReadIdentity, start: usize, end: usize) -> String {
        if self.rename_reads {
            identity.renamed(start, end)
        } else {
            name.to_string()
        }
    }

    pub fn disposition(&self, read: &TrimmedRead) -> Disposition {
        if read.sequence.len() < self.opts.min_seq_len {
            Disposition::FilteredShort
        } else if read.annotation.is_full_length() {
            Disposition::FullLength
        } else {
            Disposition::NonFullLength
        }
    }

    /// Trim every read of `reads`. Non-full-length reads and their report rows
    /// are written out right away; full-length reads are written to
    /// `fl_reads` for the chimera search and returned.
    pub fn run(
        &self,
        reads: &Path,
        nfl_reads: &Path,
        nfl_report: &Path,
        fl_reads: &Path,
    ) -> Result<(Vec<TrimmedRead>, ClassifySummary)> {
        info!("Trim bar code away from reads.");
        debug!("Writing full-length trimmed reads to {}", fl_reads.display());
        debug!("Writing non-full-length trimmed reads to {}", nfl_reads.display());

        let mut reader = open_fasta(reads)?;
        let mut nfl_writer = create_fasta(nfl_reads)?;
        let mut fl_writer = create_fasta(fl_reads)?;
        let mut reporter = BufWriter::new(
            File::create(nfl_report).with_context(|| format!("cannot create file: {}", nfl_report.display()))?
        );

        let mut summary = ClassifySummary::default();
        let mut full_length = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("error reading {}", reads.display()))?;
            let name = record.name().to_str_lossy();
            let read = self.trim(&name, record.sequence().as_ref())?;

            summary.num_reads += 1;
            summary.num_5_seen += read.annotation.five_seen() as u64;
            summary.num_3_seen += read.annotation.three_seen() as u64;
            summary.num_polya_seen += read.annotation.poly_a_seen() as u64;
            match self.disposition(&read) {
                Disposition::FilteredShort => summary.num_filtered_short_reads += 1,
                Disposition::NonFullLength => {
                    summary.num_nfl += 1;
                    write_read(&mut nfl_writer, &read)?;
                    writeln!(reporter, "{}", read.annotation.to_report_row())?;
                }
                Disposition::FullLength => {
                    summary.num_fl += 1;
                    write_read(&mut fl_writer, &read)?;
                    full_length.push(read);
                }
            }
        }
        reporter.flush()?;
        info!(
            "Trimmed {} reads: {} full-length, {} non-full-length, {} too short.",
            summary.num_reads, summary.num_fl, summary.num_nfl, summary.num_filtered_short_reads
        );
        Ok((full_length, summary))
    }
}

pub(crate) fn write_read(writer: &mut FastaWriter, read: &TrimmedRead) -> Result<()> {
    writer.write_record(&fasta_record(&read.annotation.to_header(), &read.sequence))?;
    Ok(())
}
