use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;

use crate::annotation::ReadAnnotation;
use crate::io::create_fasta;
use crate::qc::ClassifySummary;
use crate::search::SearchHit;
use crate::trim::{write_read, TrimmedRead};

/// Split full-length reads into chimeric and non-chimeric ones. A read is
/// chimeric when it has any body-anchored primer hit in `candidates`.
///
/// Writes both FASTA files plus a report, with header, covering every read.
pub fn resolve_chimeras(
    fl_reads: Vec<TrimmedRead>,
    candidates: &IndexMap<String, Vec<SearchHit>>,
    flnc: &Path,
    flc: &Path,
    report: &Path,
) -> Result<ClassifySummary> {
    info!("Update chimera info to reads annotations in the output FASTA file and the primer report.");
    let mut flnc_writer = create_fasta(flnc)?;
    let mut flc_writer = create_fasta(flc)?;
    let mut reporter = BufWriter::new(
        File::create(report).with_context(|| format!("cannot create file: {}", report.display()))?
    );
    writeln!(reporter, "{}", ReadAnnotation::report_header())?;

    let mut summary = ClassifySummary::default();
    for mut read in fl_reads {
        let is_chimera = candidates.contains_key(&read.annotation.id);
        read.annotation.chimera = Some(is_chimera);
        if is_chimera {
            summary.num_flc += 1;
            write_read(&mut flc_writer, &read)?;
        } else {
            summary.num_flnc += 1;
            summary.num_flnc_bases += read.sequence.len() as u64;
            write_read(&mut flnc_writer, &read)?;
        }
        writeln!(reporter, "{}", read.annotation.to_report_row())?;
    }
    reporter.flush()?;
    info!("{} full-length non-chimeric reads, {} chimeric.", summary.num_flnc, summary.num_flc);
    Ok(summary)
}
