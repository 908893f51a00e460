use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::search::CachePolicy;

/// Thresholds shared by primer trimming and chimera detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChimeraDetectionOptions {
    /// Minimum length to output a (trimmed) sequence.
    pub min_seq_len: usize,
    /// Minimum search score for a primer hit.
    pub min_score: f64,
    /// Minimum distance a primer has to be from the end of the sequence.
    pub min_dist_from_end: usize,
    /// Maximum distance between adjacent primer hits to consider as chimera.
    /// Carried for completeness; the decision rule does not consult it.
    pub max_adjacent_hit_dist: usize,
    /// Primers are searched within windows of this length.
    pub primer_search_window: usize,
}

impl Default for ChimeraDetectionOptions {
    fn default() -> Self {
        Self {
            min_seq_len: 50,
            min_score: 10.0,
            min_dist_from_end: 100,
            max_adjacent_hit_dist: 50,
            primer_search_window: 100,
        }
    }
}

/// Everything a classification run needs to know.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub reads: PathBuf,
    pub primers: PathBuf,
    pub matrix: PathBuf,
    pub out_dir: PathBuf,
    /// Combined trimmed output: full-length non-chimeric reads followed by non-full-length reads.
    pub out_reads: PathBuf,
    pub out_flnc: Option<PathBuf>,
    pub out_nfl: Option<PathBuf>,
    pub primer_report: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub num_threads: usize,
    /// Rename reads to `movie/well/start_end` after trimming.
    pub rename_reads: bool,
    /// Full-length reads do not need a poly-A tail.
    pub ignore_poly_a: bool,
    pub chimera: ChimeraDetectionOptions,
    pub cache: CachePolicy,
}

impl ClassifyOptions {
    pub fn new(
        reads: impl Into<PathBuf>,
        primers: impl Into<PathBuf>,
        matrix: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
        out_reads: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reads: reads.into(),
            primers: primers.into(),
            matrix: matrix.into(),
            out_dir: out_dir.into(),
            out_reads: out_reads.into(),
            out_flnc: None,
            out_nfl: None,
            primer_report: None,
            summary: None,
            num_threads: 8,
            rename_reads: true,
            ignore_poly_a: false,
            chimera: ChimeraDetectionOptions::default(),
            cache: CachePolicy::default(),
        }
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_rename_reads(mut self, rename: bool) -> Self {
        self.rename_reads = rename;
        self
    }

    pub fn with_ignore_poly_a(mut self, ignore: bool) -> Self {
        self.ignore_poly_a = ignore;
        self
    }

    pub fn with_chimera_options(mut self, opts: ChimeraDetectionOptions) -> Self {
        self.chimera = opts;
        self
    }

    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_flnc_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_flnc = Some(path.into());
        self
    }

    pub fn with_nfl_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_nfl = Some(path.into());
        self
    }

    pub fn with_primer_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.primer_report = Some(path.into());
        self
    }

    pub fn with_summary(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary = Some(path.into());
        self
    }

    /// Reject option values no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(ClassifyError::config("number of threads must be at least 1").into());
        }
        if self.chimera.primer_search_window == 0 {
            return Err(ClassifyError::config("primer search window must be positive").into());
        }
        if !self.chimera.min_score.is_finite() {
            return Err(ClassifyError::config("minimum score must be a finite number").into());
        }
        Ok(())
    }
}

/// Every file a run reads or writes besides its inputs.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub out_reads: PathBuf,
    pub flnc: PathBuf,
    pub nfl: PathBuf,
    pub flc: PathBuf,
    pub fl_trimmed: PathBuf,
    pub primers_front_end: PathBuf,
    pub primers_chimera: PathBuf,
    pub front_end_dom: PathBuf,
    pub chimera_dom: PathBuf,
    pub primer_report: PathBuf,
    pub primer_report_nfl: PathBuf,
    pub primer_report_fl: PathBuf,
    pub summary: PathBuf,
    pub summary_json: PathBuf,
}

impl OutputPaths {
    pub fn new(opts: &ClassifyOptions) -> Self {
        let dir = opts.out_dir.as_path();
        let in_dir = |name: &str| dir.join(name);
        let summary = opts.summary.clone()
            .unwrap_or_else(|| opts.out_reads.with_extension("classify_summary.txt"));
        Self {
            out_reads: opts.out_reads.clone(),
            flnc: opts.out_flnc.clone().unwrap_or_else(|| in_dir("flnc.fasta")),
            nfl: opts.out_nfl.clone().unwrap_or_else(|| in_dir("nfl.fasta")),
            flc: in_dir("flc.fasta"),
            fl_trimmed: in_dir("fl.trimmed.fasta"),
            primers_front_end: in_dir("primers.front_end.fa"),
            primers_chimera: in_dir("primers.chimera.fa"),
            front_end_dom: in_dir("hmmer.front_end.dom"),
            chimera_dom: in_dir("hmmer.chimera.dom"),
            primer_report: opts.primer_report.clone()
                .unwrap_or_else(|| opts.out_reads.with_extension("primer_info.csv")),
            primer_report_nfl: in_dir("primer_report.nfl.csv"),
            primer_report_fl: in_dir("primer_report.fl.csv"),
            summary_json: summary.with_extension("json"),
            summary,
        }
    }

    pub fn work_dir(&self) -> &Path {
        self.fl_trimmed.parent().unwrap_or(Path::new("."))
    }
}
