use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use pbclassify::search::{CachePolicy, Phmmer};
use pbclassify::{ChimeraDetectionOptions, Classifier, ClassifyOptions};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Classify reads of insert into full-length and non-full-length reads, and
/// full-length reads into chimeric and non-chimeric ones.
#[derive(Debug, Parser)]
#[command(name = "pbclassify", version)]
struct Args {
    /// Input reads in FASTA format, possibly gzip or zstd compressed.
    #[arg(value_name = "READS")]
    reads: PathBuf,

    /// Output trimmed reads: full-length non-chimeric followed by non-full-length.
    #[arg(value_name = "OUT_READS")]
    out_reads: PathBuf,

    /// Primer FASTA with records in order F0, R0, F1, R1, ...
    #[arg(short = 'p', long = "primer", value_name = "PATH")]
    primers: PathBuf,

    /// Score matrix handed to phmmer.
    #[arg(short = 'm', long = "matrix", value_name = "PATH")]
    matrix: PathBuf,

    /// Directory for intermediate files.
    #[arg(short = 'd', long = "out-dir", value_name = "DIR", default_value = "classifyOut")]
    out_dir: PathBuf,

    /// Output full-length non-chimeric reads.
    #[arg(long = "flnc", value_name = "PATH")]
    flnc: Option<PathBuf>,

    /// Output non-full-length reads.
    #[arg(long = "nfl", value_name = "PATH")]
    nfl: Option<PathBuf>,

    /// Per-read primer report; defaults to `<OUT_READS stem>.primer_info.csv`.
    #[arg(long = "report", value_name = "PATH")]
    report: Option<PathBuf>,

    /// Summary file; defaults to `<OUT_READS stem>.classify_summary.txt`.
    #[arg(long = "summary", value_name = "PATH")]
    summary: Option<PathBuf>,

    #[arg(long = "cpus", value_name = "N", default_value_t = 8)]
    cpus: usize,

    /// Minimum length to output a (trimmed) sequence.
    #[arg(long = "min-seq-len", default_value_t = 50)]
    min_seq_len: usize,

    /// Minimum phmmer score for primer hits.
    #[arg(long = "min-score", default_value_t = 10.0)]
    min_score: f64,

    /// Minimum distance a primer has to be from the end of the sequence.
    #[arg(long = "min-dist-from-end", default_value_t = 100)]
    min_dist_from_end: usize,

    /// Maximum distance between adjacent primer hits to consider as chimera.
    #[arg(long = "max-adjacent-hit-dist", default_value_t = 50)]
    max_adjacent_hit_dist: usize,

    /// Search primers within windows of this length at both read ends.
    #[arg(long = "primer-search-window", default_value_t = 100)]
    primer_search_window: usize,

    /// Full-length reads do not require a poly-A tail.
    #[arg(long = "ignore-polya")]
    ignore_poly_a: bool,

    /// Keep the input read names instead of `movie/well/start_end`.
    #[arg(long = "no-rename")]
    no_rename: bool,

    /// Search again even if results from an earlier run exist.
    #[arg(long = "recompute")]
    recompute: bool,

    /// phmmer executable.
    #[arg(long = "phmmer", value_name = "PROGRAM", default_value = "phmmer")]
    phmmer: String,
}

impl Args {
    fn options(&self) -> ClassifyOptions {
        let chimera = ChimeraDetectionOptions {
            min_seq_len: self.min_seq_len,
            min_score: self.min_score,
            min_dist_from_end: self.min_dist_from_end,
            max_adjacent_hit_dist: self.max_adjacent_hit_dist,
            primer_search_window: self.primer_search_window,
        };
        let mut opts = ClassifyOptions::new(&self.reads, &self.primers, &self.matrix, &self.out_dir, &self.out_reads)
            .with_num_threads(self.cpus)
            .with_rename_reads(!self.no_rename)
            .with_ignore_poly_a(self.ignore_poly_a)
            .with_chimera_options(chimera)
            .with_cache_policy(if self.recompute { CachePolicy::Recompute } else { CachePolicy::ReuseExisting });
        if let Some(path) = &self.flnc {
            opts = opts.with_flnc_output(path);
        }
        if let Some(path) = &self.nfl {
            opts = opts.with_nfl_output(path);
        }
        if let Some(path) = &self.report {
            opts = opts.with_primer_report(path);
        }
        if let Some(path) = &self.summary {
            opts = opts.with_summary(path);
        }
        opts
    }
}

fn run(args: Args) -> Result<()> {
    let tool = Phmmer::new(&args.matrix).with_program(&args.phmmer);
    let classifier = Classifier::new(args.options(), &tool);
    let summary = classifier.run()?;
    info!(
        "{} of {} reads are full-length non-chimeric. Trimmed reads written to {}",
        summary.num_flnc,
        summary.num_reads,
        classifier.paths().out_reads.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
