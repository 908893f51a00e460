use anyhow::{Context, Result};
use log::{info, warn};

use crate::chimera::resolve_chimeras;
use crate::error::ClassifyError;
use crate::hits::{chimera_candidates, EdgeHits};
use crate::io::{cat_files, count_fasta_records, remove_files};
use crate::options::{ClassifyOptions, OutputPaths};
use crate::primer::{PrimerMode, PrimerTable};
use crate::qc::ClassifySummary;
use crate::search::{read_hits, ChunkedSearch, Extraction, SearchTool};
use crate::trim::{ReadTrimmer, TrimmedRead};

/// Runs the two classification phases: primer trimming, then chimera detection
/// on the full-length reads.
pub struct Classifier<'a, T: ?Sized> {
    opts: ClassifyOptions,
    paths: OutputPaths,
    tool: &'a T,
}

impl<'a, T: SearchTool + ?Sized> Classifier<'a, T> {
    pub fn new(opts: ClassifyOptions, tool: &'a T) -> Self {
        let paths = OutputPaths::new(&opts);
        Self { opts, paths, tool }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn run(&self) -> Result<ClassifySummary> {
        self.opts.validate()?;
        info!("Chimera detection options: {}", serde_json::to_string(&self.opts.chimera)?);
        self.validate_inputs()?;
        self.validate_outputs()?;
        self.tool.check()?;

        let (fl_reads, mut summary) = self.run_primer_trimmer()?;
        if summary.num_fl == 0 {
            return Err(ClassifyError::NoFullLength.into());
        }
        summary.merge(&self.run_chimera_detector(fl_reads)?);

        info!("Concatenating full-length and non-full-length reads into {}", self.paths.out_reads.display());
        cat_files(&[&self.paths.flnc, &self.paths.nfl], &self.paths.out_reads)?;
        cat_files(&[&self.paths.primer_report_fl, &self.paths.primer_report_nfl], &self.paths.primer_report)?;

        summary.check_partition()?;
        info!("Writing summary to {}", self.paths.summary.display());
        summary.write(&self.paths.summary, &self.paths.summary_json)?;

        remove_files(&[&self.paths.primer_report_nfl, &self.paths.primer_report_fl])?;
        info!("Done with classification.");
        Ok(summary)
    }

    fn validate_inputs(&self) -> Result<()> {
        for (kind, path) in [
            ("input reads", &self.opts.reads),
            ("primer", &self.opts.primers),
            ("score matrix", &self.opts.matrix),
        ] {
            if !path.exists() {
                return Err(ClassifyError::missing_file(kind, path).into());
            }
        }
        Ok(())
    }

    fn validate_outputs(&self) -> Result<()> {
        let out_dir = &self.opts.out_dir;
        info!("Creating output directory {}.", out_dir.display());
        if out_dir.exists() {
            warn!("Output directory {} already exists.", out_dir.display());
        } else {
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("cannot create directory: {}", out_dir.display()))?;
        }
        if self.paths.out_reads.exists() {
            warn!("Output file {} already exists.", self.paths.out_reads.display());
        }
        Ok(())
    }

    fn search(&self) -> ChunkedSearch<'_, T> {
        ChunkedSearch::new(self.tool, self.paths.work_dir())
            .with_num_workers(self.opts.num_threads)
            .with_cache_policy(self.opts.cache)
    }

    /// Find primers on the read ends, trim them and the poly-A tail away.
    fn run_primer_trimmer(&self) -> Result<(Vec<TrimmedRead>, ClassifySummary)> {
        info!("Start to find and trim 3'/5' primers and polyAs.");
        let window = self.opts.chimera.primer_search_window;
        let primers = PrimerTable::from_path(&self.opts.primers, window, PrimerMode::Detection)?;
        primers.write(&self.paths.primers_front_end)?;

        let num_reads = count_fasta_records(&self.opts.reads)?;
        self.search().run(
            &self.opts.reads,
            num_reads,
            &self.paths.primers_front_end,
            Extraction::Windows(window),
            "front_end",
            &self.paths.front_end_dom,
        )?;

        let edge_hits = EdgeHits::from_path(&self.paths.front_end_dom)?;
        let result = ReadTrimmer::new(&edge_hits, primers.combo_indices(), self.opts.chimera)
            .with_rename_reads(self.opts.rename_reads)
            .with_ignore_poly_a(self.opts.ignore_poly_a)
            .run(&self.opts.reads, &self.paths.nfl, &self.paths.primer_report_nfl, &self.paths.fl_trimmed)?;
        info!("Done with finding and trimming primers and polyAs.");
        Ok(result)
    }

    /// Search all primer orientations inside the full-length reads.
    fn run_chimera_detector(&self, fl_reads: Vec<TrimmedRead>) -> Result<ClassifySummary> {
        info!("Start to detect chimeras from trimmed reads.");
        let window = self.opts.chimera.primer_search_window;
        PrimerTable::from_path(&self.opts.primers, window, PrimerMode::Chimera)?
            .write(&self.paths.primers_chimera)?;

        self.search().run(
            &self.paths.fl_trimmed,
            fl_reads.len(),
            &self.paths.primers_chimera,
            Extraction::Whole,
            "trimmed",
            &self.paths.chimera_dom,
        )?;

        let candidates = chimera_candidates(read_hits(&self.paths.chimera_dom)?, &self.opts.chimera)?;
        let summary = resolve_chimeras(
            fl_reads,
            &candidates,
            &self.paths.flnc,
            &self.paths.flc,
            &self.paths.primer_report_fl,
        )?;
        info!("Done with chimera detection.");
        Ok(summary)
    }
}
