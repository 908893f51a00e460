use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bstr::ByteSlice;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;

use super::{CachePolicy, SearchTool};
use crate::io::{cat_files, create_fasta, fasta_record, open_fasta, remove_files};
use crate::utils::rev_compl;

/// What each read contributes to the chunk files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// `<name>_front` with the first `n` bases and `<name>_back` with the first
    /// `n` bases of the reverse complement.
    Windows(usize),
    /// The whole read.
    Whole,
}

/// How reads are split into chunks: contiguous blocks of `reads_per_chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub num_chunks: usize,
    pub reads_per_chunk: usize,
}

impl ChunkPlan {
    /// At most one chunk per worker, balanced by size rather than count.
    pub fn new(num_reads: usize, max_workers: usize) -> Self {
        let num_chunks = max_workers.min(num_reads).max(1);
        let reads_per_chunk = num_reads.div_ceil(num_chunks).max(1);
        let num_chunks = num_reads.div_ceil(reads_per_chunk).max(1);
        Self { num_chunks, reads_per_chunk }
    }

    pub fn chunk_of(&self, read_index: usize) -> usize {
        read_index / self.reads_per_chunk
    }
}

/// Fans a search out over chunk files and joins the per-chunk tables.
pub struct ChunkedSearch<'a, T: ?Sized> {
    tool: &'a T,
    num_workers: usize,
    work_dir: PathBuf,
    cache: CachePolicy,
}

impl<'a, T: SearchTool + ?Sized> ChunkedSearch<'a, T> {
    pub fn new(tool: &'a T, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            num_workers: 1,
            work_dir: work_dir.into(),
            cache: CachePolicy::default(),
        }
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Search the `num_reads` reads of `reads` against `primers`, writing the
    /// combined hit table to `combined`. Chunk files are named
    /// `<chunk_prefix>.in.<i>` and `<chunk_prefix>.out.<i>` in the work dir.
    ///
    /// Returns `false` if an existing `combined` was reused and nothing was searched.
    pub fn run(
        &self,
        reads: &Path,
        num_reads: usize,
        primers: &Path,
        extraction: Extraction,
        chunk_prefix: &str,
        combined: &Path,
    ) -> Result<bool> {
        if self.cache.is_cached(combined) {
            info!("Output already exists. Parsing {}", combined.display());
            return Ok(false);
        }
        if num_reads == 0 {
            info!("No reads to search in {}", reads.display());
            std::fs::File::create(combined)
                .with_context(|| format!("cannot create file: {}", combined.display()))?;
            return Ok(true);
        }

        let plan = ChunkPlan::new(num_reads, self.num_workers);
        debug!("Split all reads into {} chunks", plan.num_chunks);
        let (inputs, outputs): (Vec<_>, Vec<_>) = (0..plan.num_chunks)
            .map(|i| (
                self.work_dir.join(format!("{}.in.{}", chunk_prefix, i)),
                self.work_dir.join(format!("{}.out.{}", chunk_prefix, i)),
            ))
            .unzip();

        self.split_reads(reads, &plan, &inputs, extraction)?;
        self.search_chunks(primers, &inputs, &outputs)?;

        let partial = combined.with_extension("partial");
        cat_files(&outputs, &partial)?;
        std::fs::rename(&partial, combined)
            .with_context(|| format!("cannot move {} to {}", partial.display(), combined.display()))?;

        remove_files(&inputs)?;
        remove_files(&outputs)?;
        Ok(true)
    }

    fn split_reads(&self, reads: &Path, plan: &ChunkPlan, inputs: &[PathBuf], extraction: Extraction) -> Result<()> {
        info!(
            "Split {} into {} chunks, each containing at most {} reads.",
            reads.display(), plan.num_chunks, plan.reads_per_chunk
        );
        if let Extraction::Windows(n) = extraction {
            debug!("Extract exactly {} bases from front and end of each read.", n);
        }

        let mut reader = open_fasta(reads)?;
        let mut writers = inputs.iter().map(create_fasta).collect::<Result<Vec<_>>>()?;
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("error reading {}", reads.display()))?;
            let w = &mut writers[plan.chunk_of(i).min(plan.num_chunks - 1)];

            let name = record.name().to_str_lossy();
            let seq = record.sequence().as_ref();
            match extraction {
                Extraction::Windows(n) => {
                    let rc = rev_compl(seq);
                    w.write_record(&fasta_record(&format!("{}_front", name), &seq[..n.min(seq.len())]))?;
                    w.write_record(&fasta_record(&format!("{}_back", name), &rc[..n.min(rc.len())]))?;
                }
                Extraction::Whole => w.write_record(&fasta_record(&name, seq))?,
            }
        }
        Ok(())
    }

    /// One search per chunk on a pool of `num_workers` threads. Every chunk
    /// runs to completion before the first failure, if any, is reported.
    fn search_chunks(&self, primers: &Path, inputs: &[PathBuf], outputs: &[PathBuf]) -> Result<()> {
        info!("Start to launch {} on {} chunked reads files.", self.tool.name(), inputs.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers.min(inputs.len()))
            .build()?;

        let style = ProgressStyle::with_template(
            "[{elapsed}] {bar:40.cyan/blue} {pos:>4}/{len:4} chunks (eta: {eta})"
        )?;
        let progress_bar = ProgressBar::new(inputs.len() as u64).with_style(style);
        let results: Vec<Result<()>> = pool.install(|| {
            inputs
                .par_iter()
                .zip(outputs.par_iter())
                .map(|(input, output)| {
                    let result = self.tool.search(input, primers, output);
                    progress_bar.inc(1);
                    result
                })
                .collect()
        });
        progress_bar.finish_and_clear();
        results.into_iter().collect()
    }
}
