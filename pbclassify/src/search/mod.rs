//! The external profile search: invocation, result table and chunked fan-out.

mod chunk;
mod table;

pub use chunk::{ChunkPlan, ChunkedSearch, Extraction};
pub use table::{read_hits, HitReader, SearchHit};

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Result;
use log::{debug, info};

use crate::error::ClassifyError;

/// A scored-alignment oracle searching every query sequence against a primer library.
pub trait SearchTool: Sync {
    /// Program name, used in logs and errors.
    fn name(&self) -> &str;

    /// Verify the tool can be invoked at all.
    fn check(&self) -> Result<()>;

    /// Search `query` against `primers` and write the hit table to `output`.
    fn search(&self, query: &Path, primers: &Path, output: &Path) -> Result<()>;
}

/// HMMER's `phmmer`, writing per-domain hit tables.
#[derive(Debug, Clone)]
pub struct Phmmer {
    program: String,
    matrix: PathBuf,
    gap_open: f64,
    gap_extend: f64,
}

impl Phmmer {
    pub fn new(matrix: impl Into<PathBuf>) -> Self {
        Self {
            program: "phmmer".to_string(),
            matrix: matrix.into(),
            gap_open: 0.07,
            gap_extend: 0.07,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, query: &Path, primers: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--domtblout").arg(output)
            .arg("--noali")
            .args(["--domE", "1"])
            .arg("--mxfile").arg(&self.matrix)
            .arg("--popen").arg(self.gap_open.to_string())
            .arg("--pextend").arg(self.gap_extend.to_string())
            .arg(query)
            .arg(primers);
        cmd
    }
}

impl SearchTool for Phmmer {
    fn name(&self) -> &str {
        &self.program
    }

    fn check(&self) -> Result<()> {
        info!("Checking for {} existence.", self.program);
        let status = Command::new(&self.program)
            .arg("-h")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ClassifyError::SearchTool {
                program: self.program.clone(),
                message: format!("unable to invoke: {}", e),
            })?;
        if !status.success() {
            return Err(ClassifyError::SearchTool {
                program: self.program.clone(),
                message: format!("unable to invoke: exited with {}", status),
            }.into());
        }
        Ok(())
    }

    fn search(&self, query: &Path, primers: &Path, output: &Path) -> Result<()> {
        let mut cmd = self.command(query, primers, output);
        debug!("Calling {}: {:?}", self.program, cmd);
        let result = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ClassifyError::SearchTool {
                program: self.program.clone(),
                message: e.to_string(),
            })?;
        if !result.status.success() {
            return Err(ClassifyError::SearchTool {
                program: self.program.clone(),
                message: format!(
                    "{} on {}: {}",
                    result.status,
                    query.display(),
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            }.into());
        }
        Ok(())
    }
}

/// Decides whether a phase's combined search output from an earlier run is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Skip the search when the combined output file already exists.
    #[default]
    ReuseExisting,
    /// Always search again, overwriting earlier output.
    Recompute,
}

impl CachePolicy {
    pub fn is_cached(&self, combined: &Path) -> bool {
        match self {
            CachePolicy::ReuseExisting => combined.exists(),
            CachePolicy::Recompute => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phmmer_command() {
        let phmmer = Phmmer::new("/data/PBMATRIX.txt");
        let cmd = phmmer.command(Path::new("in.fa"), Path::new("primers.fa"), Path::new("out.dom"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "phmmer");
        assert_eq!(
            args,
            vec![
                "--domtblout", "out.dom", "--noali", "--domE", "1",
                "--mxfile", "/data/PBMATRIX.txt", "--popen", "0.07", "--pextend", "0.07",
                "in.fa", "primers.fa",
            ]
        );
    }

    #[test]
    fn test_missing_program() {
        let phmmer = Phmmer::new("PBMATRIX.txt").with_program("surely-not-an-installed-search-tool");
        let err = phmmer.check().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassifyError>(),
            Some(ClassifyError::SearchTool { .. })
        ));
    }

    #[test]
    fn test_cache_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hmmer.front_end.dom");
        assert!(!CachePolicy::ReuseExisting.is_cached(&path));
        std::fs::write(&path, "").unwrap();
        assert!(CachePolicy::ReuseExisting.is_cached(&path));
        assert!(!CachePolicy::Recompute.is_cached(&path));
    }
}
