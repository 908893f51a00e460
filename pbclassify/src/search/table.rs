use std::fmt::Display;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ClassifyError;

/// One domain hit of a primer on a query sequence.
///
/// Coordinates are 0-based, half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub query_id: String,
    pub primer_id: String,
    pub score: f64,
    pub query_start: usize,
    pub query_end: usize,
    pub query_len: usize,
    pub primer_start: usize,
    pub primer_end: usize,
    pub primer_len: usize,
}

impl SearchHit {
    /// Parse one `--domtblout` row: the primer is the target, the read the query.
    pub fn parse_row(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 19 {
            return None;
        }
        let coord = |i: usize| fields[i].parse::<usize>().ok();
        Some(Self {
            primer_id: fields[0].to_string(),
            primer_len: coord(2)?,
            query_id: fields[3].to_string(),
            query_len: coord(5)?,
            score: fields[13].parse().ok()?,
            query_start: coord(15)?.checked_sub(1)?,
            query_end: coord(16)?,
            primer_start: coord(17)?.checked_sub(1)?,
            primer_end: coord(18)?,
        })
    }
}

/// Formats the hit as a `--domtblout` row; columns not used here are filled with placeholders.
impl Display for SearchHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} {} - {} 1e-10 {:.1} 0.0 1 1 1e-10 1e-10 {:.1} 0.0 {} {} {} {} {} {} 0.99 -",
            self.primer_id,
            self.primer_len,
            self.query_id,
            self.query_len,
            self.score,
            self.score,
            self.query_start + 1,
            self.query_end,
            self.primer_start + 1,
            self.primer_end,
            self.primer_start + 1,
            self.primer_end,
        )
    }
}

/// Iterates over the hits of a result table in file order, skipping comments.
pub struct HitReader<R> {
    lines: Lines<R>,
    path: PathBuf,
}

impl HitReader<BufReader<std::fs::File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .with_context(|| format!("cannot open search output: {}", path.as_ref().display()))?;
        Ok(Self::new(BufReader::new(file), path.as_ref()))
    }
}

impl<R: BufRead> HitReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self { lines: reader.lines(), path: path.into() }
    }
}

impl<R: BufRead> Iterator for HitReader<R> {
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(anyhow::Error::new(e).context(format!("error reading {}", self.path.display())))),
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(SearchHit::parse_row(line).ok_or_else(|| {
                ClassifyError::SearchTable { record: line.to_string(), path: self.path.clone() }.into()
            }));
        }
    }
}

pub fn read_hits<P: AsRef<Path>>(path: P) -> Result<HitReader<BufReader<std::fs::File>>> {
    HitReader::from_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
#                                                                            --- full sequence --- -------------- this domain -------------   hmm coord   ali coord   env coord
# target name        accession   tlen query name           accession   qlen   E-value  score  bias   #  of  c-Evalue  i-Evalue  score  bias  from    to  from    to  from    to  acc description of target
#------------------- ---------- ----- -------------------- ---------- ----- --------- ------ ----- --- --- --------- --------- ------ ----- ----- ----- ----- ----- ----- ----- ---- ---------------------
F0                   -             25 m1/100/0_500_front   -            100   5.1e-09   26.4   0.1   1   1   5.1e-09   5.1e-09   24.8   0.1     2    25     1    24     1    25 0.97 -
R0                   -             25 m1/100/0_500_back    -            100   1.2e-06   18.9   0.0   1   1   1.2e-06   1.2e-06   18.2   0.0     3    24     2    23     1    25 0.93 -
";

    #[test]
    fn test_parse_table() {
        let hits = HitReader::new(TABLE.as_bytes(), "test.dom").collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].primer_id, "F0");
        assert_eq!(hits[0].query_id, "m1/100/0_500_front");
        assert_eq!(hits[0].score, 24.8);
        assert_eq!((hits[0].query_start, hits[0].query_end, hits[0].query_len), (1, 25, 100));
        assert_eq!((hits[0].primer_start, hits[0].primer_end, hits[0].primer_len), (0, 24, 25));
        assert_eq!(hits[1].primer_id, "R0");
        assert_eq!(hits[1].query_start, 2);
    }

    #[test]
    fn test_display_roundtrip() {
        let hit = SearchHit {
            query_id: "m/1/ccs_back".to_string(),
            primer_id: "R1".to_string(),
            score: 30.5,
            query_start: 0,
            query_end: 20,
            query_len: 100,
            primer_start: 0,
            primer_end: 20,
            primer_len: 20,
        };
        assert_eq!(SearchHit::parse_row(&hit.to_string()), Some(hit));
    }

    #[test]
    fn test_malformed_row() {
        let err = HitReader::new("F0 - 25 read\n".as_bytes(), "bad.dom")
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassifyError>(),
            Some(ClassifyError::SearchTable { .. })
        ));
    }
}
