use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::error::ClassifyError;

static CCS_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.+)/(\d+)/ccs").unwrap());
static BARE_CCS_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.+)/(\d+)$").unwrap());
static SUBREAD_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.+)/(\d+)/(\d+)_(\d+)").unwrap());

/// Origin of a PacBio read, decoded from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadIdentity {
    pub movie: String,
    pub well: u64,
    pub start: usize,
    pub end: usize,
    /// Circular consensus reads span the whole sequence: `[0, len)`.
    pub is_ccs: bool,
}

impl ReadIdentity {
    /// Decode `name`, trying `movie/well/ccs`, `movie/well`, then
    /// `movie/well/start_end`. The first pattern that matches wins.
    pub fn parse(name: &str, seq_len: usize) -> Result<Self> {
        let ccs = CCS_NAME.captures(name).or_else(|| BARE_CCS_NAME.captures(name));
        if let Some(caps) = ccs {
            return Ok(Self {
                movie: caps[1].to_string(),
                well: parse_int(&caps[2], name)?,
                start: 0,
                end: seq_len,
                is_ccs: true,
            });
        }
        let caps = SUBREAD_NAME
            .captures(name)
            .ok_or_else(|| ClassifyError::ReadName(name.to_string()))?;
        Ok(Self {
            movie: caps[1].to_string(),
            well: parse_int(&caps[2], name)?,
            start: parse_int(&caps[3], name)?,
            end: parse_int(&caps[4], name)?,
            is_ccs: false,
        })
    }

    /// Name of this read once clipped to `[start, end)` of the original coordinates.
    pub fn renamed(&self, start: usize, end: usize) -> String {
        format!(
            "{}/{}/{}_{}{}",
            self.movie,
            self.well,
            start,
            end,
            if self.is_ccs { "_CCS" } else { "" }
        )
    }
}

fn parse_int<T: std::str::FromStr>(digits: &str, name: &str) -> Result<T> {
    Ok(digits.parse().map_err(|_| ClassifyError::ReadName(name.to_string()))?)
}
