//! Reducers over a search result table.

use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;

use crate::error::ClassifyError;
use crate::options::ChimeraDetectionOptions;
use crate::search::{read_hits, SearchHit};

/// Hits starting further than this from the edge of the read window or the
/// primer are not edge-anchored.
pub const EDGE_TOLERANCE: usize = 48;

/// Best hit per primer, keyed by primer id.
pub type PrimerHits = IndexMap<String, SearchHit>;

/// Best edge-anchored hit per read and primer, on the front and the back window.
#[derive(Debug, Default, Clone)]
pub struct EdgeHits {
    front: IndexMap<String, PrimerHits>,
    back: IndexMap<String, PrimerHits>,
}

impl EdgeHits {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_hits(read_hits(path.as_ref())?, path)
    }

    /// Keep the highest scoring hit per (read, primer) on each side. Query ids
    /// must end with `_front` or `_back`; the suffix is stripped.
    pub fn from_hits<I, P>(hits: I, source: P) -> Result<Self>
    where
        I: IntoIterator<Item = Result<SearchHit>>,
        P: AsRef<Path>,
    {
        let mut edge_hits = Self::default();
        for hit in hits {
            let mut hit = hit?;
            if hit.query_start > EDGE_TOLERANCE || hit.primer_start > EDGE_TOLERANCE {
                continue;
            }

            let side = if let Some(id) = hit.query_id.strip_suffix("_front") {
                hit.query_id = id.to_string();
                &mut edge_hits.front
            } else if let Some(id) = hit.query_id.strip_suffix("_back") {
                hit.query_id = id.to_string();
                &mut edge_hits.back
            } else {
                return Err(ClassifyError::SearchTable {
                    record: hit.to_string(),
                    path: source.as_ref().to_path_buf(),
                }.into());
            };

            let best = side.entry(hit.query_id.clone()).or_default();
            match best.get(&hit.primer_id) {
                Some(prev) if prev.score >= hit.score => {}
                _ => {
                    best.insert(hit.primer_id.clone(), hit);
                }
            }
        }
        Ok(edge_hits)
    }

    pub fn front(&self, read_id: &str) -> Option<&PrimerHits> {
        self.front.get(read_id)
    }

    pub fn back(&self, read_id: &str) -> Option<&PrimerHits> {
        self.back.get(read_id)
    }
}

/// Hits lying inside the read body, keyed by read id. Reads without any such
/// hit are absent.
pub fn chimera_candidates<I>(hits: I, opts: &ChimeraDetectionOptions) -> Result<IndexMap<String, Vec<SearchHit>>>
where
    I: IntoIterator<Item = Result<SearchHit>>,
{
    let mut candidates: IndexMap<String, Vec<SearchHit>> = IndexMap::new();
    for hit in hits {
        let hit = hit?;
        if hit.query_start > opts.min_dist_from_end
            && hit.query_end + opts.min_dist_from_end < hit.query_len
            && hit.score > opts.min_score
        {
            candidates.entry(hit.query_id.clone()).or_default().push(hit);
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(query: &str, primer: &str, score: f64, query_start: usize, query_end: usize) -> SearchHit {
        SearchHit {
            query_id: query.to_string(),
            primer_id: primer.to_string(),
            score,
            query_start,
            query_end,
            query_len: 1000,
            primer_start: 0,
            primer_end: 20,
            primer_len: 20,
        }
    }

    #[test]
    fn test_edge_hits() {
        let mut far_primer = hit("r/1/ccs_front", "F1", 90.0, 0, 20);
        far_primer.primer_start = 49;
        let hits = vec![
            hit("r/1/ccs_front", "F0", 20.0, 0, 20),
            hit("r/1/ccs_front", "F0", 30.0, 2, 22),
            hit("r/1/ccs_front", "F0", 30.0, 4, 24),
            hit("r/1/ccs_front", "R0", 50.0, 49, 69),
            far_primer,
            hit("r/1/ccs_back", "R0", 25.0, 48, 68),
        ];
        let edge_hits = EdgeHits::from_hits(hits.into_iter().map(Ok), "front_end.dom").unwrap();

        let front = edge_hits.front("r/1/ccs").unwrap();
        assert_eq!(front.len(), 1);
        assert_eq!(front["F0"].score, 30.0);
        assert_eq!(front["F0"].query_start, 2);
        assert_eq!(front["F0"].query_id, "r/1/ccs");
        assert_eq!(edge_hits.back("r/1/ccs").unwrap()["R0"].score, 25.0);
        assert!(edge_hits.front("r/2/ccs").is_none());
    }

    #[test]
    fn test_unsuffixed_query() {
        let err = EdgeHits::from_hits(vec![Ok(hit("r/1/ccs", "F0", 20.0, 0, 20))], "front_end.dom").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassifyError>(),
            Some(ClassifyError::SearchTable { .. })
        ));
    }

    #[test]
    fn test_chimera_candidates() {
        let opts = ChimeraDetectionOptions::default();
        let hits = vec![
            hit("a", "F0", 30.0, 400, 420),
            hit("a", "R0_revcmp", 12.0, 500, 520),
            hit("a", "F0", 30.0, 100, 120),
            hit("b", "F0", 10.0, 400, 420),
            hit("c", "F0", 30.0, 0, 20),
            hit("d", "R0", 30.0, 880, 900),
            hit("d", "R0", 30.0, 880, 899),
        ];
        let candidates = chimera_candidates(hits.into_iter().map(Ok), &opts).unwrap();
        assert_eq!(candidates.keys().collect::<Vec<_>>(), vec!["a", "d"]);
        assert_eq!(candidates["a"].len(), 2);
        assert_eq!(candidates["d"].len(), 1);
        assert_eq!(candidates["d"][0].query_end, 899);
    }
}
