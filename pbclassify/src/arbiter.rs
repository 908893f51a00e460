//! Choice of the primer combo and strand explaining a read's edge hits.

use std::ops::Range;

use log::debug;

use crate::annotation::Strand;
use crate::hits::PrimerHits;
use crate::search::SearchHit;

/// Combo and strand assigned to one read. `front_hit` is the 5' primer hit
/// and `back_hit` the 3' primer hit, each in the oriented read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimerComboDecision {
    pub combo: Option<usize>,
    pub strand: Option<Strand>,
    pub front_hit: Option<SearchHit>,
    pub back_hit: Option<SearchHit>,
}

impl PrimerComboDecision {
    pub fn has_primer_evidence(&self) -> bool {
        self.front_hit.is_some() || self.back_hit.is_some()
    }
}

fn score_of(hits: Option<&PrimerHits>, primer: &str) -> f64 {
    hits.and_then(|h| h.get(primer)).map_or(0.0, |h| h.score)
}

fn confirmed(hits: Option<&PrimerHits>, primer: &str, min_score: f64) -> Option<SearchHit> {
    hits.and_then(|h| h.get(primer))
        .filter(|h| h.score >= min_score)
        .cloned()
}

/// Pick the combo and strand with the highest summed front and back score.
///
/// Combos are scanned in index order, `+` before `-`, and the first maximum
/// wins. The hits of the winner are then kept only if they individually
/// reach `min_score`.
pub fn pick_best_combo(
    front: Option<&PrimerHits>,
    back: Option<&PrimerHits>,
    combos: Range<usize>,
    min_score: f64,
) -> PrimerComboDecision {
    let mut best: Option<(usize, Strand, f64)> = None;
    for i in combos {
        let (fw, rv) = (format!("F{}", i), format!("R{}", i));
        let plus = score_of(front, &fw) + score_of(back, &rv);
        let minus = score_of(front, &rv) + score_of(back, &fw);
        for (strand, score) in [(Strand::Forward, plus), (Strand::Reverse, minus)] {
            if best.is_none_or(|(_, _, s)| score > s) {
                best = Some((i, strand, score));
            }
        }
    }

    let Some((combo, strand, score)) = best else {
        return PrimerComboDecision::default();
    };
    debug!("best combo {} on strand {} with score {}", combo, strand, score);
    let (fw, rv) = (format!("F{}", combo), format!("R{}", combo));
    let (front_hit, back_hit) = match strand {
        Strand::Forward => (confirmed(front, &fw, min_score), confirmed(back, &rv, min_score)),
        Strand::Reverse => (confirmed(back, &fw, min_score), confirmed(front, &rv, min_score)),
    };
    PrimerComboDecision { combo: Some(combo), strand: Some(strand), front_hit, back_hit }
}
