use std::fmt::Display;

use itertools::Itertools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Classification of one read. Offsets are in the oriented read before
/// trimming: `five_end` is where the 5' primer ends, `poly_a_end` where the
/// poly-A tail starts and `three_end` where the 3' primer starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAnnotation {
    pub id: String,
    pub strand: Option<Strand>,
    pub five_end: Option<usize>,
    pub poly_a_end: Option<usize>,
    pub three_end: Option<usize>,
    pub primer: Option<usize>,
    pub chimera: Option<bool>,
    pub ignore_poly_a: bool,
}

impl ReadAnnotation {
    /// A read without any primer evidence.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            strand: None,
            five_end: None,
            poly_a_end: None,
            three_end: None,
            primer: None,
            chimera: None,
            ignore_poly_a: false,
        }
    }

    pub fn field_names() -> &'static [&'static str] {
        &[
            "id", "strand", "fiveseen", "polyAseen", "threeseen",
            "fiveend", "polyAend", "threeend", "primer", "chimera",
        ]
    }

    pub fn five_seen(&self) -> bool {
        self.five_end.is_some()
    }

    pub fn poly_a_seen(&self) -> bool {
        self.poly_a_end.is_some()
    }

    pub fn three_seen(&self) -> bool {
        self.three_end.is_some()
    }

    pub fn is_full_length(&self) -> bool {
        self.five_seen() && self.three_seen() && (self.ignore_poly_a || self.poly_a_seen())
    }

    /// FASTA header: the id followed by `key=value` pairs for the known fields.
    pub fn to_header(&self) -> String {
        let seen = [
            ("fiveseen", self.five_seen()),
            ("polyAseen", self.poly_a_seen()),
            ("threeseen", self.three_seen()),
        ];
        let offsets = [
            ("fiveend", self.five_end),
            ("polyAend", self.poly_a_end),
            ("threeend", self.three_end),
            ("primer", self.primer),
        ];
        let fields = self.strand
            .map(|s| format!("strand={}", s))
            .into_iter()
            .chain(seen.into_iter().map(|(k, v)| format!("{}={}", k, v as u8)))
            .chain(offsets.into_iter().filter_map(|(k, v)| v.map(|v| format!("{}={}", k, v))))
            .chain(self.chimera.map(|c| format!("chimera={}", c as u8)))
            .join(";");
        format!("{} {}", self.id, fields)
    }

    /// Tab separated row in the order of [`ReadAnnotation::field_names`], `NA` for unknown values.
    pub fn to_report_row(&self) -> String {
        let na = |x: Option<String>| x.unwrap_or_else(|| "NA".to_string());
        [
            self.id.clone(),
            na(self.strand.map(|s| s.to_string())),
            (self.five_seen() as u8).to_string(),
            (self.poly_a_seen() as u8).to_string(),
            (self.three_seen() as u8).to_string(),
            na(self.five_end.map(|x| x.to_string())),
            na(self.poly_a_end.map(|x| x.to_string())),
            na(self.three_end.map(|x| x.to_string())),
            na(self.primer.map(|x| x.to_string())),
            na(self.chimera.map(|x| (x as u8).to_string())),
        ].join("\t")
    }

    pub fn report_header() -> String {
        Self::field_names().join("\t")
    }
}
