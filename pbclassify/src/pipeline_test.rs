//! Whole-run tests with an in-process search tool standing in for phmmer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use bstr::ByteSlice;

use crate::io::open_fasta;
use crate::search::{CachePolicy, SearchHit, SearchTool};
use crate::utils::rev_compl;
use crate::{ClassifyError, ClassifyOptions, Classifier};

const F0: &[u8] = b"AAGCAGTGGTATCAACGCAG";
const R0: &[u8] = b"GTACTCTGCGTTGATACCAC";

/// Reports every exact occurrence of a primer in a query, scoring two per base.
#[derive(Default)]
struct ExactSearch {
    calls: AtomicUsize,
}

fn fasta_entries(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut reader = open_fasta(path)?;
    reader
        .records()
        .map(|r| {
            let r = r?;
            Ok((r.name().to_str_lossy().into_owned(), r.sequence().as_ref().to_vec()))
        })
        .collect()
}

impl SearchTool for ExactSearch {
    fn name(&self) -> &str {
        "exact"
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn search(&self, query: &Path, primers: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let primers = fasta_entries(primers)?;
        let mut table = String::from("# exact matches\n");
        for (query_id, seq) in fasta_entries(query)? {
            for (primer_id, primer) in &primers {
                for pos in seq.find_iter(primer) {
                    let hit = SearchHit {
                        query_id: query_id.clone(),
                        primer_id: primer_id.clone(),
                        score: 2.0 * primer.len() as f64,
                        query_start: pos,
                        query_end: pos + primer.len(),
                        query_len: seq.len(),
                        primer_start: 0,
                        primer_end: primer.len(),
                        primer_len: primer.len(),
                    };
                    table.push_str(&format!("{}\n", hit));
                }
            }
        }
        std::fs::write(output, table)?;
        Ok(())
    }
}

/// 240 bases free of A, so neither primer orientation nor a poly-A run can occur in it.
fn insert() -> Vec<u8> {
    b"CGTTGC".repeat(40)
}

fn transcript(body: &[u8]) -> Vec<u8> {
    [F0, body, &[b'A'; 10][..], R0].concat()
}

fn chimeric_body() -> Vec<u8> {
    [&insert()[..120], F0, &insert()[..120]].concat()
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new(reads: &[(&str, Vec<u8>)]) -> Self {
        Self::with_primers(reads, F0, R0)
    }

    fn with_primers(reads: &[(&str, Vec<u8>)], forward: &[u8], reverse: &[u8]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let fasta: String = reads
            .iter()
            .map(|(name, seq)| format!(">{}\n{}\n", name, seq.to_str().unwrap()))
            .collect();
        std::fs::write(root.join("reads.fasta"), fasta).unwrap();
        std::fs::write(
            root.join("primers.fa"),
            format!(">F0\n{}\n>R0\n{}\n", forward.to_str().unwrap(), reverse.to_str().unwrap()),
        ).unwrap();
        std::fs::write(root.join("PBMATRIX.txt"), "matrix\n").unwrap();
        Self { _dir: dir, root }
    }

    fn options(&self) -> ClassifyOptions {
        ClassifyOptions::new(
            self.root.join("reads.fasta"),
            self.root.join("primers.fa"),
            self.root.join("PBMATRIX.txt"),
            self.root.join("out"),
            self.root.join("isoseq_draft.fasta"),
        ).with_num_threads(2)
    }
}

fn standard_reads() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("m/1/ccs", transcript(&insert())),
        ("m/2/ccs", transcript(&chimeric_body())),
        ("m/3/ccs", insert()),
        ("m/4/ccs", b"ACGTACGT".to_vec()),
    ]
}

#[test]
fn test_classify() {
    crate::test_log::init();
    let fixture = Fixture::new(&standard_reads());
    let tool = ExactSearch::default();
    let classifier = Classifier::new(fixture.options(), &tool);
    let summary = classifier.run().unwrap();

    assert_eq!(summary.num_reads, 4);
    assert_eq!((summary.num_5_seen, summary.num_3_seen, summary.num_polya_seen), (2, 2, 2));
    assert_eq!(summary.num_fl, 2);
    assert_eq!(summary.num_flnc, 1);
    assert_eq!(summary.num_flc, 1);
    assert_eq!(summary.num_nfl, 1);
    assert_eq!(summary.num_filtered_short_reads, 1);
    assert_eq!(summary.num_flnc_bases, 240);
    assert!(summary.check_partition().is_ok());

    let paths = classifier.paths();
    let flnc = std::fs::read_to_string(&paths.flnc).unwrap();
    let header = flnc.lines().next().unwrap();
    assert_eq!(
        header,
        ">m/1/20_260_CCS strand=+;fiveseen=1;polyAseen=1;threeseen=1;fiveend=20;polyAend=260;threeend=270;primer=0;chimera=0"
    );
    assert!(std::fs::read_to_string(&paths.flc).unwrap().starts_with(">m/2/20_280_CCS "));

    let combined = std::fs::read_to_string(&paths.out_reads).unwrap();
    let names: Vec<_> = combined
        .lines()
        .filter_map(|l| l.strip_prefix('>'))
        .map(|l| l.split(' ').next().unwrap())
        .collect();
    assert_eq!(names, vec!["m/1/20_260_CCS", "m/3/0_240_CCS"]);

    let report = std::fs::read_to_string(&paths.primer_report).unwrap();
    let rows: Vec<_> = report.lines().collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("id\tstrand\tfiveseen"));
    assert!(rows[3].starts_with("m/3/0_240_CCS\tNA\t0\t0\t0"));

    assert!(paths.summary.exists() && paths.summary_json.exists());
    assert!(!paths.primer_report_fl.exists() && !paths.primer_report_nfl.exists());
    assert!(!paths.work_dir().join("front_end.in.0").exists());
}

#[test]
fn test_reverse_strand_read() {
    let fixture = Fixture::new(&[("m/5/1000_1290", rev_compl(&transcript(&insert())))]);
    let tool = ExactSearch::default();
    let classifier = Classifier::new(fixture.options(), &tool);
    let summary = classifier.run().unwrap();
    assert_eq!(summary.num_flnc, 1);

    let flnc = std::fs::read_to_string(&classifier.paths().flnc).unwrap();
    assert!(flnc.starts_with(">m/5/1270_1030 strand=-;"));
    assert!(flnc.contains(insert().to_str().unwrap().get(..60).unwrap()));
}

#[test]
fn test_reverse_complementary_primers() {
    // The R0 library entry gains a poly-T tag, whose hit reaches into the tail.
    let forward = b"AAGCAGTGGTATCAACGCAGAGTAC";
    let reverse = rev_compl(forward);
    let read = [&forward[..], &insert(), &[b'A'; 10][..], &reverse].concat();
    let fixture = Fixture::with_primers(&[("m/1/ccs", read)], forward, &reverse);
    let tool = ExactSearch::default();
    let classifier = Classifier::new(fixture.options(), &tool);
    let summary = classifier.run().unwrap();
    assert_eq!((summary.num_fl, summary.num_flnc, summary.num_polya_seen), (1, 1, 1));

    let flnc = std::fs::read_to_string(&classifier.paths().flnc).unwrap();
    assert!(flnc.starts_with(
        ">m/1/25_265_CCS strand=+;fiveseen=1;polyAseen=1;threeseen=1;fiveend=25;polyAend=265;threeend=271;primer=0;chimera=0\n"
    ));
    assert_eq!(summary.num_flnc_bases, 240);
}

#[test]
fn test_resume() {
    let fixture = Fixture::new(&standard_reads());
    let tool = ExactSearch::default();
    let first = Classifier::new(fixture.options(), &tool).run().unwrap();
    let calls = tool.calls.load(Ordering::SeqCst);
    assert_eq!(calls, 4);

    let second = Classifier::new(fixture.options(), &tool).run().unwrap();
    assert_eq!(tool.calls.load(Ordering::SeqCst), calls);
    assert_eq!(first, second);

    let opts = fixture.options().with_cache_policy(CachePolicy::Recompute);
    let third = Classifier::new(opts, &tool).run().unwrap();
    assert_eq!(tool.calls.load(Ordering::SeqCst), 2 * calls);
    assert_eq!(first, third);
}

#[test]
fn test_no_full_length_reads() {
    let fixture = Fixture::new(&[("m/3/ccs", insert()), ("m/6/ccs", insert())]);
    let tool = ExactSearch::default();
    let err = Classifier::new(fixture.options(), &tool).run().unwrap_err();
    assert!(matches!(err.downcast_ref::<ClassifyError>(), Some(ClassifyError::NoFullLength)));
}

#[test]
fn test_missing_input() {
    let fixture = Fixture::new(&standard_reads());
    std::fs::remove_file(fixture.root.join("PBMATRIX.txt")).unwrap();
    let tool = ExactSearch::default();
    let err = Classifier::new(fixture.options(), &tool).run().unwrap_err();
    assert!(matches!(err.downcast_ref::<ClassifyError>(), Some(ClassifyError::Config(_))));
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}
