use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::error::ClassifyError;

#[derive(Debug, Default, Clone)]
pub struct Metrics(BTreeMap<String, f64>);

impl Deref for Metrics {
    type Target = BTreeMap<String, f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Metrics {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.0 {
            writeln!(f, "{}\t{}", key, value)?;
        }
        Ok(())
    }
}

impl Metrics {
    /// Write the metrics as a flat JSON object. Non-finite values become 0.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let metrics: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(key, value)| {
                let value = serde_json::Number::from_f64(*value).unwrap_or(serde_json::Number::from(0));
                (key.clone(), serde_json::Value::Number(value))
            })
            .collect();
        let file = std::fs::File::create(path.as_ref())
            .with_context(|| format!("cannot create file: {}", path.as_ref().display()))?;
        serde_json::to_writer_pretty(file, &metrics)?;
        Ok(())
    }
}

/// Read counts accumulated over a classification run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassifySummary {
    pub num_reads: u64,
    pub num_5_seen: u64,
    pub num_3_seen: u64,
    pub num_polya_seen: u64,
    pub num_filtered_short_reads: u64,
    pub num_nfl: u64,
    pub num_fl: u64, // full-length reads before chimera detection
    pub num_flnc: u64,
    pub num_flc: u64,
    pub num_flnc_bases: u64,
}

impl ClassifySummary {
    pub fn merge(&mut self, other: &Self) {
        self.num_reads += other.num_reads;
        self.num_5_seen += other.num_5_seen;
        self.num_3_seen += other.num_3_seen;
        self.num_polya_seen += other.num_polya_seen;
        self.num_filtered_short_reads += other.num_filtered_short_reads;
        self.num_nfl += other.num_nfl;
        self.num_fl += other.num_fl;
        self.num_flnc += other.num_flnc;
        self.num_flc += other.num_flc;
        self.num_flnc_bases += other.num_flnc_bases;
    }

    /// Every read ends up filtered, non-full-length, chimeric or non-chimeric full-length.
    pub fn check_partition(&self) -> Result<(), ClassifyError> {
        let classified = self.num_filtered_short_reads + self.num_nfl + self.num_flc + self.num_flnc;
        if classified != self.num_reads {
            return Err(ClassifyError::Partition { classified, total: self.num_reads });
        }
        Ok(())
    }

    pub fn avg_flnc_len(&self) -> Option<f64> {
        (self.num_flnc > 0).then(|| self.num_flnc_bases as f64 / self.num_flnc as f64)
    }

    pub fn report(&self, metric: &mut Metrics) {
        metric.insert("num_reads".to_string(), self.num_reads as f64);
        metric.insert("num_5_seen".to_string(), self.num_5_seen as f64);
        metric.insert("num_3_seen".to_string(), self.num_3_seen as f64);
        metric.insert("num_polya_seen".to_string(), self.num_polya_seen as f64);
        metric.insert("num_filtered_short_reads".to_string(), self.num_filtered_short_reads as f64);
        metric.insert("num_nfl".to_string(), self.num_nfl as f64);
        metric.insert("num_fl".to_string(), self.num_fl as f64);
        metric.insert("num_flnc".to_string(), self.num_flnc as f64);
        metric.insert("num_flc".to_string(), self.num_flc as f64);
        metric.insert("num_flnc_bases".to_string(), self.num_flnc_bases as f64);
        if let Some(avg) = self.avg_flnc_len() {
            metric.insert("avg_flnc_len".to_string(), avg);
        }
        if self.num_reads > 0 {
            metric.insert("frac_flnc".to_string(), self.num_flnc as f64 / self.num_reads as f64);
        }
    }

    /// The plain text summary, one `key=value` line per count.
    pub fn to_text(&self) -> Result<String> {
        let avg = self.avg_flnc_len().ok_or(ClassifyError::NoFullLength)?;
        Ok([
            format!("Number of reads of insert={}", self.num_reads),
            format!("Number of five prime reads={}", self.num_5_seen),
            format!("Number of three prime reads={}", self.num_3_seen),
            format!("Number of poly-A reads={}", self.num_polya_seen),
            format!("Number of filtered short reads={}", self.num_filtered_short_reads),
            format!("Number of non-full-length reads={}", self.num_nfl),
            format!("Number of full-length reads={}", self.num_fl),
            format!("Number of full-length non-chimeric reads={}", self.num_flnc),
            format!("Number of full-length chimeric reads={}", self.num_flc),
            format!("Average full-length non-chimeric read length={:.0}", avg),
        ].join("\n") + "\n")
    }

    /// Write the text summary and a JSON copy of the metrics next to it.
    pub fn write<P: AsRef<Path>, Q: AsRef<Path>>(&self, text: P, json: Q) -> Result<()> {
        let content = self.to_text()?;
        let mut file = std::fs::File::create(text.as_ref())
            .with_context(|| format!("cannot create file: {}", text.as_ref().display()))?;
        file.write_all(content.as_bytes())?;

        let mut metrics = Metrics::default();
        self.report(&mut metrics);
        metrics.write_json(json.as_ref())?;
        info!("Classification summary:\n{}", metrics);
        Ok(())
    }
}
