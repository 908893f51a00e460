use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use anyhow::{Context, Result, anyhow};
use log::debug;
use noodles::fasta;

pub type FastaReader = fasta::io::Reader<Box<dyn BufRead + Send>>;
pub type FastaWriter = fasta::io::Writer<Box<dyn Write + Send>>;

/// Open a file, possibly compressed. Supports gzip and zstd.
pub fn open_file<P: AsRef<Path>>(file: P) -> Result<Box<dyn std::io::Read + Send>> {
    let path = file.as_ref();
    let inner = File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;
    let reader: Box<dyn std::io::Read + Send> = match detect_compression(path)? {
        Some(Compression::Gzip) => Box::new(flate2::read::MultiGzDecoder::new(inner)),
        Some(Compression::Zstd) => Box::new(zstd::stream::read::Decoder::new(inner)?),
        None => Box::new(inner),
    };
    Ok(reader)
}

/// Determine the file compression type. Supports gzip and zstd.
fn detect_compression<P: AsRef<Path>>(file: P) -> Result<Option<Compression>> {
    let path = file.as_ref();
    let inner = File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;
    let compression = if flate2::read::MultiGzDecoder::new(inner).header().is_some() {
        Some(Compression::Gzip)
    } else if path.extension().is_some_and(|ext| ext == "zst") {
        Some(Compression::Zstd)
    } else {
        None
    };
    Ok(compression)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
}

impl TryFrom<&PathBuf> for Compression {
    type Error = anyhow::Error;

    fn try_from(path: &PathBuf) -> Result<Self> {
        let ext = path.extension().unwrap_or(std::ffi::OsStr::new(""));
        if ext == "gz" {
            Ok(Compression::Gzip)
        } else if ext == "zst" {
            Ok(Compression::Zstd)
        } else {
            Err(anyhow!("unsupported compression: {:?}", path))
        }
    }
}

pub fn create_file<P: AsRef<Path>>(
    filename: P,
    compression: Option<Compression>,
    compression_level: Option<u32>,
) -> Result<Box<dyn Write + Send>> {
    let buffer = BufWriter::new(
        File::create(&filename).with_context(|| format!("cannot create file: {}", filename.as_ref().display()))?
    );
    let writer: Box<dyn Write + Send> = match compression {
        None => Box::new(buffer),
        Some(Compression::Gzip) => Box::new(flate2::write::GzEncoder::new(buffer, flate2::Compression::new(compression_level.unwrap_or(6)))),
        Some(Compression::Zstd) => {
            let zstd = zstd::stream::Encoder::new(buffer, compression_level.unwrap_or(9) as i32)?;
            Box::new(zstd.auto_finish())
        },
    };
    Ok(writer)
}

/// Open a FASTA file for sequential reading.
pub fn open_fasta<P: AsRef<Path>>(path: P) -> Result<FastaReader> {
    let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(open_file(path)?));
    Ok(fasta::io::Reader::new(reader))
}

/// Create an uncompressed FASTA file; a `.gz`/`.zst` extension selects compression.
pub fn create_fasta<P: AsRef<Path>>(path: P) -> Result<FastaWriter> {
    let compression = Compression::try_from(&path.as_ref().to_path_buf()).ok();
    Ok(fasta::io::Writer::new(create_file(path, compression, None)?))
}

/// Build a FASTA record whose definition line is `header` verbatim.
pub fn fasta_record(header: &str, sequence: &[u8]) -> fasta::Record {
    let (name, description) = match header.split_once(' ') {
        Some((name, desc)) => (name, Some(desc.to_string().into())),
        None => (header, None),
    };
    fasta::Record::new(
        fasta::record::Definition::new(name.to_string(), description),
        fasta::record::Sequence::from(sequence.to_vec()),
    )
}

/// Count the records of a FASTA file by streaming over its definition lines.
pub fn count_fasta_records<P: AsRef<Path>>(path: P) -> Result<usize> {
    let reader = BufReader::new(open_file(path.as_ref())?);
    let mut n = 0;
    for line in reader.split(b'\n') {
        let line = line.with_context(|| format!("error reading file {}", path.as_ref().display()))?;
        if line.first() == Some(&b'>') {
            n += 1;
        }
    }
    Ok(n)
}

/// Concatenate `src` files, in order, into `dst`.
pub fn cat_files<P: AsRef<Path>, Q: AsRef<Path>>(src: &[P], dst: Q) -> Result<()> {
    let mut writer = BufWriter::new(
        File::create(dst.as_ref()).with_context(|| format!("cannot create file: {}", dst.as_ref().display()))?
    );
    for file in src {
        let mut reader = File::open(file.as_ref())
            .with_context(|| format!("cannot open file: {}", file.as_ref().display()))?;
        std::io::copy(&mut reader, &mut writer)
            .with_context(|| format!("error concatenating {} to {}", file.as_ref().display(), dst.as_ref().display()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Remove files in the list if they exist.
pub fn remove_files<P: AsRef<Path>>(files: &[P]) -> Result<()> {
    for file in files {
        let file = file.as_ref();
        if file.exists() {
            debug!("Removing {}", file.display());
            std::fs::remove_file(file).with_context(|| format!("cannot remove file: {}", file.display()))?;
        }
    }
    Ok(())
}
