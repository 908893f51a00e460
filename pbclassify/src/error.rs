use std::path::PathBuf;

/// Fatal conditions raised while classifying reads.
///
/// These travel inside `anyhow::Error`; use `downcast_ref::<ClassifyError>()`
/// to tell a classification failure apart from plain I/O trouble.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported PacBio read name: {0}")]
    ReadName(String),

    #[error("unable to parse search hit '{record}' in {path}")]
    SearchTable { record: String, path: PathBuf },

    #[error("search tool '{program}' failed: {message}")]
    SearchTool { program: String, message: String },

    #[error("no full-length non-chimeric reads detected; check that the primer file matches the library")]
    NoFullLength,

    #[error("{classified} reads classified out of {total}")]
    Partition { classified: u64, total: u64 },
}

impl ClassifyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn missing_file(kind: &str, path: impl Into<PathBuf>) -> Self {
        Self::Config(format!("unable to find {} file: {}", kind, path.into().display()))
    }
}
