use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("cannot list input files: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("no input files match `{0}`")]
    NoInput(String),

    // wraps any failure raised while evaluating one line of a shard
    #[error("{}:{}: {}", .path.display(), .line, .source)]
    Record {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("corpus contains no records")]
    EmptyCorpus,

    #[error("vocabulary is empty, no word appears at least {0} times (check min_count)")]
    EmptyVocabulary(usize),

    #[error("word `{0}` is not in the vocabulary")]
    UnknownWord(String),

    #[error("output path {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("cannot read vectors: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("cannot write vectors: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("inconsistent model shape: {0}")]
    Shape(String),
}
