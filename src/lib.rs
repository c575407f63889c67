mod config;
mod context;
mod dataset;
mod error;
mod pipeline;
mod stats;
mod tokenize;
mod vocab;
mod word2vec;

pub use config::{files_handling, Config, JobParams, Word2VecParams};
pub use context::ExecutionContext;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use stats::{CorpusStats, BODY_LENGTH_BOUNDS};
pub use tokenize::{normalize, parse_record, record_to_tokens, Record, SpaceTokenizer, Tokenizer};
pub use vocab::{Vocab, VocabWord};
pub use word2vec::{Word2Vec, Word2VecModel};
