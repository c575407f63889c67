// imports
use crate::error::Result;

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// One line of input. Only `body` is read, any other field is ignored.
#[derive(Debug, Deserialize)]
pub struct Record {
    pub body: String,
}

pub fn parse_record(line: &str) -> Result<Record> {
    Ok(serde_json::from_str(line)?)
}

fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9 ]+").expect("constant pattern compiles"))
}

/// Lower cases the text, then removes every character outside `[A-Za-z0-9 ]`.
/// Removed characters are not replaced, so `a--b` becomes `ab`.
pub fn normalize(text: &str) -> String {
    strip_pattern().replace_all(&text.to_lowercase(), "").into_owned()
}

// defines the behavior needed for tokenizing a normalized record
pub trait Tokenizer {
    fn tokenize(&self, sequence: &str) -> Vec<String>;
}

/// Splits on every single space. Runs of spaces give empty tokens and an
/// empty text gives one empty token.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpaceTokenizer;

impl Tokenizer for SpaceTokenizer {
    fn tokenize(&self, sequence: &str) -> Vec<String> {
        sequence.split(' ').map(|x| x.to_string()).collect()
    }
}

/// The per record transformation of the corpus: parse, extract `body`,
/// normalize and split.
pub fn record_to_tokens(line: &str) -> Result<Vec<String>> {
    let record = parse_record(line)?;
    Ok(SpaceTokenizer.tokenize(&normalize(&record.body)))
}
