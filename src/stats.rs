// imports
use crate::dataset::Dataset;
use crate::error::Result;
use crate::tokenize::parse_record;

use serde::Serialize;
use std::fmt::Display;

/// Upper bounds (exclusive, in bytes) of the body length buckets. The last
/// bucket holds every body of at least 5000 bytes.
pub const BODY_LENGTH_BOUNDS: [usize; 6] = [10, 50, 100, 500, 1000, 5000];

/// A pass over the raw lines of the corpus: how many lines there are, how
/// many do not parse as a record, and how long the bodies are.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub lines: u64,
    pub malformed: u64,
    pub body_lengths: [u64; BODY_LENGTH_BOUNDS.len() + 1],
}

impl CorpusStats {

    /// Unlike training, a line that is not a record is counted, not fatal.
    pub fn collect(lines: &Dataset<'_, String>) -> Result<CorpusStats> {
        lines.aggregate(
            CorpusStats::default,
            |mut stats, line| {
                stats.add_line(&line);
                Ok(stats)
            },
            CorpusStats::merge,
        )
    }

    pub fn add_line(&mut self, line: &str) {
        self.lines += 1;
        match parse_record(line) {
            Ok(record) => self.body_lengths[bucket_of(record.body.len())] += 1,
            Err(_) => self.malformed += 1,
        }
    }

    pub fn merge(mut self, other: CorpusStats) -> CorpusStats {
        self.lines += other.lines;
        self.malformed += other.malformed;
        for (total, count) in self.body_lengths.iter_mut().zip(other.body_lengths) {
            *total += count;
        }
        self
    }
}

fn bucket_of(length: usize) -> usize {
    BODY_LENGTH_BOUNDS
        .iter()
        .position(|bound| length < *bound)
        .unwrap_or(BODY_LENGTH_BOUNDS.len())
}

impl Display for CorpusStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "corpus statistics:
        lines: {},
        malformed: {}", self.lines, self.malformed)?;
        for (i, count) in self.body_lengths.iter().enumerate() {
            match BODY_LENGTH_BOUNDS.get(i) {
                Some(bound) => write!(f, ",\n        body < {}: {}", bound, count)?,
                None => write!(f, ",\n        body >= {}: {}", BODY_LENGTH_BOUNDS[i - 1], count)?,
            }
        }
        Ok(())
    }
}
