// imports
use crate::dataset::Dataset;
use crate::error::{Error, Result};

use std::collections::HashMap;
use tracing::info;

/// One vocabulary entry. `code` is the Huffman code of the word and `point`
/// the inner nodes visited from the root, both of the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct VocabWord {
    pub word: String,
    pub count: u64,
    pub code: Vec<u8>,
    pub point: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct Vocab {
    entries: Vec<VocabWord>,
    index: HashMap<String, usize>,
    train_words_count: u64,
    partition_records: Vec<usize>,
}

impl Vocab {

    /// Counts every token of the corpus in one parallel pass and keeps the
    /// words seen at least `min_count` times. The number of records of each
    /// partition is kept too, training uses it to deal records out.
    pub fn learn(corpus: &Dataset<'_, Vec<String>>, min_count: usize) -> Result<Vocab> {

        let partials = corpus.aggregate_partitions(
            || (0usize, HashMap::<String, u64>::new()),
            |(records, mut token2count), tokens| {
                for tok in tokens {
                    *token2count.entry(tok).or_insert(0u64) += 1;
                }
                Ok((records + 1, token2count))
            },
        )?;

        let mut partition_records = Vec::with_capacity(partials.len());
        let mut token2count = HashMap::<String, u64>::new();
        for (records, counts) in partials {
            partition_records.push(records);
            for (tok, count) in counts {
                *token2count.entry(tok).or_insert(0) += count;
            }
        }

        let records: usize = partition_records.iter().sum();
        if records == 0 {
            return Err(Error::EmptyCorpus);
        }

        let distinct = token2count.len();
        let mut vocab = Vocab::from_counts(token2count, min_count)?;
        vocab.partition_records = partition_records;
        info!(
            records,
            distinct_tokens = distinct,
            vocab_size = vocab.len(),
            train_words = vocab.train_words_count(),
            "built vocabulary"
        );
        Ok(vocab)
    }

    /// Sorted by descending count, equal counts by word, so the same counts
    /// always give the same indexes.
    pub fn from_counts(token2count: HashMap<String, u64>, min_count: usize) -> Result<Vocab> {

        let mut tup = token2count
            .into_iter()
            .filter(|(_, count)| *count >= min_count as u64)
            .collect::<Vec<(String, u64)>>();

        if tup.is_empty() {
            return Err(Error::EmptyVocabulary(min_count));
        }

        tup.sort_by(|(word_a, count_a), (word_b, count_b)| count_b.cmp(count_a).then_with(|| word_a.cmp(word_b)));

        let counts: Vec<u64> = tup.iter().map(|(_, count)| *count).collect();
        let codes = huffman_codes(&counts);

        let mut index = HashMap::with_capacity(tup.len());
        let mut entries = Vec::with_capacity(tup.len());
        for (i, ((word, count), (code, point))) in tup.into_iter().zip(codes).enumerate() {
            index.insert(word.clone(), i);
            entries.push(VocabWord { word, count, code, point });
        }

        Ok(Self {
            train_words_count: counts.iter().sum(),
            entries,
            index,
            partition_records: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn entry(&self, i: usize) -> &VocabWord {
        &self.entries[i]
    }

    pub fn words(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.word.clone()).collect()
    }

    /// Sum of the counts of the kept words.
    pub fn train_words_count(&self) -> u64 {
        self.train_words_count
    }

    /// Records per input partition, in partition order. Empty when the
    /// vocabulary was not learned from a dataset.
    pub fn partition_records(&self) -> &[usize] {
        &self.partition_records
    }
}

// picks the smallest of the two candidates: the next unused leaf (leaves are
// sorted by descending count, walked from the end) or the next inner node
fn next_min(count: &[u64], pos1: &mut isize, pos2: &mut usize) -> usize {
    if *pos1 >= 0 && count[*pos1 as usize] < count[*pos2] {
        *pos1 -= 1;
        (*pos1 + 1) as usize
    } else {
        *pos2 += 1;
        *pos2 - 1
    }
}

/// Huffman tree over counts sorted in descending order. Returns, per word,
/// its code and the inner nodes on its path (node ids in `0..n-1`, root is
/// `n-2`). A single word gets an empty code.
fn huffman_codes(counts: &[u64]) -> Vec<(Vec<u8>, Vec<usize>)> {

    let n = counts.len();
    let mut count = vec![u64::MAX; 2 * n - 1];
    count[..n].copy_from_slice(counts);
    let mut binary = vec![0u8; 2 * n - 1];
    let mut parent = vec![0usize; 2 * n - 1];

    let mut pos1 = n as isize - 1;
    let mut pos2 = n;
    for a in 0..n - 1 {
        let min1 = next_min(&count, &mut pos1, &mut pos2);
        let min2 = next_min(&count, &mut pos1, &mut pos2);
        count[n + a] = count[min1] + count[min2];
        parent[min1] = n + a;
        parent[min2] = n + a;
        binary[min2] = 1;
    }

    let root = 2 * n - 2;
    (0..n)
        .map(|a| {
            let mut code = Vec::new();
            let mut point = Vec::new();
            let mut b = a;
            while b != root {
                code.push(binary[b]);
                b = parent[b];
                point.push(b - n);
            }
            code.reverse();
            point.reverse();
            (code, point)
        })
        .collect()
}
