use crate::config::files_handling::{read_input, save_output};
use crate::config::Word2VecParams;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::vocab::Vocab;

use ndarray::prelude::*;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::iter::zip;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

// sigmoid is treated as saturated outside of (-MAX_EXP, MAX_EXP)
const MAX_EXP: f32 = 6.0;
// the learning rate is decayed every time this many words were processed
const ALPHA_UPDATE_WORDS: u64 = 10_000;

/// Skip-gram trainer with hierarchical softmax. The corpus is trained in
/// `num_partitions` partitions running side by side, each on its own copy
/// of the weights; after every iteration each touched row is replaced by
/// its average over the partitions that touched it. Records are dealt to
/// the partitions round robin over the whole corpus, so the partitions get
/// the same number of records whatever the number of shards.
pub struct Word2Vec {
    params: Word2VecParams,
}

// read-only state shared by the partitions of one iteration
struct IterationState<'a> {
    vocab: &'a Vocab,
    params: &'a Word2VecParams,
    syn0: &'a Array2<f32>,
    syn1: &'a Array2<f32>,
    seed: u64,
    iteration: usize,
    words_done: u64,
    total_words: u64,
}

// the result of one partition, its weights plus which rows it wrote to
struct PartialWeights {
    syn0: Array2<f32>,
    syn1: Array2<f32>,
    touched_syn0: Vec<bool>,
    touched_syn1: Vec<bool>,
    word_count: u64,
}

struct PartitionTrainer<'a> {
    vocab: &'a Vocab,
    params: &'a Word2VecParams,
    syn0: Array2<f32>,
    syn1: Array2<f32>,
    touched_syn0: Vec<bool>,
    touched_syn1: Vec<bool>,
    neu1e: Array1<f32>,
    rng: StdRng,
    alpha: f32,
    word_count: u64,
    last_word_count: u64,
    words_done: u64,
    total_words: u64,
}

impl<'a> PartitionTrainer<'a> {

    fn new(state: &IterationState<'a>, partition: usize) -> Self {
        let seed = state.seed ^ ((partition as u64 + 1) << 16) ^ ((state.iteration as u64) << 8);
        let mut trainer = Self {
            vocab: state.vocab,
            params: state.params,
            syn0: state.syn0.clone(),
            syn1: state.syn1.clone(),
            touched_syn0: vec![false; state.syn0.nrows()],
            touched_syn1: vec![false; state.syn1.nrows()],
            neu1e: Array1::zeros(state.params.vector_size),
            rng: StdRng::seed_from_u64(seed),
            alpha: state.params.learning_rate,
            word_count: 0,
            last_word_count: 0,
            words_done: state.words_done,
            total_words: state.total_words,
        };
        trainer.decay_alpha();
        trainer
    }

    fn decay_alpha(&mut self) {
        self.alpha = linear_alpha(
            self.params.learning_rate,
            self.params.num_partitions,
            self.word_count,
            self.words_done,
            self.total_words,
        );
    }

    fn train_record(&mut self, tokens: &[String]) {
        // out of vocabulary words are dropped before windows are taken
        let vocab = self.vocab;
        let indexes: Vec<usize> = tokens.iter().filter_map(|tok| vocab.index_of(tok)).collect();
        for sentence in indexes.chunks(self.params.max_sentence_length) {
            self.train_sentence(sentence);
        }
    }

    fn train_sentence(&mut self, sentence: &[usize]) {

        if self.word_count - self.last_word_count > ALPHA_UPDATE_WORDS {
            self.last_word_count = self.word_count;
            self.decay_alpha();
        }
        self.word_count += sentence.len() as u64;

        let window = self.params.window_size as isize;
        let n = sentence.len() as isize;
        for (pos, &word) in sentence.iter().enumerate() {
            let b = self.rng.gen_range(0..window);
            for a in b..(window * 2 + 1 - b) {
                if a == window {
                    continue;
                }
                let c = pos as isize - window + a;
                if c < 0 || c >= n {
                    continue;
                }
                self.train_pair(sentence[c as usize], word);
            }
        }
    }

    // predicts `word` from the input vector of `context`
    fn train_pair(&mut self, context: usize, word: usize) {

        let vocab = self.vocab;
        let entry = vocab.entry(word);
        if entry.code.is_empty() {
            return;
        }

        self.neu1e.fill(0.0);
        for (&code, &node) in zip(&entry.code, &entry.point) {
            let f = self.syn0.row(context).dot(&self.syn1.row(node));
            if f <= -MAX_EXP || f >= MAX_EXP {
                continue;
            }
            let f = 1.0 / (1.0 + (-f).exp());
            let g = (1.0 - code as f32 - f) * self.alpha;
            self.neu1e.scaled_add(g, &self.syn1.row(node));
            self.syn1.row_mut(node).scaled_add(g, &self.syn0.row(context));
            self.touched_syn1[node] = true;
        }
        self.syn0.row_mut(context).scaled_add(1.0, &self.neu1e);
        self.touched_syn0[context] = true;
    }

    fn finish(self) -> PartialWeights {
        PartialWeights {
            syn0: self.syn0,
            syn1: self.syn1,
            touched_syn0: self.touched_syn0,
            touched_syn1: self.touched_syn1,
            word_count: self.word_count,
        }
    }
}

// linear decay over all the words of all iterations, floored at 1e-4 of the
// initial rate. The words of the other partitions are estimated from this
// one's progress, which holds as long as partitions are balanced.
fn linear_alpha(learning_rate: f32, num_partitions: usize, word_count: u64, words_done: u64, total_words: u64) -> f32 {
    let progress = (num_partitions as u64 * word_count + words_done) as f64 / total_words as f64;
    let alpha = ((learning_rate as f64) * (1.0 - progress)) as f32;
    alpha.max(learning_rate * 0.0001)
}

// rows touched by at least one partition become the mean of those partitions
fn average_touched<'p, I>(target: &mut Array2<f32>, partials: I)
where
    I: Iterator<Item = (&'p Array2<f32>, &'p [bool])> + Clone,
{
    for row in 0..target.nrows() {
        let mut hits = 0usize;
        for (weights, touched) in partials.clone() {
            if !touched[row] {
                continue;
            }
            if hits == 0 {
                target.row_mut(row).assign(&weights.row(row));
            } else {
                target.row_mut(row).scaled_add(1.0, &weights.row(row));
            }
            hits += 1;
        }
        if hits > 1 {
            target.row_mut(row).mapv_inplace(|x| x / hits as f32);
        }
    }
}

impl Word2Vec {

    pub fn new(params: Word2VecParams) -> Word2Vec {
        Self { params }
    }

    pub fn params(&self) -> &Word2VecParams {
        &self.params
    }

    // record `i` of the corpus, counted across shards in order, belongs to
    // partition `i % num_partitions`
    fn train_partition(corpus: &Dataset<'_, Vec<String>>, state: &IterationState<'_>, partition: usize) -> Result<PartialWeights> {

        let mut trainer = PartitionTrainer::new(state, partition);
        let stride = state.params.num_partitions;
        let mut offset = 0usize;
        for shard in 0..corpus.num_partitions() {
            let first = offset;
            trainer = corpus.fold_partition_where(
                shard,
                |line| (first + line) % stride == partition,
                trainer,
                |mut trainer, tokens| {
                    trainer.train_record(&tokens);
                    Ok(trainer)
                },
            )?;
            offset += state.vocab.partition_records().get(shard).copied().unwrap_or(0);
        }

        debug!(partition, iteration = state.iteration, words = trainer.word_count, "finished partition");
        Ok(trainer.finish())
    }

    /// Learns the vocabulary of `corpus`, then trains the vectors. Reads the
    /// corpus once for counting and once per iteration for training.
    pub fn fit(&self, corpus: &Dataset<'_, Vec<String>>) -> Result<Word2VecModel> {

        self.params.validate()?;
        let params = &self.params;
        let seed = params.seed.unwrap_or_else(|| thread_rng().gen());

        let timer = Instant::now();
        let vocab = Vocab::learn(corpus, params.min_count)?;
        info!("finished vocab creation, took {} seconds ...", timer.elapsed().as_secs());

        let vocab_size = vocab.len();
        let dim = params.vector_size;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut syn0: Array2<f32> = Array2::random_using((vocab_size, dim), Uniform::new(-0.5f32, 0.5f32), &mut rng) / dim as f32;
        let mut syn1: Array2<f32> = Array2::zeros((vocab_size - 1, dim));

        let total_words = params.num_iterations as u64 * vocab.train_words_count() + 1;
        let mut words_done = 0u64;

        for iteration in 1..=params.num_iterations {

            let timer = Instant::now();
            let state = IterationState {
                vocab: &vocab,
                params,
                syn0: &syn0,
                syn1: &syn1,
                seed,
                iteration,
                words_done,
                total_words,
            };

            let partials = corpus.context().install(|| {
                (0..params.num_partitions)
                    .into_par_iter()
                    .map(|partition| Word2Vec::train_partition(corpus, &state, partition))
                    .collect::<Result<Vec<PartialWeights>>>()
            })?;

            let iteration_words: u64 = partials.iter().map(|p| p.word_count).sum();
            words_done += iteration_words;

            average_touched(&mut syn0, partials.iter().map(|p| (&p.syn0, p.touched_syn0.as_slice())));
            average_touched(&mut syn1, partials.iter().map(|p| (&p.syn1, p.touched_syn1.as_slice())));

            info!(
                "finished iteration {} / {}, {} words, took {} seconds ...",
                iteration, params.num_iterations, iteration_words, timer.elapsed().as_secs()
            );
        }

        let trained_with = Word2VecParams { seed: Some(seed), ..params.clone() };
        Word2VecModel::new(vocab.words(), syn0, trained_with)
    }
}

/// Trained vectors, one row per vocabulary word.
#[derive(Clone, Debug)]
pub struct Word2VecModel {
    words: Vec<String>,
    word_index: HashMap<String, usize>,
    vectors: Array2<f32>,
    params: Word2VecParams,
}

const VECTORS_FILE: &str = "vectors";
const WORDS_FILE: &str = "words";
const PARAMS_FILE: &str = "params";

impl Word2VecModel {

    pub fn new(words: Vec<String>, vectors: Array2<f32>, params: Word2VecParams) -> Result<Word2VecModel> {

        if words.len() != vectors.nrows() {
            return Err(Error::Shape(format!("{} words for {} vectors", words.len(), vectors.nrows())));
        }

        let mut word_index = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            word_index.entry(word.to_owned()).or_insert(i);
        }

        Ok(Self { words, word_index, vectors, params })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn vector_size(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    pub fn params(&self) -> &Word2VecParams {
        &self.params
    }

    pub fn transform(&self, word: &str) -> Result<Array1<f32>> {
        match self.word_index.get(word) {
            Some(i) => Ok(self.vectors.row(*i).to_owned()),
            None => Err(Error::UnknownWord(word.to_owned()))
        }
    }

    /// The `num` words closest to `word` by cosine similarity, the word
    /// itself excluded, most similar first.
    pub fn find_synonyms(&self, word: &str, num: usize) -> Result<Vec<(String, f32)>> {
        let vec = self.transform(word)?;
        self.most_similar(&vec, num, Some(word))
    }

    pub fn find_synonyms_by_vector(&self, vec: &Array1<f32>, num: usize) -> Result<Vec<(String, f32)>> {
        self.most_similar(vec, num, None)
    }

    /// `b - a + c` for `[a, b, c]`, read as "a is to b as c is to ?".
    pub fn analogy_vector(&self, inputs: [&str; 3]) -> Result<Array1<f32>> {
        let [a, b, c] = inputs;
        Ok(self.transform(b)? - self.transform(a)? + self.transform(c)?)
    }

    fn most_similar(&self, vec: &Array1<f32>, num: usize, exclude: Option<&str>) -> Result<Vec<(String, f32)>> {

        if vec.len() != self.vector_size() {
            return Err(Error::Shape(format!("query has {} dimensions, model has {}", vec.len(), self.vector_size())));
        }

        let norm = |v: ArrayView1<f32>| v.dot(&v).sqrt();
        let query_norm = norm(vec.view());

        // cosine of every row with the query, zero vectors score 0
        let scores = self.vectors.dot(vec);
        let mut indexed_scores: Vec<(usize, f32)> = scores
            .iter()
            .enumerate()
            .map(|(i, dot)| {
                let denom = query_norm * norm(self.vectors.row(i));
                (i, if denom > 0.0 { dot / denom } else { 0.0 })
            })
            .collect();

        // sort by most similar in descending order
        indexed_scores.sort_by(|(_, s), (_, t)| t.total_cmp(s));

        Ok(indexed_scores
            .into_iter()
            .map(|(i, score)| (self.words[i].clone(), score))
            .filter(|(word, _)| Some(word.as_str()) != exclude)
            .take(num)
            .collect())
    }

    /// Writes `vectors.npy`, `words.json` and `params.json` into `dir`. An
    /// existing `dir` is only replaced when `overwrite` is set.
    ///
    /// The files are written to a staging directory next to `dir` which is
    /// renamed into place once complete, so a failed save leaves no partial
    /// model behind.
    pub fn save(&self, dir: &Path, overwrite: bool) -> Result<()> {

        if dir.exists() && !overwrite {
            return Err(Error::OutputExists(dir.to_path_buf()));
        }

        let parent = match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // removed on drop unless renamed away
        let staging = tempfile::Builder::new().prefix(".word2vec-").tempdir_in(parent)?;
        save_output(staging.path(), VECTORS_FILE, &self.vectors)?;
        save_output(staging.path(), WORDS_FILE, &self.words)?;
        save_output(staging.path(), PARAMS_FILE, &self.params)?;

        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::rename(staging.path(), dir)?;

        info!(path = %dir.display(), words = self.len(), "saved model");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Word2VecModel> {
        let vectors = read_input::<Array2<f32>>(dir, VECTORS_FILE)?;
        let words = read_input::<Vec<String>>(dir, WORDS_FILE)?;
        let params = read_input::<Word2VecParams>(dir, PARAMS_FILE)?;
        Word2VecModel::new(words, vectors, params)
    }
}
