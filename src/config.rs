use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Hyperparameters of the embedding trainer. Saved next to the vectors so a
/// loaded model knows how it was built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word2VecParams {
    pub vector_size: usize,
    pub learning_rate: f32,
    pub num_partitions: usize,
    pub num_iterations: usize,
    pub min_count: usize,
    pub window_size: usize,
    pub max_sentence_length: usize,
    pub seed: Option<u64>,
}

impl Default for Word2VecParams {
    fn default() -> Self {
        Self {
            vector_size: 100,
            learning_rate: 0.025,
            num_partitions: 1,
            num_iterations: 1,
            min_count: 5,
            window_size: 5,
            max_sentence_length: 1000,
            seed: None,
        }
    }
}

impl Word2VecParams {

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("vector_size", self.vector_size),
            ("num_partitions", self.num_partitions),
            ("num_iterations", self.num_iterations),
            ("window_size", self.window_size),
            ("max_sentence_length", self.max_sentence_length),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{} must be positive", key)));
            }
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::Config(format!("learning_rate must be positive, got {}", self.learning_rate)));
        }
        Ok(())
    }
}

impl Display for Word2VecParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training hyper parameters:
        vector_size: {},
        learning_rate: {},
        num_partitions: {},
        num_iterations: {},
        min_count: {},
        window_size: {},
        max_sentence_length: {},
        seed: {:?}",
        self.vector_size, self.learning_rate, self.num_partitions, self.num_iterations,
        self.min_count, self.window_size, self.max_sentence_length, self.seed
        )
    }
}

#[derive(Clone, Debug)]
pub struct JobParams {
    pub app_name: String,
    pub input_pattern: String,
    pub output_path: PathBuf,
    pub overwrite: bool,
    pub num_threads: usize,
    pub corpus_stats: bool,
    pub train: Word2VecParams,
}

impl Display for JobParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using job params:
        app_name: {}
        input_pattern: {}
        output_path: {}
        overwrite: {}
        num_threads: {},
        corpus_stats: {},
        Using {}",
        self.app_name, self.input_pattern, self.output_path.display(), self.overwrite, self.num_threads,
        self.corpus_stats, self.train)
    }
}

pub const DEFAULT_APP_NAME: &str = "Word2Vec";
pub const DEFAULT_INPUT_PATTERN: &str = "corpus/200*/RC_*";
pub const DEFAULT_OUTPUT_PATH: &str = "output/word2vec_2007_2009";

pub struct Config {
    params: JobParams
}

impl Config {

    pub fn get_params(&self) -> JobParams {
        self.params.clone()
    }

    /// Builds the job parameters from the process arguments. Without an
    /// argument the built-in defaults are used, otherwise the single argument
    /// is a path to a json file whose keys override the defaults.
    pub fn new(args: &[String]) -> Result<Config> {

        let json = match args.len() {
            1 => Value::Object(Map::new()),
            2 => {
                let f = File::open(&args[1])
                    .map_err(|e| Error::Config(format!("cannot open {}: {}", &args[1], e)))?;
                serde_json::from_reader(BufReader::new(f))
                    .map_err(|e| Error::Config(format!("cannot parse {}: {}", &args[1], e)))?
            },
            _ => return Err(Error::Config("expected at most one argument, a path to a json file".to_string()))
        };

        Config::from_json(&json)
    }

    pub fn from_json(json: &Value) -> Result<Config> {

        if !json.is_object() {
            return Err(Error::Config("configuration must be a json object".to_string()));
        }

        let defaults = Word2VecParams::default();
        let train = Word2VecParams {
            vector_size: get_usize(json, "vector_size", defaults.vector_size)?,
            learning_rate: get_f32(json, "learning_rate", defaults.learning_rate)?,
            num_partitions: get_usize(json, "num_partitions", defaults.num_partitions)?,
            num_iterations: get_usize(json, "num_iterations", defaults.num_iterations)?,
            min_count: get_usize(json, "min_count", defaults.min_count)?,
            window_size: get_usize(json, "window_size", defaults.window_size)?,
            max_sentence_length: get_usize(json, "max_sentence_length", defaults.max_sentence_length)?,
            seed: match json.get("seed") {
                Some(Value::Null) | None => None,
                Some(seed) => Some(seed.as_u64().ok_or_else(|| not_a("seed", "non-negative integer"))?),
            },
        };
        train.validate()?;

        let params = JobParams {
            app_name: get_str(json, "app_name", DEFAULT_APP_NAME)?,
            input_pattern: get_str(json, "input_pattern", DEFAULT_INPUT_PATTERN)?,
            output_path: PathBuf::from(get_str(json, "output_path", DEFAULT_OUTPUT_PATH)?),
            overwrite: get_bool(json, "overwrite", false)?,
            num_threads: get_usize(json, "num_threads", 0)?,
            corpus_stats: get_bool(json, "corpus_stats", false)?,
            train,
        };

        Ok(Self { params })
    }
}

fn not_a(key: &str, kind: &str) -> Error {
    Error::Config(format!("given {} is not a {}", key, kind))
}

fn get_usize(json: &Value, key: &str, default: usize) -> Result<usize> {
    match json.get(key) {
        Some(value) => value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| not_a(key, "non-negative integer")),
        None => Ok(default)
    }
}

fn get_bool(json: &Value, key: &str, default: bool) -> Result<bool> {
    match json.get(key) {
        Some(value) => value.as_bool().ok_or_else(|| not_a(key, "boolean")),
        None => Ok(default)
    }
}

fn get_f32(json: &Value, key: &str, default: f32) -> Result<f32> {
    match json.get(key) {
        Some(value) => value.as_f64().map(|v| v as f32).ok_or_else(|| not_a(key, "number")),
        None => Ok(default)
    }
}

fn get_str(json: &Value, key: &str, default: &str) -> Result<String> {
    match json.get(key) {
        Some(value) => value.as_str().map(|v| v.to_owned()).ok_or_else(|| not_a(key, "string")),
        None => Ok(default.to_owned())
    }
}


pub mod files_handling {

    // reading and writing the pieces of a saved model, each piece knows its
    // own file extension and format.

    use super::Word2VecParams;
    use crate::error::Result;

    use ndarray::Array2;
    use ndarray_npy::{read_npy, write_npy};
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    pub fn read_input<R: ReadFile>(dir: &Path, file_name: &str) -> Result<<R as ReadFile>::Item> {
        <R as ReadFile>::read_file(&dir.join(file_name))
    }

    pub fn save_output<S: SaveFile>(output_dir: &Path, file_name: &str, item: &S) -> Result<()> {
        fs::create_dir_all(output_dir)?;
        item.save_file(output_dir, file_name)
    }

    fn with_extension(path: &Path, extension: &str) -> PathBuf {
        let mut path = path.as_os_str().to_owned();
        path.push(extension);
        PathBuf::from(path)
    }

    pub trait ReadFile {
        type Item;
        fn read_file(file_path: &Path) -> Result<Self::Item>;
    }

    pub trait SaveFile {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()>;
    }

    impl ReadFile for Array2<f32> {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let item = read_npy(with_extension(file_path, ".npy"))?;
            Ok(item)
        }
    }

    impl SaveFile for Array2<f32> {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
            write_npy(with_extension(&output_dir.join(file_name), ".npy"), self)?;
            Ok(())
        }
    }

    // words are kept in row order of the vectors matrix
    impl ReadFile for Vec<String> {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let f = BufReader::new(File::open(with_extension(file_path, ".json"))?);
            Ok(serde_json::from_reader(f)?)
        }
    }

    impl SaveFile for Vec<String> {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
            let mut f = BufWriter::new(File::create(with_extension(&output_dir.join(file_name), ".json"))?);
            serde_json::to_writer(&mut f, self)?;
            f.flush()?;
            Ok(())
        }
    }

    impl ReadFile for Word2VecParams {
        type Item = Self;
        fn read_file(file_path: &Path) -> Result<Self::Item> {
            let f = BufReader::new(File::open(with_extension(file_path, ".json"))?);
            Ok(serde_json::from_reader(f)?)
        }
    }

    impl SaveFile for Word2VecParams {
        fn save_file(&self, output_dir: &Path, file_name: &str) -> Result<()> {
            let mut f = BufWriter::new(File::create(with_extension(&output_dir.join(file_name), ".json"))?);
            serde_json::to_writer_pretty(&mut f, self)?;
            f.flush()?;
            Ok(())
        }
    }
}
