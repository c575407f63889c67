use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use ndarray::array;
use std::process::{Command, Output};
use word2vec_trainer::{Config, Error, Pipeline, Word2VecModel, Word2VecParams};

fn write_shard(dir: &Path, name: &str, bodies: &[&str]) {
    let lines: Vec<String> = bodies.iter().map(|body| json!({ "body": body, "score": 1 }).to_string()).collect();
    fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
}

fn job_config(input: &Path, output: &Path) -> serde_json::Value {
    json!({
        "input_pattern": format!("{}/RC_*", input.display()),
        "output_path": output.display().to_string(),
        "num_threads": 2,
        "vector_size": 10,
        "min_count": 1,
        "num_partitions": 2,
        "seed": 3
    })
}

#[test]
fn trains_and_saves_model() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let model_dir = output.path().join("model");

    write_shard(input.path(), "RC_2007-01", &["Hello, World! 123", "hello again"]);
    write_shard(input.path(), "RC_2007-02", &["a--b__c", "world of words"]);

    let params = Config::from_json(&job_config(input.path(), &model_dir)).unwrap().get_params();
    Pipeline::run(&params).unwrap();

    let model = Word2VecModel::load(&model_dir).unwrap();
    let vocabulary: HashSet<&str> = model.vocabulary().iter().map(|w| w.as_str()).collect();
    let expected: HashSet<&str> = ["hello", "world", "123", "again", "abc", "of", "words"].into_iter().collect();
    assert_eq!(vocabulary, expected);
    assert_eq!(model.vector_size(), 10);
    assert_eq!(model.params().seed, Some(3));
    assert_eq!(model.find_synonyms("hello", 3).unwrap().len(), 3);
}

#[test]
fn malformed_record_aborts_the_job() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let model_dir = output.path().join("model");

    write_shard(input.path(), "RC_2007-01", &["fine"]);
    fs::write(input.path().join("RC_2007-02"), "{\"body\": \"fine\"}\n{\"title\": \"missing body\"}\n").unwrap();

    let params = Config::from_json(&job_config(input.path(), &model_dir)).unwrap().get_params();
    match Pipeline::run(&params) {
        Err(Error::Record { path, line, .. }) => {
            assert_eq!(path, input.path().join("RC_2007-02"));
            assert_eq!(line, 2);
        },
        other => panic!("expected a record error, got {:?}", other),
    }
    assert!(!model_dir.exists());
}

#[test]
fn existing_output_is_kept() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_shard(input.path(), "RC_2007-01", &["some words here"]);

    let params = Config::from_json(&job_config(input.path(), output.path())).unwrap().get_params();
    assert!(matches!(Pipeline::run(&params), Err(Error::OutputExists(_))));
}

#[test]
fn cli_runs_a_job_from_a_config_file() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let model_dir = output.path().join("model");
    write_shard(input.path(), "RC_2008-01", &["one two three", "three two one"]);

    let config = output.path().join("job.json");
    fs::write(&config, job_config(input.path(), &model_dir).to_string()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_word2vec_trainer"))
        .arg(&config)
        .status()
        .expect("run CLI");
    assert!(status.success());
    assert!(model_dir.join("vectors.npy").exists());
    assert!(model_dir.join("words.json").exists());
    assert!(model_dir.join("params.json").exists());
}

#[test]
fn cli_fails_on_empty_corpus() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::write(input.path().join("RC_2008-01"), "").unwrap();

    let config = output.path().join("job.json");
    fs::write(&config, job_config(input.path(), &output.path().join("model")).to_string()).unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_word2vec_trainer"))
        .arg(&config)
        .output()
        .expect("run CLI");
    assert_eq!(result.status.code(), Some(1));
}

// a 2d model where "b" is next to "a" and "d" is orthogonal to both
fn save_toy_model(dir: &Path) {
    let words = ["a", "b", "c", "d"].iter().map(|w| w.to_string()).collect();
    let vectors = array![[1.0, 0.0], [0.9, 0.1], [-1.0, 0.0], [0.0, 1.0]];
    Word2VecModel::new(words, vectors, Word2VecParams::default())
        .unwrap()
        .save(dir, false)
        .unwrap();
}

fn run_similarity(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_similarity"))
        .args(args)
        .output()
        .expect("run similarity")
}

#[test]
fn similarity_cli_finds_analogies() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("model");
    save_toy_model(&model_dir);

    let quads = dir.path().join("analogies.txt");
    fs::write(&quads, "a d b d\na b zebra c\n").unwrap();

    let result = run_similarity(&["a", quads.to_str().unwrap(), model_dir.to_str().unwrap()]);
    assert!(result.status.success());
    let stdout = String::from_utf8(result.stdout).unwrap();
    // d - a + b points at d, the unknown word only skips its line
    assert!(stdout.contains("found target 'd' analogy in place 1"));
    assert_eq!(stdout.matches(" ? ").count(), 4);
}

#[test]
fn similarity_cli_lists_nearest_words() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("model");
    save_toy_model(&model_dir);

    let singles = dir.path().join("words.txt");
    fs::write(&singles, "a\nzebra\n").unwrap();

    let result = run_similarity(&["b", singles.to_str().unwrap(), model_dir.to_str().unwrap(), "2"]);
    assert!(result.status.success());
    let stdout = String::from_utf8(result.stdout).unwrap();
    assert!(stdout.contains("searching 2 most similar words to a"));
    assert!(stdout.contains("0 : a ? b"));
    assert!(stdout.contains("1 : a ? d"));
    assert!(!stdout.contains("2 : a ?"));
}

#[test]
fn similarity_cli_rejects_bad_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("model");
    save_toy_model(&model_dir);
    let singles = dir.path().join("words.txt");
    fs::write(&singles, "a\n").unwrap();
    let (input, model) = (singles.to_str().unwrap(), model_dir.to_str().unwrap());

    assert_eq!(run_similarity(&["c", input, model]).status.code(), Some(1));
    assert_eq!(run_similarity(&["b", input]).status.code(), Some(1));
    assert_eq!(run_similarity(&["b", input, model, "0"]).status.code(), Some(1));
    assert_eq!(run_similarity(&["b", input, dir.path().join("missing").to_str().unwrap()]).status.code(), Some(1));
}
