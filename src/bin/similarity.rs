use std::env;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::process;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use word2vec_trainer::{Error, Result, Word2VecModel};

// some checks on trained vectors:
// the K most similar words to a given word.
// the K most similar words to a combination of words (analogies).
// built as its own binary so it can run apart from training

// results per query when no count is given
const DEFAULT_K: usize = 10;

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // arguments to this executable should be:
    // a letter selector: "a" for analogies, "b" for word similarity
    // path to input based on selector (quads or singles)
    // path to a saved model directory
    // optionally, how many words to print per query
    // example: ... a Input/analogies.txt output/word2vec_2007_2009 5
    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {

    if args.len() != 4 && args.len() != 5 {
        return Err(Error::Config("expected: <a|b> <input file> <model dir> [k]".to_string()));
    }
    if args[1] != "a" && args[1] != "b" {
        return Err(Error::Config(format!("unrecognized selector {}", args[1])));
    }

    let k = match args.get(4) {
        Some(k) => k
            .parse::<usize>()
            .ok()
            .filter(|k| *k > 0)
            .ok_or_else(|| Error::Config(format!("k must be a positive integer, got {}", k)))?,
        None => DEFAULT_K
    };

    let lines = io::BufReader::new(File::open(&args[2])?)
        .lines()
        .collect::<io::Result<Vec<String>>>()?;
    let model = Word2VecModel::load(Path::new(&args[3]))?;

    match args[1].as_str() {
        // each line holds a quartet separated by spaces, e.g: king queen man woman
        "a" => {
            let inputs = lines
                .iter()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.split(' ').map(|x| x.to_string()).collect::<Vec<String>>())
                .collect::<Vec<Vec<String>>>();
            run_analogies(&inputs, k, &model)
        },
        // one token per line
        "b" => run_similarity(&lines, k, &model),
        other => Err(Error::Config(format!("unrecognized selector {}", other)))
    }
}

fn run_analogies(inputs: &[Vec<String>], k: usize, model: &Word2VecModel) -> Result<()> {

    // a is to b as like c is to ?
    // translates to b - a + c : ?
    // i.e : high is to higher as like good is to : better

    for input in inputs {

        if input.len() != 4 {
            warn!("skipping analogy line {:?}, expected 4 words", input);
            continue;
        }

        let source = [input[0].as_str(), input[1].as_str(), input[2].as_str()];
        let target = input[3].as_str();

        let vec = match model.analogy_vector(source) {
            Ok(vec) => vec,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let analogies = model.find_synonyms_by_vector(&vec, k)?;
        let mut found_target = false;
        for (i, (analogy, score)) in analogies.iter().enumerate() {
            println!("{} : {} - {} + {} ? {} = {}", i, source[1], source[0], source[2], analogy, score);
            if analogy == target {
                found_target = true;
                println!("found target '{}' analogy in place {}", target, 1 + i);
            }
        }

        if !found_target {
            println!("target '{}' was not found within the first {} analogies", target, k);
        }
        println!();
    }

    Ok(())
}

fn run_similarity(inputs: &[String], k: usize, model: &Word2VecModel) -> Result<()> {

    for token in inputs {

        println!("searching {} most similar words to {}", k, token);
        match model.find_synonyms(token, k) {
            Ok(similarities) => {
                for (i, (similar_token, score)) in similarities.iter().enumerate() {
                    println!("{} : {} ? {} = {}", i, token, similar_token, score);
                }
            },
            Err(Error::UnknownWord(word)) => warn!("`{}` is not in the vocabulary", word),
            Err(e) => return Err(e)
        }
        println!();
    }

    Ok(())
}
