use std::env;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;
use word2vec_trainer::{Config, Pipeline, Result};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        error!("job failed: {}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let params = Config::new(args)?.get_params();
    Pipeline::run(&params)
}
