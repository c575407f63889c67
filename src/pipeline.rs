// imports
use crate::config::JobParams;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::stats::CorpusStats;
use crate::tokenize::record_to_tokens;
use crate::word2vec::Word2Vec;

use std::time::Instant;
use tracing::info;

pub struct Pipeline {}

impl Pipeline {

    // runs the whole job, in order -
    // -> execution context for the job
    // -> lines of the input shards
    // -> optional statistics pass over the raw lines
    // -> per record tokens, declared only
    // -> vocabulary and training (the corpus is read here)
    // -> saving the model

    pub fn run(params: &JobParams) -> Result<()> {

        info!("{}", params);

        // saving would fail anyway, fail before training instead
        if params.output_path.exists() && !params.overwrite {
            return Err(Error::OutputExists(params.output_path.clone()));
        }

        ExecutionContext::scoped(&params.app_name, params.num_threads, |ctx| {

            let lines = ctx.text_file(&params.input_pattern)?;
            if params.corpus_stats {
                let timer = Instant::now();
                let stats = CorpusStats::collect(&lines)?;
                info!("{}", stats);
                info!("finished corpus statistics, took {} seconds ...", timer.elapsed().as_secs());
            }

            let corpus = lines.map(|line| record_to_tokens(&line));

            let timer = Instant::now();
            info!("starting training part...");
            let model = Word2Vec::new(params.train.clone()).fit(&corpus)?;
            info!("finished training {} words, took {} seconds ...", model.len(), timer.elapsed().as_secs());

            model.save(&params.output_path, params.overwrite)?;
            Ok(())
        })
    }
}
