use crate::context::ExecutionContext;
use crate::error::{Error, Result};

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

type Transform<T> = Arc<dyn Fn(String) -> Result<T> + Send + Sync>;

/// A lazy, partitioned collection. It only describes where the lines come
/// from and which chain of functions turns a line into an element; the
/// files are read when an evaluation method (`fold_partition`, `aggregate`,
/// `count`, `collect`) runs.
pub struct Dataset<'ctx, T> {
    ctx: &'ctx ExecutionContext,
    partitions: Arc<Vec<PathBuf>>,
    transform: Transform<T>,
}

impl<'ctx, T> Clone for Dataset<'ctx, T> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx,
            partitions: Arc::clone(&self.partitions),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<'ctx> Dataset<'ctx, String> {

    pub(crate) fn from_files(ctx: &'ctx ExecutionContext, partitions: Vec<PathBuf>) -> Self {
        Self {
            ctx,
            partitions: Arc::new(partitions),
            transform: Arc::new(|line: String| -> Result<String> { Ok(line) }),
        }
    }
}

// `.gz` and `.bz2` shards are decompressed on the fly, anything else is plain text
fn open_partition(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = BufReader::new(File::open(path)?);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(MultiGzDecoder::new(f)))),
        Some("bz2") => Ok(Box::new(BufReader::new(MultiBzDecoder::new(f)))),
        _ => Ok(Box::new(f)),
    }
}

impl<'ctx, T: Send + 'static> Dataset<'ctx, T> {

    pub fn context(&self) -> &'ctx ExecutionContext {
        self.ctx
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn partitions(&self) -> &[PathBuf] {
        &self.partitions
    }

    /// Applies `f` to every element. Composes with the existing chain, no
    /// data is touched.
    pub fn map<U, F>(&self, f: F) -> Dataset<'ctx, U>
    where
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let previous = Arc::clone(&self.transform);
        Dataset {
            ctx: self.ctx,
            partitions: Arc::clone(&self.partitions),
            transform: Arc::new(move |line: String| f(previous(line)?)),
        }
    }

    /// Streams partition `index` line by line through the chain and folds the
    /// elements into `init`. The first failing line stops the fold, its error
    /// carries the file and the 1-based line number.
    ///
    /// Panics if `index >= self.num_partitions()`.
    pub fn fold_partition<A, F>(&self, index: usize, init: A, f: F) -> Result<A>
    where
        F: FnMut(A, T) -> Result<A>,
    {
        self.fold_partition_where(index, |_| true, init, f)
    }

    /// Like `fold_partition`, but only the lines whose 0-based number passes
    /// `keep` go through the chain, the others are skipped unparsed.
    pub fn fold_partition_where<A, K, F>(&self, index: usize, mut keep: K, init: A, mut f: F) -> Result<A>
    where
        K: FnMut(usize) -> bool,
        F: FnMut(A, T) -> Result<A>,
    {
        let path = &self.partitions[index];
        debug!(partition = index, path = %path.display(), "evaluating partition");

        let reader = open_partition(path)?;
        let mut acc = init;
        for (n, line) in reader.lines().enumerate() {

            let located = |source: Error| Error::Record {
                path: path.clone(),
                line: n + 1,
                source: Box::new(source),
            };

            let line = line.map_err(|e| located(e.into()))?;
            if !keep(n) {
                continue;
            }
            let item = (self.transform)(line).map_err(located)?;
            acc = f(acc, item).map_err(located)?;
        }

        Ok(acc)
    }

    /// Folds every partition in parallel on the context's pool starting from
    /// `zero()` and returns one result per partition, in partition order.
    pub fn aggregate_partitions<A, Z, S>(&self, zero: Z, seq_op: S) -> Result<Vec<A>>
    where
        A: Send,
        Z: Fn() -> A + Send + Sync,
        S: Fn(A, T) -> Result<A> + Send + Sync,
    {
        self.ctx.install(|| {
            (0..self.num_partitions())
                .into_par_iter()
                .map(|index| self.fold_partition(index, zero(), &seq_op))
                .collect::<Result<Vec<A>>>()
        })
    }

    /// Folds every partition in parallel on the context's pool starting from
    /// `zero()`, then combines the partial results in partition order.
    pub fn aggregate<A, Z, S, C>(&self, zero: Z, seq_op: S, comb_op: C) -> Result<A>
    where
        A: Send,
        Z: Fn() -> A + Send + Sync,
        S: Fn(A, T) -> Result<A> + Send + Sync,
        C: Fn(A, A) -> A,
    {
        let partials = self.aggregate_partitions(&zero, seq_op)?;
        Ok(partials.into_iter().fold(zero(), comb_op))
    }

    pub fn count(&self) -> Result<usize> {
        self.aggregate(|| 0usize, |n, _| Ok(n + 1), |a, b| a + b)
    }

    pub fn collect(&self) -> Result<Vec<T>> {
        self.aggregate(
            Vec::new,
            |mut items, item| {
                items.push(item);
                Ok(items)
            },
            |mut a, mut b| {
                a.append(&mut b);
                a
            },
        )
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::tokenize::record_to_tokens;
    use bzip2::write::BzEncoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write_shards(dir: &Path, shards: &[(&str, &str)]) {
        for (name, content) in shards {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    #[test]
    fn map_is_lazy_until_evaluated() {
        let dir = tempfile::tempdir().unwrap();
        write_shards(dir.path(), &[("RC_1", "a\nb\n"), ("RC_2", "c\n")]);

        let ctx = ExecutionContext::new("test", 2).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let upper = ctx
            .text_file(&format!("{}/RC_*", dir.path().display()))
            .unwrap()
            .map(move |line| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(line.to_uppercase())
            });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(upper.collect().unwrap(), vec!["A", "B", "C"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(upper.count().unwrap(), 3);
    }

    #[test]
    fn gzip_shards_are_decompressed() {
        let dir = tempfile::tempdir().unwrap();
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(b"{\"body\": \"Zipped Text\"}\n").unwrap();
        fs::write(dir.path().join("RC_1.gz"), gz.finish().unwrap()).unwrap();
        write_shards(dir.path(), &[("RC_2", "{\"body\": \"plain\"}\n")]);

        let ctx = ExecutionContext::new("test", 1).unwrap();
        let corpus = ctx
            .text_file(&format!("{}/RC_*", dir.path().display()))
            .unwrap()
            .map(|line| record_to_tokens(&line));

        assert_eq!(corpus.collect().unwrap(), vec![vec!["zipped", "text"], vec!["plain"]]);
    }

    #[test]
    fn bzip2_shards_are_decompressed() {
        let dir = tempfile::tempdir().unwrap();
        let mut bz = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        bz.write_all(b"{\"body\": \"Reddit 2007\"}\n{\"body\": \"second line\"}\n").unwrap();
        fs::write(dir.path().join("RC_2007-10.bz2"), bz.finish().unwrap()).unwrap();

        let ctx = ExecutionContext::new("test", 1).unwrap();
        let corpus = ctx
            .text_file(&format!("{}/RC_*", dir.path().display()))
            .unwrap()
            .map(|line| record_to_tokens(&line));

        assert_eq!(corpus.collect().unwrap(), vec![vec!["reddit", "2007"], vec!["second", "line"]]);
    }

    #[test]
    fn skipped_lines_are_not_parsed() {
        let dir = tempfile::tempdir().unwrap();
        write_shards(dir.path(), &[("RC_1", "{\"body\": \"a\"}\nnot json\n{\"body\": \"c\"}\n")]);

        let ctx = ExecutionContext::new("test", 1).unwrap();
        let corpus = ctx
            .text_file(&format!("{}/RC_*", dir.path().display()))
            .unwrap()
            .map(|line| record_to_tokens(&line));

        let kept = corpus
            .fold_partition_where(0, |n| n % 2 == 0, Vec::new(), |mut acc, tokens| {
                acc.extend(tokens);
                Ok(acc)
            })
            .unwrap();
        assert_eq!(kept, vec!["a", "c"]);
    }

    #[test]
    fn aggregate_partitions_keeps_partition_order() {
        let dir = tempfile::tempdir().unwrap();
        write_shards(dir.path(), &[("RC_1", "a\nb\nc\n"), ("RC_2", ""), ("RC_3", "d\n")]);

        let ctx = ExecutionContext::new("test", 3).unwrap();
        let lines = ctx.text_file(&format!("{}/RC_*", dir.path().display())).unwrap();
        let counts = lines.aggregate_partitions(|| 0usize, |n, _| Ok(n + 1)).unwrap();
        assert_eq!(counts, vec![3, 0, 1]);
    }

    #[test]
    fn failing_line_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        write_shards(dir.path(), &[("RC_1", "{\"body\": \"ok\"}\n{\"title\": \"no body\"}\n")]);

        let ctx = ExecutionContext::new("test", 1).unwrap();
        let corpus = ctx
            .text_file(&format!("{}/RC_*", dir.path().display()))
            .unwrap()
            .map(|line| record_to_tokens(&line));

        match corpus.count() {
            Err(Error::Record { path, line, source }) => {
                assert_eq!(path, dir.path().join("RC_1"));
                assert_eq!(line, 2);
                assert!(matches!(*source, Error::Json(_)));
            },
            other => panic!("expected a record error, got {:?}", other),
        }
    }

    #[test]
    fn fold_partition_reads_one_shard() {
        let dir = tempfile::tempdir().unwrap();
        write_shards(dir.path(), &[("RC_1", "x\ny\n"), ("RC_2", "z\n")]);

        let ctx = ExecutionContext::new("test", 1).unwrap();
        let lines = ctx.text_file(&format!("{}/RC_*", dir.path().display())).unwrap();
        assert_eq!(lines.num_partitions(), 2);

        let joined = lines
            .fold_partition(1, String::new(), |acc, line| Ok(acc + &line))
            .unwrap();
        assert_eq!(joined, "z");
    }
}
