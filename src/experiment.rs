use crate::data::Data;
use crate::metrics::{compare_results, Scores};
use crate::network::AutoEncoder;
use crate::optimizer::Adam;
use crate::param::Param;
use crate::sampling::{random_split_train_test, Split};
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::io::Write;

/// Scores of every repetition and phase, keyed by `"<model> (training)_<i>"` / `"<model> (testing )_<i>"`.
/// Keys iterate in lexicographic order.
pub type ResultsTable = BTreeMap<String, Scores>;

pub fn training_key(model_name: &str, repetition: usize) -> String {
    format!("{} (training)_{}", model_name, repetition)
}

pub fn testing_key(model_name: &str, repetition: usize) -> String {
    format!("{} (testing )_{}", model_name, repetition)
}

/// Outcome of one train/evaluate cycle.
#[derive(Clone, Debug)]
pub struct Repetition {
    pub index: usize,
    pub seed: u64,
    pub split: Split,
    pub train: Scores,
    pub test: Scores,
    /// Training loss of the last optimisation step
    pub final_loss: f64,
}

#[derive(Clone, Debug)]
pub struct Experiment {
    pub id: String,
    pub deepae_version: String,
    pub timestamp: String,
    pub data_path: String,
    pub seeds: Vec<u64>,
    pub repetitions: Vec<Repetition>,
    pub results: ResultsTable,
    pub execution_time: f64,
    pub parameters: Param,
}

pub fn version() -> String {
    format!("{}#{}", env!("CARGO_PKG_VERSION"), option_env!("DEEPAE_GIT_SHA").unwrap_or("unknown"))
}

/// Per-repetition split seeds: the configured ones, or distinct values drawn from
/// `[0, seed_range)` with the unseeded thread generator.
pub fn draw_seeds(param: &Param) -> Result<Vec<u64>, String> {
    if !param.general.seeds.is_empty() {
        return Ok(param.general.seeds.clone());
    }

    let range = param.general.seed_range as usize;
    let amount = param.general.repetitions;
    if amount > range {
        return Err(format!("Cannot draw {} distinct seeds from [0, {})", amount, range));
    }

    Ok(rand::seq::index::sample(&mut rand::thread_rng(), range, amount)
        .into_iter()
        .map(|i| i as u64)
        .collect())
}

/// Split `data` with `seed`, train a freshly initialised autoencoder on the dictionary and score
/// the reconstructions of both parts.
pub fn run_repetition(data: &Data, param: &Param, index: usize, seed: u64) -> Result<Repetition, String> {
    let mut init_rng = ChaCha8Rng::seed_from_u64(param.general.init_seed);
    let mut model = AutoEncoder::new(data.feature_len, &param.network, &mut init_rng);
    let mut optimizer = Adam::new(&model.layers, &param.training);

    let (train, test, split) = random_split_train_test(
        data,
        param.sampling.training_dictionary_fraction,
        seed,
        param.sampling.dictionary_size,
        param.sampling.biased_training,
    )?;

    info!("Data {:?} | dictionary {:?} | remainder {:?}", data.X.dim(), train.X.dim(), test.X.dim());
    info!("First dictionary values: {:?}", train.X.row(0).iter().take(10).collect::<Vec<_>>());
    debug!("Dictionary samples: {:?} (dictionary_size {})", train.sample_ids, split.dictionary_size);

    let x_train = train.samples_as_rows();
    let x_test = test.samples_as_rows();

    let mut loss = f64::NAN;
    let mut scores: Option<(Scores, Scores)> = None;
    let mut decoded_test_shape = (0, 0);

    for step in 0..param.training.steps {
        loss = model.train_step(&x_train, &mut optimizer)?;

        if step % param.training.eval_every == 0 {
            let decoded_train = model.reconstruct(&x_train);
            let decoded_test = model.reconstruct(&x_test);
            let train_scores = compare_results(&x_train, &decoded_train);
            let test_scores = compare_results(&x_test, &decoded_test);

            debug!("Step {} | train loss {:.4}", step, loss);
            debug!("  train: {}", train_scores);
            debug!("  test:  {}", test_scores);

            decoded_test_shape = decoded_test.dim();
            scores = Some((train_scores, test_scores));
        }
    }

    let (train_scores, test_scores) = scores.ok_or("No evaluation step was reached")?;
    info!("Reconstructed test matrix {:?}", decoded_test_shape);

    Ok(Repetition {
        index,
        seed,
        split,
        train: train_scores,
        test: test_scores,
        final_loss: loss,
    })
}

impl Experiment {
    pub fn results_from(repetitions: &[Repetition], model_name: &str) -> ResultsTable {
        let mut results = ResultsTable::new();
        for repetition in repetitions {
            results.insert(training_key(model_name, repetition.index), repetition.train);
            results.insert(testing_key(model_name, repetition.index), repetition.test);
        }
        results
    }

    /// Data path, then one tab-separated line per results entry: key, Pearson, Euclidean, MAE.
    pub fn report<W: Write>(&self, writer: W) -> Result<(), Box<dyn Error>> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);

        wtr.write_record([self.data_path.as_str()])?;
        for (key, scores) in &self.results {
            wtr.write_record([
                key.clone(),
                scores.pearson.to_string(),
                scores.euclidean.to_string(),
                scores.mae.to_string(),
            ])?;
        }
        wtr.flush()?;

        Ok(())
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Experiment {} (deepae {})", self.id, self.deepae_version)?;
        writeln!(f, "Data: {}   Seeds: {:?}   Time: {:.2}s", self.data_path, self.seeds, self.execution_time)?;
        for (key, scores) in &self.results {
            writeln!(f, "{:<28} {}", key, scores)?;
        }
        Ok(())
    }
}
