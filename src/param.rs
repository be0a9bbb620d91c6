use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[allow(non_camel_case_types)]
pub enum OutputActivation {
    leaky_relu,
    linear,
}

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub training: Training,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "model_name_default")]
    pub model_name: String,
    #[serde(default = "repetitions_default")]
    pub repetitions: usize,
    /// Explicit per-repetition split seeds; drawn at random when empty.
    #[serde(default = "seeds_default")]
    pub seeds: Vec<u64>,
    #[serde(default = "seed_range_default")]
    pub seed_range: u64,
    /// Seed of the weight initialisation, shared by all repetitions.
    #[serde(default = "init_seed_default")]
    pub init_seed: u64,
    #[serde(default = "one_default")]
    pub thread_number: usize,
    #[serde(default = "log_base_default")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    #[serde(default = "data_path_default")]
    pub X: String,
    #[serde(default = "skip_leading_columns_default")]
    pub skip_leading_columns: usize,
    #[serde(default = "skip_trailing_columns_default")]
    pub skip_trailing_columns: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Sampling {
    #[serde(default = "training_dictionary_fraction_default")]
    pub training_dictionary_fraction: f64,
    #[serde(default = "dictionary_size_default")]
    pub dictionary_size: f64,
    #[serde(default = "zero_default")]
    pub biased_training: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Network {
    #[serde(default = "encoder_layers_default")]
    pub encoder_layers: Vec<usize>,
    #[serde(default = "latent_size_default")]
    pub latent_size: usize,
    #[serde(default = "leaky_relu_alpha_default")]
    pub leaky_relu_alpha: f64,
    #[serde(default = "output_activation_default")]
    pub output_activation: OutputActivation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Training {
    #[serde(default = "learning_rate_default")]
    pub learning_rate: f64,
    #[serde(default = "beta1_default")]
    pub beta1: f64,
    #[serde(default = "beta2_default")]
    pub beta2: f64,
    #[serde(default = "epsilon_default")]
    pub epsilon: f64,
    #[serde(default = "steps_default")]
    pub steps: usize,
    #[serde(default = "eval_every_default")]
    pub eval_every: usize,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Sampling {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Network {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Training {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;

    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    if param.general.repetitions == 0 {
        return Err("Invalid repetitions=0. At least one repetition is required.".to_string());
    }

    if !param.general.seeds.is_empty() {
        if param.general.seeds.len() != param.general.repetitions {
            return Err(format!(
                "{} seeds given for {} repetitions. Provide one seed per repetition or none.",
                param.general.seeds.len(),
                param.general.repetitions
            ));
        }
        let mut distinct = param.general.seeds.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() != param.general.seeds.len() {
            warn!("Duplicated seeds: some repetitions will use identical splits.");
        }
    } else if (param.general.repetitions as u64) > param.general.seed_range {
        return Err(format!(
            "Cannot draw {} distinct seeds from [0, {}).",
            param.general.repetitions, param.general.seed_range
        ));
    }

    if param.general.thread_number == 0 {
        param.general.thread_number = 1;
    }

    validate_sampling(param)?;
    validate_network(param)?;
    validate_training(param)?;
    Ok(())
}

fn validate_sampling(param: &mut Param) -> Result<(), String> {
    let fraction = param.sampling.training_dictionary_fraction;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(format!(
            "Invalid training_dictionary_fraction={:.3}. Must be in range (0, 1].",
            fraction
        ));
    }

    let biased = param.sampling.biased_training;
    if !(0.0..=1.0).contains(&biased) {
        return Err(format!(
            "Invalid biased_training={:.3}. Must be in range [0, 1].",
            biased
        ));
    }

    if param.sampling.dictionary_size < 0.0 {
        return Err(format!(
            "Invalid dictionary_size={:.3}. Must be >= 0.",
            param.sampling.dictionary_size
        ));
    }

    Ok(())
}

fn validate_network(param: &mut Param) -> Result<(), String> {
    if param.network.latent_size == 0 {
        return Err("Invalid latent_size=0. The bottleneck needs at least one unit.".to_string());
    }

    if param.network.encoder_layers.iter().any(|&width| width == 0) {
        return Err(format!(
            "Invalid encoder_layers={:?}. Layer widths must be > 0.",
            param.network.encoder_layers
        ));
    }

    if param.network.leaky_relu_alpha < 0.0 {
        warn!(
            "leaky_relu_alpha={} is negative: hidden activations will flip the sign of negative inputs.",
            param.network.leaky_relu_alpha
        );
    }

    Ok(())
}

fn validate_training(param: &mut Param) -> Result<(), String> {
    if param.training.steps == 0 {
        return Err("Invalid steps=0. At least one training step is required.".to_string());
    }

    if param.training.eval_every == 0 {
        return Err("Invalid eval_every=0. Must be > 0.".to_string());
    }

    if param.training.learning_rate <= 0.0 {
        return Err(format!(
            "Invalid learning_rate={:e}. Must be > 0.",
            param.training.learning_rate
        ));
    }

    for (name, beta) in [("beta1", param.training.beta1), ("beta2", param.training.beta2)] {
        if !(0.0..1.0).contains(&beta) {
            return Err(format!("Invalid {}={}. Must be in range [0, 1).", name, beta));
        }
    }

    if param.training.epsilon <= 0.0 {
        return Err(format!(
            "Invalid epsilon={:e}. Must be > 0.",
            param.training.epsilon
        ));
    }

    Ok(())
}

// Default value definitions

fn model_name_default() -> String {
    "DeepAE4".to_string()
}
fn repetitions_default() -> usize {
    5
}
fn seeds_default() -> Vec<u64> {
    Vec::new()
}
fn seed_range_default() -> u64 {
    1000
}
fn init_seed_default() -> u64 {
    1
}
fn one_default() -> usize {
    1
}
fn log_base_default() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn data_path_default() -> String {
    "./Data/mass_cytomatry.txt".to_string()
}
fn skip_leading_columns_default() -> usize {
    3
}
fn skip_trailing_columns_default() -> usize {
    1
}
fn training_dictionary_fraction_default() -> f64 {
    0.05
}
fn dictionary_size_default() -> f64 {
    0.5
}
fn zero_default() -> f64 {
    0.0
}
fn encoder_layers_default() -> Vec<usize> {
    vec![1280, 640, 256]
}
fn latent_size_default() -> usize {
    100
}
fn leaky_relu_alpha_default() -> f64 {
    0.2
}
fn output_activation_default() -> OutputActivation {
    OutputActivation::leaky_relu
}
fn learning_rate_default() -> f64 {
    0.0001
}
fn beta1_default() -> f64 {
    0.9
}
fn beta2_default() -> f64 {
    0.999
}
fn epsilon_default() -> f64 {
    1e-8
}
fn steps_default() -> usize {
    500
}
fn eval_every_default() -> usize {
    100
}
