use crate::data::Data;
use crate::metrics::correlation_distance;
use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Smallest dictionary ever drawn, whatever the training fraction.
pub const MIN_DICTIONARY_SIZE: usize = 5;

/// Outcome of a dictionary/remainder partition of the sample axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    /// Dictionary (training) sample indices, ascending
    pub dictionary: Vec<usize>,
    /// Remaining (testing) sample indices, ascending
    pub remainder: Vec<usize>,
    /// Anchor sample used to bias the dictionary, if any
    pub anchor: Option<usize>,
    /// Samples taken from the anchor neighbourhood, nearest first
    pub biased: Vec<usize>,
    /// Resolved `dictionary_size` override
    pub dictionary_size: usize,
}

/// max(floor(fraction * sample_len), 5)
pub fn training_dictionary_size(training_dictionary_fraction: f64, sample_len: usize) -> usize {
    ((training_dictionary_fraction * sample_len as f64) as usize).max(MIN_DICTIONARY_SIZE)
}

/// A `dictionary_size` below 1 is a fraction of the training dictionary size, otherwise a count.
pub fn resolve_dictionary_size(dictionary_size: f64, training_dictionary_size: usize) -> usize {
    if dictionary_size < 1.0 {
        (dictionary_size * training_dictionary_size as f64) as usize
    } else {
        dictionary_size as usize
    }
}

/// Correlation distance from the anchor sample to every sample (anchor included).
pub fn anchor_distances(data: &Data, anchor: usize) -> Vec<f64> {
    let reference = data.sample(anchor);
    (0..data.sample_len)
        .into_par_iter()
        .map(|i| correlation_distance(reference, data.sample(i)))
        .collect()
}

/// Sample indices other than the anchor, nearest first. Ties keep index order; NaN distances
/// (constant samples) sort last.
pub fn nearest_to_anchor(data: &Data, anchor: usize) -> Vec<usize> {
    let distances = anchor_distances(data, anchor);
    let key = |i: usize| if distances[i].is_nan() { f64::INFINITY } else { distances[i] };
    let mut order: Vec<usize> = (0..data.sample_len).filter(|&i| i != anchor).collect();
    order.sort_by(|&a, &b| key(a).total_cmp(&key(b)));
    order
}

/// Split the samples of `data` into a dictionary (training) part and a remainder (testing) part.
///
/// The dictionary holds `max(floor(fraction * samples), 5)` samples. When `biased_training > 0`,
/// an anchor sample is drawn and the `floor(biased_training * size)` samples closest to it
/// (correlation distance, anchor excluded) enter the dictionary first. When `biased_training < 1`
/// the dictionary is then completed by uniform sampling without replacement among the samples
/// not yet selected, with a generator re-seeded from `seed`.
pub fn split(data: &Data, training_dictionary_fraction: f64, seed: u64, dictionary_size: f64, biased_training: f64) -> Result<Split, String> {
    if !(training_dictionary_fraction > 0.0 && training_dictionary_fraction <= 1.0) {
        return Err(format!("training_dictionary_fraction={} must be in range (0, 1]", training_dictionary_fraction));
    }
    if !(0.0..=1.0).contains(&biased_training) {
        return Err(format!("biased_training={} must be in range [0, 1]", biased_training));
    }

    let n = data.sample_len;
    let target = training_dictionary_size(training_dictionary_fraction, n);
    if target > n {
        return Err(format!("Cannot draw a dictionary of {} samples out of {} samples", target, n));
    }
    let dictionary_size = resolve_dictionary_size(dictionary_size, target);

    let mut selected = vec![false; n];
    let mut anchor = None;
    let mut biased: Vec<usize> = Vec::new();

    if biased_training > 0.0 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let i = rng.gen_range(0..n);
        let count = (biased_training * target as f64) as usize;
        biased = nearest_to_anchor(data, i).into_iter().take(count).collect();
        for &j in &biased { selected[j] = true }
        debug!("Anchor sample {} contributes its {} nearest samples", data.sample_ids[i], biased.len());
        anchor = Some(i);
    }

    if biased_training < 1.0 {
        let remaining_idx: Vec<usize> = (0..n).filter(|&i| !selected[i]).collect();
        let missing = target.saturating_sub(biased.len());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for &j in remaining_idx.choose_multiple(&mut rng, missing) {
            selected[j] = true;
        }
    }

    let (dictionary, remainder): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| selected[i]);

    Ok(Split { dictionary, remainder, anchor, biased, dictionary_size })
}

/// Split `data` and materialise both parts; each keeps the full feature axis.
pub fn random_split_train_test(data: &Data, training_dictionary_fraction: f64, seed: u64, dictionary_size: f64, biased_training: f64) -> Result<(Data, Data, Split), String> {
    let split = split(data, training_dictionary_fraction, seed, dictionary_size, biased_training)?;
    let xa = data.subset(&split.dictionary);
    let xb = data.subset(&split.remainder);
    Ok((xa, xb, split))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::collections::HashSet;

    /// features x samples matrix with a smooth per-sample trend so that correlations differ
    fn synthetic_data(features: usize, samples: usize, rng_seed: u64) -> Data {
        let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
        let X = Array2::from_shape_fn((features, samples), |(f, s)| {
            ((f as f64) * (s as f64 + 1.0)).sin() + rng.gen_range(-0.1..0.1)
        });
        Data::from_matrix(X)
    }

    fn assert_partition(split: &Split, n: usize) {
        let dictionary: HashSet<usize> = split.dictionary.iter().copied().collect();
        let remainder: HashSet<usize> = split.remainder.iter().copied().collect();
        assert_eq!(dictionary.len(), split.dictionary.len(), "dictionary contains duplicates");
        assert!(dictionary.is_disjoint(&remainder));
        let union: HashSet<usize> = dictionary.union(&remainder).copied().collect();
        assert_eq!(union, (0..n).collect::<HashSet<usize>>());
    }

    #[test]
    fn test_training_dictionary_size_floor() {
        for n in [5, 20, 60, 99] {
            assert_eq!(training_dictionary_size(0.05, n), 5);
        }
        assert_eq!(training_dictionary_size(0.05, 1000), 50);
        assert_eq!(training_dictionary_size(0.05, 219), 10);
    }

    #[test]
    fn test_resolve_dictionary_size() {
        assert_eq!(resolve_dictionary_size(0.5, 10), 5);
        assert_eq!(resolve_dictionary_size(0.5, 5), 2);
        assert_eq!(resolve_dictionary_size(12.0, 5), 12);
    }

    #[test]
    fn test_split_small_dataset_uses_floor_size() {
        let data = synthetic_data(10, 60, 1);
        for seed in [0, 7, 42, 999] {
            let split = split(&data, 0.05, seed, 0.5, 0.0).unwrap();
            assert_eq!(split.dictionary.len(), 5);
            assert_eq!(split.remainder.len(), 55);
            assert_eq!(split.dictionary_size, 2);
        }
    }

    #[test]
    fn test_split_is_a_partition() {
        let data = synthetic_data(8, 120, 2);
        for biased_training in [0.0, 0.3, 0.5, 1.0] {
            for seed in 0..10 {
                let split = split(&data, 0.1, seed, 0.5, biased_training).unwrap();
                assert_eq!(split.dictionary.len(), 12);
                assert_partition(&split, 120);
            }
        }
    }

    #[test]
    fn test_split_unbiased_has_no_anchor() {
        let data = synthetic_data(8, 30, 3);
        let split = split(&data, 0.05, 11, 0.5, 0.0).unwrap();
        assert_eq!(split.anchor, None);
        assert!(split.biased.is_empty());
    }

    #[test]
    fn test_split_unbiased_is_uniform() {
        let data = synthetic_data(6, 20, 4);
        let mut counts = vec![0usize; 20];
        for seed in 0..1000 {
            let split = split(&data, 0.05, seed, 0.5, 0.0).unwrap();
            for i in split.dictionary { counts[i] += 1 }
        }
        // 1000 draws of 5 among 20: 250 expected per sample, binomial sd ~13.7
        for (i, count) in counts.iter().enumerate() {
            assert!(*count > 180 && *count < 320, "sample {} drawn {} times", i, count);
        }
    }

    #[test]
    fn test_split_fully_biased_takes_nearest_neighbours() {
        let data = synthetic_data(12, 40, 5);
        for seed in 0..20 {
            let split = split(&data, 0.05, seed, 0.5, 1.0).unwrap();
            let anchor = split.anchor.unwrap();
            let k = split.dictionary.len();
            assert_eq!(k, 5);

            let distances = anchor_distances(&data, anchor);
            let mut others: Vec<f64> = (0..40).filter(|&i| i != anchor).map(|i| distances[i]).collect();
            others.sort_by(|a, b| a.total_cmp(b));
            let kth = others[k - 1];

            assert!(!split.dictionary.contains(&anchor));
            for i in &split.dictionary {
                assert!(distances[*i] <= kth, "sample {} is not among the {} nearest of {}", i, k, anchor);
            }
        }
    }

    #[test]
    fn test_split_partially_biased_mixes_both_pools() {
        let data = synthetic_data(12, 100, 6);
        let split = split(&data, 0.1, 3, 0.5, 0.6).unwrap();
        assert_eq!(split.dictionary.len(), 10);
        assert_eq!(split.biased.len(), 6);
        for i in &split.biased {
            assert!(split.dictionary.contains(i));
        }
        assert_partition(&split, 100);
    }

    #[test]
    fn test_split_anchor_is_seed_dependent_and_reproducible() {
        let data = synthetic_data(12, 50, 7);
        let a = split(&data, 0.1, 5, 0.5, 1.0).unwrap();
        let b = split(&data, 0.1, 5, 0.5, 1.0).unwrap();
        assert_eq!(a, b);
        let anchors: HashSet<Option<usize>> = (0..20).map(|seed| split(&data, 0.1, seed, 0.5, 1.0).unwrap().anchor).collect();
        assert!(anchors.len() > 1);
    }

    #[test]
    fn test_nearest_to_anchor_orders_by_distance() {
        let data = synthetic_data(10, 15, 8);
        let order = nearest_to_anchor(&data, 4);
        assert_eq!(order.len(), 14);
        assert!(!order.contains(&4));
        let distances = anchor_distances(&data, 4);
        assert!(distances[4].abs() < 1e-12);
        for pair in order.windows(2) {
            assert!(distances[pair[0]] <= distances[pair[1]]);
        }
    }

    #[test]
    fn test_split_rejects_too_few_samples() {
        let data = synthetic_data(4, 3, 9);
        assert!(split(&data, 0.05, 1, 0.5, 0.0).is_err());
    }

    #[test]
    fn test_split_rejects_invalid_ratios() {
        let data = synthetic_data(4, 30, 10);
        assert!(split(&data, 0.05, 1, 0.5, 1.5).is_err());
        assert!(split(&data, 0.0, 1, 0.5, 0.0).is_err());
    }

    #[test]
    fn test_split_whole_dataset_leaves_empty_remainder() {
        let data = synthetic_data(4, 5, 11);
        let split = split(&data, 0.05, 1, 0.5, 0.0).unwrap();
        assert_eq!(split.dictionary, vec![0, 1, 2, 3, 4]);
        assert!(split.remainder.is_empty());
    }

    #[test]
    fn test_random_split_train_test_materialises_columns() {
        let data = synthetic_data(7, 25, 12);
        let (xa, xb, split) = random_split_train_test(&data, 0.05, 42, 0.5, 0.0).unwrap();
        assert_eq!(xa.X.dim(), (7, 5));
        assert_eq!(xb.X.dim(), (7, 20));
        assert_eq!(xa.sample_ids, split.dictionary);
        assert_eq!(xb.sample_ids, split.remainder);
        for (col, &i) in split.dictionary.iter().enumerate() {
            assert_eq!(xa.sample(col), data.sample(i));
        }
    }
}
