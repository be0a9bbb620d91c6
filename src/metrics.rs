use ndarray::{Array2, ArrayView1};
use statrs::statistics::Statistics;
use std::fmt;

/// Reconstruction quality of one phase (training or testing) of one repetition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scores {
    pub pearson: f64,
    pub euclidean: f64,
    pub mae: f64,
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pearson {:.4} | Euclidean {:e} | MAE {:.4}", self.pearson, self.euclidean, self.mae)
    }
}

fn sum_of_squared_differences(A: &Array2<f64>, B: &Array2<f64>) -> f64 {
    let C = A - B;
    C.iter().map(|c| c * c).sum()
}

/// Square root of the summed squared differences over the whole matrix (not averaged).
pub fn euclidean_dist(A: &Array2<f64>, B: &Array2<f64>) -> f64 {
    sum_of_squared_differences(A, B).sqrt()
}

/// Historically called "mean absolute error", but this is the mean of the *squared*
/// differences: sum((A-B)^2) / (rows * cols). Kept as is so that scores stay comparable
/// with previously reported runs.
pub fn mae(A: &Array2<f64>, B: &Array2<f64>) -> f64 {
    let (rows, cols) = A.dim();
    sum_of_squared_differences(A, B) / (rows * cols) as f64
}

/// Pearson correlation between two sequences. NaN when either one is constant.
pub fn pearson_slices(a: &[f64], b: &[f64]) -> f64 {
    let covariance = a.iter().covariance(b.iter());
    covariance / (a.iter().std_dev() * b.iter().std_dev())
}

/// Pearson correlation of both matrices flattened in row-major order
pub fn pearson(A: &Array2<f64>, B: &Array2<f64>) -> f64 {
    let a: Vec<f64> = A.iter().copied().collect();
    let b: Vec<f64> = B.iter().copied().collect();
    pearson_slices(&a, &b)
}

/// 1 - Pearson correlation, i.e. the "correlation" distance between two samples
pub fn correlation_distance(u: ArrayView1<f64>, v: ArrayView1<f64>) -> f64 {
    let u: Vec<f64> = u.iter().copied().collect();
    let v: Vec<f64> = v.iter().copied().collect();
    1.0 - pearson_slices(&u, &v)
}

pub fn compare_results(A: &Array2<f64>, B: &Array2<f64>) -> Scores {
    Scores {
        pearson: pearson(A, B),
        euclidean: euclidean_dist(A, B),
        mae: mae(A, B),
    }
}
