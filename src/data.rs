use log::info;
use ndarray::{Array2, ArrayView1, Axis};
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Measurement matrix with features in rows and samples in columns.
#[derive(Clone, PartialEq)]
pub struct Data {
    pub X: Array2<f64>,          // feature x sample values
    pub sample_ids: Vec<usize>,  // column index of each sample in the loaded matrix
    pub feature_len: usize,
    pub sample_len: usize,
}

impl Data {
    /// Create a new empty `Data` instance
    pub fn new() -> Data {
        Data {
            X: Array2::zeros((0, 0)),
            sample_ids: Vec::new(),
            feature_len: 0,
            sample_len: 0,
        }
    }

    /// Wrap an in-memory feature x sample matrix
    pub fn from_matrix(X: Array2<f64>) -> Data {
        let (feature_len, sample_len) = X.dim();
        Data {
            X,
            sample_ids: (0..sample_len).collect(),
            feature_len,
            sample_len,
        }
    }

    /// Load a whitespace-delimited matrix, dropping `skip_leading` columns at the start
    /// and `skip_trailing` columns at the end of every row (metadata columns).
    pub fn load_data(&mut self, X_path: &str, skip_leading: usize, skip_trailing: usize) -> Result<(), Box<dyn Error>> {
        info!("Loading file {}...", X_path);
        let file_X = File::open(X_path)?;
        let reader_X = BufReader::new(file_X);

        let mut values: Vec<f64> = Vec::new();
        let mut row_len: Option<usize> = None;
        let mut rows = 0;

        for (line_number, line) in reader_X.lines().enumerate() {
            let line = line?;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() { continue }

            let fields: Vec<&str> = content.split_whitespace().collect();
            match row_len {
                None => {
                    if fields.len() <= skip_leading + skip_trailing {
                        return Err(format!(
                            "{} has {} columns: nothing left after dropping {} leading and {} trailing columns",
                            X_path, fields.len(), skip_leading, skip_trailing
                        ).into());
                    }
                    row_len = Some(fields.len());
                },
                Some(expected) if expected != fields.len() => {
                    return Err(format!(
                        "{} line {}: expected {} columns, found {}",
                        X_path, line_number + 1, expected, fields.len()
                    ).into());
                },
                _ => {}
            }

            for value in &fields[skip_leading..fields.len() - skip_trailing] {
                let num_val = value.parse::<f64>().map_err(|e| {
                    format!("{} line {}: cannot parse {:?} ({})", X_path, line_number + 1, value, e)
                })?;
                values.push(num_val);
            }
            rows += 1;
        }

        let columns = match row_len {
            Some(len) => len - skip_leading - skip_trailing,
            None => return Err(format!("{} contains no data", X_path).into()),
        };

        self.X = Array2::from_shape_vec((rows, columns), values)?;
        self.feature_len = rows;
        self.sample_len = columns;
        self.sample_ids = (0..columns).collect();

        Ok(())
    }

    /// Values of one sample across all features
    pub fn sample(&self, i: usize) -> ArrayView1<f64> {
        self.X.column(i)
    }

    /// filter Data for some samples (represented by a Vector of column indices)
    pub fn subset(&self, samples: &[usize]) -> Data {
        Data {
            X: self.X.select(Axis(1), samples),
            sample_ids: samples.iter().map(|i| self.sample_ids[*i]).collect(),
            feature_len: self.feature_len,
            sample_len: samples.len(),
        }
    }

    /// Samples as rows, the layout fed to the autoencoder
    pub fn samples_as_rows(&self) -> Array2<f64> {
        self.X.t().to_owned()
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Features: {}   Samples: {}", self.feature_len, self.sample_len)?;

        // Limit to the first 20 rows
        for j in (0..self.feature_len).take(20) {
            let row_display: String = self.X.row(j).iter()
                .map(|v| format!("{:.2}", v))
                .collect::<Vec<_>>()
                .join("\t");

            let truncated_row = if row_display.len() > 80 {
                format!("{}...", &row_display[..77])
            } else {
                row_display
            };

            writeln!(f, "feature_{:<12} {}", j, truncated_row)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the Display formatter
        write!(f, "{}", self)
    }
}

// unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use sha2::{Digest, Sha256};
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> String {
        let path = std::env::temp_dir().join(format!("deepae_{}_{}.txt", name, std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_load_data() {
        let mut data_test = Data::new();
        data_test.load_data("./samples/tests/X.txt", 3, 1).unwrap();

        let values: Vec<f64> = data_test.X.iter().copied().collect();
        let serialized = bincode::serialize(&values).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(serialized);
        let hash = hasher.finalize();

        assert_eq!(format!("{:x}", hash), "00410fe3b719ab4e86e78f9194da9a6dc4a3549fb19597e01c610f97d59a2ee2",
        "the test X hash isn't the same as generated in the past, indicating a reproducibility problem linked either to the load_data function or to the modification of ./samples/tests/X.txt");
        assert_eq!(data_test.feature_len, 6);
        assert_eq!(data_test.sample_len, 8);
        assert_eq!(data_test.sample_ids, (0..8).collect::<Vec<usize>>());
    }

    #[test]
    fn test_load_data_strips_metadata_columns() {
        let path = write_temp("strip", "9 9 9 1.0 2.0 3.0 7\n8 8 8 4.0 5.0 6.0 7\n\n");
        let mut data = Data::new();
        data.load_data(&path, 3, 1).unwrap();
        assert_eq!(data.X, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(data.feature_len, 2);
        assert_eq!(data.sample_len, 3);
    }

    #[test]
    fn test_load_data_rejects_ragged_rows() {
        let path = write_temp("ragged", "0 0 0 1.0 2.0 0\n0 0 0 1.0 0\n");
        let mut data = Data::new();
        assert!(data.load_data(&path, 3, 1).is_err());
    }

    #[test]
    fn test_load_data_rejects_non_numeric_values() {
        let path = write_temp("nonnumeric", "0 0 0 1.0 abc 0\n");
        let mut data = Data::new();
        assert!(data.load_data(&path, 3, 1).is_err());
    }

    #[test]
    fn test_load_data_rejects_rows_without_samples() {
        let path = write_temp("narrow", "0 0 0 1\n");
        let mut data = Data::new();
        assert!(data.load_data(&path, 3, 1).is_err());
    }

    #[test]
    fn test_load_data_missing_file() {
        let mut data = Data::new();
        assert!(data.load_data("./samples/tests/does_not_exist.txt", 3, 1).is_err());
    }

    #[test]
    fn test_subset_keeps_feature_axis_and_provenance() {
        let data = Data::from_matrix(array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]);
        let sub = data.subset(&[1, 3]);
        assert_eq!(sub.X, array![[2.0, 4.0], [6.0, 8.0]]);
        assert_eq!(sub.sample_ids, vec![1, 3]);
        assert_eq!(sub.feature_len, 2);
        assert_eq!(sub.sample_len, 2);

        let subsub = sub.subset(&[1]);
        assert_eq!(subsub.sample_ids, vec![3]);
    }

    #[test]
    fn test_subset_empty_set() {
        let data = Data::from_matrix(array![[1.0, 2.0], [3.0, 4.0]]);
        let sub = data.subset(&[]);
        assert_eq!(sub.sample_len, 0);
        assert_eq!(sub.X.dim(), (2, 0));
    }

    #[test]
    fn test_samples_as_rows_transposes() {
        let data = Data::from_matrix(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(data.samples_as_rows(), array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);
        assert_eq!(data.sample(2).to_vec(), vec![3.0, 6.0]);
    }
}
