//! Name-keyed parameter samples.
//!
//! [`ParameterSamples`] is the structure exchanged between an
//! [`InferenceKernel`](crate::InferenceKernel) and the population code: an
//! ordered list of distinct parameter names and an `N x P` matrix whose
//! columns follow that order.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use faer::{Mat, MatRef};

use crate::error::{Result, SmcError};

#[derive(Debug, Clone)]
pub struct ParameterSamples {
    names: Vec<String>,
    values: Mat<f64>,
}

fn check_names(names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(SmcError::NoParameters);
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(SmcError::DuplicateParameter(name.clone()));
        }
    }
    Ok(())
}

impl ParameterSamples {
    /// Build samples from `(name, column)` pairs. Column order follows the
    /// iteration order and every column must have the same length.
    pub fn new<I, S, C>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: AsRef<[f64]>,
    {
        let mut names = Vec::new();
        let mut data: Vec<Vec<f64>> = Vec::new();
        for (name, column) in columns {
            names.push(name.into());
            data.push(column.as_ref().to_vec());
        }
        check_names(&names)?;

        let num_samples = data[0].len();
        if let Some(ragged) = data.iter().find(|col| col.len() != num_samples) {
            return Err(SmcError::LengthMismatch {
                what: "parameter column",
                expected: num_samples,
                found: ragged.len(),
            });
        }

        let values = Mat::from_fn(num_samples, names.len(), |i, j| data[j][i]);
        Ok(Self { names, values })
    }

    /// Build samples from a matrix with one row per sample and one column per name.
    pub fn from_matrix(names: Vec<String>, values: Mat<f64>) -> Result<Self> {
        check_names(&names)?;
        if values.ncols() != names.len() {
            return Err(SmcError::LengthMismatch {
                what: "matrix columns",
                expected: names.len(),
                found: values.ncols(),
            });
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn num_samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_params(&self) -> usize {
        self.names.len()
    }

    pub fn values(&self) -> MatRef<'_, f64> {
        self.values.as_ref()
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SmcError::UnknownParameter(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let j = self.index_of(name)?;
        Ok((0..self.num_samples()).map(|i| self.values[(i, j)]).collect())
    }

    pub fn to_map(&self) -> HashMap<String, Vec<f64>> {
        self.names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let column = (0..self.num_samples()).map(|i| self.values[(i, j)]).collect();
                (name.clone(), column)
            })
            .collect()
    }

    /// Copy out the contiguous block of samples in `range`.
    ///
    /// Panics if the range does not lie inside `0..num_samples()`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(range.start <= range.end && range.end <= self.num_samples());
        let values = Mat::from_fn(range.len(), self.num_params(), |i, j| {
            self.values[(range.start + i, j)]
        });
        Self {
            names: self.names.clone(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ab() -> ParameterSamples {
        ParameterSamples::new([("a", vec![3., 3., 4.]), ("b", vec![1., 2., 5.])]).unwrap()
    }

    #[test]
    fn keeps_column_order() {
        let samples = ab();
        assert_eq!(samples.names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(samples.num_samples(), 3);
        assert_eq!(samples.num_params(), 2);
        assert_eq!(samples.values()[(2, 0)], 4.);
        assert_eq!(samples.values()[(1, 1)], 2.);
        assert_eq!(samples.column("b").unwrap(), vec![1., 2., 5.]);
    }

    #[test]
    fn rejects_bad_columns() {
        let empty: [(&str, Vec<f64>); 0] = [];
        assert!(matches!(
            ParameterSamples::new(empty),
            Err(SmcError::NoParameters)
        ));
        assert!(matches!(
            ParameterSamples::new([("a", vec![1.]), ("a", vec![2.])]),
            Err(SmcError::DuplicateParameter(name)) if name == "a"
        ));
        assert!(matches!(
            ParameterSamples::new([("a", vec![1., 2.]), ("b", vec![2.])]),
            Err(SmcError::LengthMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            ab().column("c"),
            Err(SmcError::UnknownParameter(name)) if name == "c"
        ));
    }

    #[test]
    fn from_matrix_checks_width() {
        let names = vec!["a".to_string()];
        let values = Mat::from_fn(4, 2, |i, j| (i + j) as f64);
        assert!(matches!(
            ParameterSamples::from_matrix(names, values),
            Err(SmcError::LengthMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn slice_copies_rows() {
        let samples = ab().slice(1..3);
        assert_eq!(samples.num_samples(), 2);
        assert_eq!(samples.column("a").unwrap(), vec![3., 4.]);
        assert_eq!(samples.to_map()["b"], vec![2., 5.]);

        let none = ab().slice(3..3);
        assert_eq!(none.num_samples(), 0);
        assert_eq!(none.num_params(), 2);
    }
}
