//! Shape-checked wrapper around the fitted forest

use crate::error::{MetroCostError, Result};
use crate::preprocessing::{ColumnOrder, EncodedVector};
use crate::training::RandomForest;
use ndarray::{Array1, Array2, ArrayView1};

/// Fitted forest bound to the column order it was trained on
#[derive(Debug, Clone)]
pub struct Estimator {
    forest: RandomForest,
    column_order: ColumnOrder,
}

impl Estimator {
    /// Bind a forest to its column order; widths must agree
    pub fn new(forest: RandomForest, column_order: ColumnOrder) -> Result<Self> {
        if !forest.is_fitted() {
            return Err(MetroCostError::ModelNotFitted);
        }
        if forest.n_features() != column_order.len() {
            return Err(MetroCostError::ShapeError {
                expected: format!("{} features", column_order.len()),
                actual: format!("model trained on {} features", forest.n_features()),
            });
        }
        Ok(Self {
            forest,
            column_order,
        })
    }

    /// Predict from a vector already in column order.
    ///
    /// The vector's columns must equal the trained column order exactly;
    /// a length disagreement is a `ShapeError`.
    pub fn predict(&self, vector: &EncodedVector) -> Result<f64> {
        if vector.len() != self.n_features() {
            return Err(MetroCostError::ShapeError {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", vector.len()),
            });
        }
        if vector.columns() != self.column_order.columns() {
            let (missing, unexpected) = self.column_order.diff(vector.columns().iter());
            return Err(MetroCostError::ColumnOrderMismatch {
                missing,
                unexpected,
            });
        }
        self.forest.predict_row(ArrayView1::from(vector.values()))
    }

    /// Predict every row of a matrix laid out in column order
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.forest.predict(x)
    }

    pub fn n_features(&self) -> usize {
        self.forest.n_features()
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    pub fn column_order(&self) -> &ColumnOrder {
        &self.column_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{reorder, NamedVector};
    use ndarray::array;

    fn fitted() -> Estimator {
        let x = array![[0.0, 1.0], [1.0, 0.0], [0.0, 2.0], [1.0, 3.0]];
        let y = array![10.0, 20.0, 12.0, 26.0];
        let mut forest = RandomForest::new(4).with_random_state(42);
        forest.fit(&x, &y).unwrap();
        Estimator::new(forest, ColumnOrder::new(vec!["a".into(), "b".into()])).unwrap()
    }

    fn vector(columns: &[&str], values: &[f64], order: &ColumnOrder) -> EncodedVector {
        let partial = NamedVector {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: values.to_vec(),
        };
        reorder(&partial, order).unwrap()
    }

    #[test]
    fn test_predict_in_column_order() {
        let est = fitted();
        let v = vector(&["b", "a"], &[1.0, 0.0], est.column_order());
        let y = est.predict(&v).unwrap();
        assert!(y.is_finite());
    }

    #[test]
    fn test_foreign_column_order_rejected() {
        let est = fitted();
        let other = ColumnOrder::new(vec!["a".into(), "c".into()]);
        let v = vector(&["a", "c"], &[1.0, 0.0], &other);
        match est.predict(&v).unwrap_err() {
            MetroCostError::ColumnOrderMismatch { missing, unexpected } => {
                assert_eq!(missing, vec!["b"]);
                assert_eq!(unexpected, vec!["c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_width_is_shape_error() {
        let est = fitted();
        let wide = ColumnOrder::new(vec!["a".into(), "b".into(), "c".into()]);
        let v = vector(&["a", "b", "c"], &[1.0, 0.0, 5.0], &wide);
        assert!(matches!(est.predict(&v), Err(MetroCostError::ShapeError { .. })));
    }

    #[test]
    fn test_new_rejects_width_drift() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let y = array![1.0, 2.0];
        let mut forest = RandomForest::new(2);
        forest.fit(&x, &y).unwrap();
        let err = Estimator::new(forest, ColumnOrder::new(vec!["a".into()])).unwrap_err();
        assert!(matches!(err, MetroCostError::ShapeError { .. }));
    }
}
