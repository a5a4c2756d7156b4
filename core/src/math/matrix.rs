use ndarray::{arr1, Array2, ArrayView2};

/// Helpers for the 3×3 frame bases, stored with the local axes as columns.
pub struct MatrixHelper;

impl MatrixHelper {
    /// Build a basis from three column vectors.
    pub fn from_columns(columns: [[f64; 3]; 3]) -> Array2<f64> {
        Array2::from_shape_fn((3, 3), |(row, col)| columns[col][row])
    }

    /// `basis · v`: local components to ECEF components.
    pub fn apply(basis: ArrayView2<f64>, v: [f64; 3]) -> [f64; 3] {
        let out = basis.dot(&arr1(&v));
        [out[0], out[1], out[2]]
    }

    /// `basisᵀ · v`: ECEF components to local components.
    pub fn apply_transpose(basis: ArrayView2<f64>, v: [f64; 3]) -> [f64; 3] {
        let out = basis.t().dot(&arr1(&v));
        [out[0], out[1], out[2]]
    }

    pub fn column(basis: ArrayView2<f64>, index: usize) -> [f64; 3] {
        [basis[[0, index]], basis[[1, index]], basis[[2, index]]]
    }
}

pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: [f64; 3], factor: f64) -> [f64; 3] {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_inverts_rotation() {
        let basis = MatrixHelper::from_columns([[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let v = [1.0, 2.0, 3.0];
        let rotated = MatrixHelper::apply(basis.view(), v);
        assert_eq!(rotated, [-2.0, 1.0, 3.0]);
        assert_eq!(MatrixHelper::apply_transpose(basis.view(), rotated), v);
    }
}
