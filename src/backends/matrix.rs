use crate::float::Real;

/// A trait for matrix-like types that a Hessian can be written into.
///
/// This trait provides a common interface for different matrix implementations,
/// allowing them to be used interchangeably as output buffers. Entry `(i, j)` always
/// belongs to the variables in slots `i` and `j`, independent of the storage order of
/// the implementation.
///
/// # Examples
///
/// ```rust
/// use mexpress::prelude::Matrix;
///
/// let mut mat: Vec<Vec<f64>> = Matrix::zeros(2, 3);
/// assert_eq!(mat.dims(), (2, 3));
///
/// mat.set(1, 2, 4.0);
/// assert_eq!(mat[1][2], 4.0);
/// ```
pub trait Matrix<T: Real> {
    /// Creates a new matrix of the specified dimensions filled with zeros.
    ///
    /// # Arguments
    /// * `rows` - Number of rows in the matrix
    /// * `cols` - Number of columns in the matrix
    fn zeros(rows: usize, cols: usize) -> Self;

    /// Returns the dimensions of the matrix as (rows, columns).
    fn dims(&self) -> (usize, usize);

    /// Overwrites entry `(row, col)`.
    ///
    /// # Panics
    /// Panics if the entry is out of bounds.
    fn set(&mut self, row: usize, col: usize, value: T);
}

/// Implementation of Matrix trait for nested vectors, one inner vector per row.
///
/// Ragged rows report the length of the shortest row as the column count.
impl<T: Real> Matrix<T> for Vec<Vec<T>> {
    fn zeros(rows: usize, cols: usize) -> Self {
        vec![vec![T::zero(); cols]; rows]
    }

    fn dims(&self) -> (usize, usize) {
        let cols = self.iter().map(Vec::len).min().unwrap_or(0);
        (self.len(), cols)
    }

    fn set(&mut self, row: usize, col: usize, value: T) {
        self[row][col] = value;
    }
}

/// Implementation of Matrix trait for ndarray's Array2.
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "ndarray")]
/// # {
/// use mexpress::prelude::Matrix;
/// use ndarray::Array2;
///
/// let mut mat: Array2<f64> = Matrix::zeros(2, 2);
/// mat.set(0, 1, 1.0);
/// assert_eq!(mat[[0, 1]], 1.0);
/// # }
/// ```
#[cfg(feature = "ndarray")]
impl<T: Real> Matrix<T> for ndarray::Array2<T> {
    fn zeros(rows: usize, cols: usize) -> Self {
        ndarray::Array2::from_elem((rows, cols), T::zero())
    }

    fn dims(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn set(&mut self, row: usize, col: usize, value: T) {
        self[[row, col]] = value;
    }
}

/// Implementation of Matrix trait for nalgebra's DMatrix.
#[cfg(feature = "nalgebra")]
impl<T: Real> Matrix<T> for nalgebra::DMatrix<T> {
    fn zeros(rows: usize, cols: usize) -> Self {
        nalgebra::DMatrix::from_element(rows, cols, T::zero())
    }

    fn dims(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn set(&mut self, row: usize, col: usize, value: T) {
        self[(row, col)] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_vec_matrix() {
        let mut mat: Vec<Vec<f32>> = Matrix::zeros(2, 3);
        assert_eq!(mat.dims(), (2, 3));

        mat.set(0, 2, 1.5);
        assert_eq!(mat, vec![vec![0.0, 0.0, 1.5], vec![0.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_ragged_and_empty_dims() {
        let ragged = vec![vec![0.0f64; 3], vec![0.0; 2]];
        assert_eq!(ragged.dims(), (2, 2));

        let empty: Vec<Vec<f64>> = Vec::new();
        assert_eq!(empty.dims(), (0, 0));
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_ndarray_matrix() {
        let mut mat: ndarray::Array2<f64> = Matrix::zeros(2, 3);
        assert_eq!(mat.dims(), (2, 3));
        Matrix::set(&mut mat, 1, 0, 4.0);
        assert_eq!(mat[[1, 0]], 4.0);
    }

    #[cfg(feature = "nalgebra")]
    #[test]
    fn test_nalgebra_matrix() {
        let mut mat: nalgebra::DMatrix<f64> = Matrix::zeros(2, 3);
        assert_eq!(Matrix::<f64>::dims(&mat), (2, 3));
        Matrix::set(&mut mat, 1, 0, 4.0);
        assert_eq!(mat[(1, 0)], 4.0);
    }
}
