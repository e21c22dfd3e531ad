use std::borrow::Cow;

use crate::float::Real;

/// A trait for vector-like types that can be used as inputs and outputs of compiled expressions.
///
/// This trait provides a common interface for different vector implementations,
/// allowing them to be used interchangeably wherever an [`Equation`](crate::Equation)
/// reads a point or writes a gradient. Element `i` always belongs to the variable in
/// slot `i`.
///
/// # Examples
///
/// ```rust
/// use mexpress::prelude::Vector;
///
/// let vec = vec![1.0, 2.0, 3.0];
/// assert_eq!(Vector::len(&vec), 3);
/// assert_eq!(Vector::as_slice(&vec)[0], 1.0);
///
/// let mut out = [0.0f32; 2];
/// out.set(1, 4.0);
/// assert_eq!(out, [0.0, 4.0]);
/// ```
pub trait Vector<T: Real> {
    /// Returns the vector's data as a contiguous slice, copying only if the storage is strided.
    fn as_slice(&self) -> Cow<'_, [T]>;

    /// Overwrites element `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    fn set(&mut self, index: usize, value: T);

    /// Returns the length of the vector.
    fn len(&self) -> usize;

    /// Checks if the vector is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Real> Vector<T> for Vec<T> {
    fn as_slice(&self) -> Cow<'_, [T]> {
        Cow::Borrowed(self.as_slice())
    }

    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    fn len(&self) -> usize {
        self.len()
    }
}

impl<T: Real> Vector<T> for [T] {
    fn as_slice(&self) -> Cow<'_, [T]> {
        Cow::Borrowed(self)
    }

    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Implementation of Vector trait for fixed-size arrays.
///
/// # Type Parameters
/// * `N` - The fixed size of the array
impl<T: Real, const N: usize> Vector<T> for [T; N] {
    fn as_slice(&self) -> Cow<'_, [T]> {
        Cow::Borrowed(self.as_slice())
    }

    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    fn len(&self) -> usize {
        N
    }
}

/// Implementation of Vector trait for ndarray's Array1.
///
/// Standard-layout arrays are borrowed; sliced views with a stride are copied.
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "ndarray")]
/// # {
/// use mexpress::prelude::Vector;
/// use ndarray::Array1;
///
/// let vec = Array1::from_vec(vec![1.0, 2.0]);
/// assert_eq!(&*vec.as_slice().unwrap(), &[1.0, 2.0]);
/// assert_eq!(&*Vector::as_slice(&vec), &[1.0, 2.0]);
/// # }
/// ```
#[cfg(feature = "ndarray")]
impl<T: Real> Vector<T> for ndarray::Array1<T> {
    fn as_slice(&self) -> Cow<'_, [T]> {
        match self.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(self.to_vec()),
        }
    }

    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Implementation of Vector trait for nalgebra's DVector.
#[cfg(feature = "nalgebra")]
impl<T: Real> Vector<T> for nalgebra::DVector<T> {
    fn as_slice(&self) -> Cow<'_, [T]> {
        Cow::Borrowed(self.as_slice())
    }

    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    fn len(&self) -> usize {
        self.len()
    }
}
