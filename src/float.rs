//! Floating-point widths supported by the evaluator.
//!
//! Expressions are built once with `f64` constants and lowered to the width of the
//! [`Real`] type they are compiled for. Two widths exist, selected either statically
//! through the type parameter of [`Equation`](crate::Equation) or at runtime through
//! [`Precision`].

use std::fmt::{Debug, Display};
use std::str::FromStr;

use num_traits::{Float, FloatConst};

use crate::errors::UnknownPrecision;

/// A floating-point type an expression can be evaluated in.
///
/// Implemented for `f32` and `f64` only.
pub trait Real: Float + FloatConst + Debug + Display + Default + Send + Sync + 'static {
    /// The runtime tag matching this type.
    const PRECISION: Precision;

    /// Narrowing (or identity) conversion from `f64`, rounding to nearest.
    fn from_double(value: f64) -> Self;

    /// Widening (or identity) conversion to `f64`.
    fn to_double(self) -> f64;
}

impl Real for f32 {
    const PRECISION: Precision = Precision::Single;

    fn from_double(value: f64) -> Self {
        value as f32
    }

    fn to_double(self) -> f64 {
        f64::from(self)
    }
}

impl Real for f64 {
    const PRECISION: Precision = Precision::Double;

    fn from_double(value: f64) -> Self {
        value
    }

    fn to_double(self) -> f64 {
        self
    }
}

/// Floating-point width tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// 32-bit IEEE-754
    Single,
    /// 64-bit IEEE-754
    #[default]
    Double,
}

impl Precision {
    /// Absolute tolerance suitable for comparing results computed in this width.
    pub fn tolerance(self) -> f64 {
        match self {
            Precision::Single => 1e-6,
            Precision::Double => 1e-12,
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Single => write!(f, "f32"),
            Precision::Double => write!(f, "f64"),
        }
    }
}

impl FromStr for Precision {
    type Err = UnknownPrecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f32" | "single" => Ok(Precision::Single),
            "f64" | "double" => Ok(Precision::Double),
            _ => Err(UnknownPrecision(s.to_string())),
        }
    }
}
