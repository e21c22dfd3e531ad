//! Runtime selection of the evaluation width.
//!
//! [`Equation<T>`](crate::Equation) fixes its width at compile time. Callers that learn the
//! width only at runtime (from a configuration value, or a host binding that always talks
//! in doubles) use [`parse`] instead. The returned [`CompiledExpression`] takes and returns
//! `f64` at its boundary; a single-precision expression narrows every input to `f32`,
//! computes in `f32` and widens the results back.

use log::debug;

use crate::equation::Equation;
use crate::errors::EquationError;
use crate::float::{Precision, Real};

/// A compiled expression whose width was chosen at runtime.
#[derive(Debug, Clone)]
pub enum CompiledExpression {
    Single(Equation<f32>),
    Double(Equation<f64>),
}

/// Parses `source` and compiles it for the requested precision.
///
/// # Errors
/// Returns `EquationError::Lex` or `EquationError::Parse` if the string is not a valid
/// formula. The empty string is an error for both precisions.
///
/// # Example
/// ```
/// use mexpress::{parse, Precision};
///
/// let expr = parse("x^2 + 7", "f32".parse::<Precision>().unwrap()).unwrap();
/// assert_eq!(expr.precision(), Precision::Single);
/// assert_eq!(expr.evaluate(&[2.0]).unwrap(), 11.0);
/// ```
pub fn parse(source: &str, precision: Precision) -> Result<CompiledExpression, EquationError> {
    debug!("parsing '{}' for {}", source, precision);
    match precision {
        Precision::Single => Equation::new(source).map(CompiledExpression::Single),
        Precision::Double => Equation::new(source).map(CompiledExpression::Double),
    }
}

fn narrow(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| f32::from_double(v)).collect()
}

fn widen<T: Real>(values: Vec<T>) -> Vec<f64> {
    values.into_iter().map(Real::to_double).collect()
}

impl CompiledExpression {
    /// The width the expression computes in.
    pub fn precision(&self) -> Precision {
        match self {
            CompiledExpression::Single(_) => Precision::Single,
            CompiledExpression::Double(_) => Precision::Double,
        }
    }

    pub fn n_vars(&self) -> usize {
        match self {
            CompiledExpression::Single(eq) => eq.n_vars(),
            CompiledExpression::Double(eq) => eq.n_vars(),
        }
    }

    /// Names in slot order.
    pub fn sorted_variables(&self) -> &[String] {
        match self {
            CompiledExpression::Single(eq) => eq.sorted_variables(),
            CompiledExpression::Double(eq) => eq.sorted_variables(),
        }
    }

    /// Evaluates the expression at `x`, given in slot order.
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if `x.len() != n_vars()`.
    pub fn evaluate(&self, x: &[f64]) -> Result<f64, EquationError> {
        match self {
            CompiledExpression::Single(eq) => eq.evaluate(narrow(x).as_slice()).map(f64::from),
            CompiledExpression::Double(eq) => eq.evaluate(x),
        }
    }

    /// The exact partial derivative with respect to slot `index`, in the same width.
    ///
    /// # Errors
    /// Returns `EquationError::IndexOutOfRange` if `index >= n_vars()`.
    pub fn partial(&self, index: usize) -> Result<CompiledExpression, EquationError> {
        match self {
            CompiledExpression::Single(eq) => eq.partial(index).map(CompiledExpression::Single),
            CompiledExpression::Double(eq) => eq.partial(index).map(CompiledExpression::Double),
        }
    }

    /// The gradient at `x`, in slot order.
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if `x.len() != n_vars()`.
    pub fn gradient(&self, x: &[f64]) -> Result<Vec<f64>, EquationError> {
        match self {
            CompiledExpression::Single(eq) => eq.gradient(narrow(x).as_slice()).map(widen),
            CompiledExpression::Double(eq) => eq.gradient(x),
        }
    }

    /// The symmetric `n_vars × n_vars` Hessian at `x`.
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if `x.len() != n_vars()`.
    pub fn hessian(&self, x: &[f64]) -> Result<Vec<Vec<f64>>, EquationError> {
        match self {
            CompiledExpression::Single(eq) => eq
                .hessian(narrow(x).as_slice())
                .map(|rows| rows.into_iter().map(widen).collect()),
            CompiledExpression::Double(eq) => eq.hessian(x),
        }
    }

    pub fn unparse(&self) -> String {
        match self {
            CompiledExpression::Single(eq) => eq.unparse(),
            CompiledExpression::Double(eq) => eq.unparse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LexError;
    use approx::assert_relative_eq;

    const SAMPLES: [&str; 5] = [
        "x^2 + 7",
        "2*x + y^2 + cos(z) + sin(Δ)",
        "exp(-x) * sqrt(y + 3) / (1 + z^2)",
        "atan(x / 2) - tanh(y) + log10(z + 5)",
        "sin(x)^(round 2.3) + 1/y",
    ];

    #[test]
    fn test_empty_string_fails_for_any_precision() {
        for precision in [Precision::Single, Precision::Double] {
            assert_eq!(
                parse("", precision).unwrap_err(),
                EquationError::Lex(LexError::EmptyInput)
            );
        }
    }

    #[test]
    fn test_simple_evaluation() {
        for (precision, tolerance) in [(Precision::Single, 1e-6), (Precision::Double, 1e-12)] {
            let expr = parse("x^2 + 7", precision).unwrap();
            assert_relative_eq!(expr.evaluate(&[2.0]).unwrap(), 11.0, epsilon = tolerance);
            assert_eq!(expr.precision(), precision);
        }
    }

    #[test]
    fn test_variable_order() {
        let expr = parse("Δ + x^2 + 7", Precision::Double).unwrap();
        assert_eq!(expr.sorted_variables(), &["x", "Δ"]);
        assert_eq!(expr.evaluate(&[2.0, 23.0]).unwrap(), 34.0);
    }

    #[test]
    fn test_precision_independence() {
        let points = [[0.3, 1.2, -0.7, 2.0], [1.1, 0.4, 0.25, -1.5]];
        for source in SAMPLES {
            let single = parse(source, Precision::Single).unwrap();
            let double = parse(source, Precision::Double).unwrap();
            assert_eq!(single.n_vars(), double.n_vars());

            for point in &points {
                let x = &point[..double.n_vars()];
                let a = single.evaluate(x).unwrap();
                let b = double.evaluate(x).unwrap();
                assert_relative_eq!(a, b, epsilon = 1e-5, max_relative = 1e-5);

                let ga = single.gradient(x).unwrap();
                let gb = double.gradient(x).unwrap();
                for (a, b) in ga.iter().zip(&gb) {
                    assert_relative_eq!(*a, *b, epsilon = 1e-5, max_relative = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_hessian_widened() {
        let expr = parse("2*x*y^2 + cos(z) + sin(Δ)", Precision::Single).unwrap();
        let hessian = expr.hessian(&[2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(hessian[0][1], 12.0, epsilon = 1e-5);
        assert_relative_eq!(hessian[1][1], 8.0, epsilon = 1e-5);
        assert_relative_eq!(hessian[2][2], -f64::cos(4.0), epsilon = 1e-6);
        assert_relative_eq!(hessian[3][3], -f64::sin(5.0), epsilon = 1e-6);
        assert_eq!(hessian[0][1], hessian[1][0]);
    }

    #[test]
    fn test_partial_keeps_precision() {
        let expr = parse("x + y + z", Precision::Single).unwrap();
        let dz = expr.partial(2).unwrap();
        assert_eq!(dz.precision(), Precision::Single);
        assert_eq!(dz.evaluate(&[1.0, 2.0, 3.0]).unwrap(), 1.0);
        assert!(matches!(
            expr.partial(3),
            Err(EquationError::IndexOutOfRange { index: 3, n_vars: 3 })
        ));
    }

    #[test]
    fn test_unparse_round_trip() {
        for source in SAMPLES {
            let expr = parse(source, Precision::Double).unwrap();
            let reparsed = parse(&expr.unparse(), Precision::Double).unwrap();
            let x = &[0.9, 1.3, 0.2, 0.6][..expr.n_vars()];
            assert_relative_eq!(
                expr.evaluate(x).unwrap(),
                reparsed.evaluate(x).unwrap(),
                epsilon = 1e-12,
                max_relative = 1e-12
            );
        }
    }
}
