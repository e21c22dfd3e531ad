//! Mathematical equation evaluation and differentiation.
//!
//! This module provides the core `Equation` type which represents a mathematical expression
//! that can be evaluated and differentiated. Equations are compiled on creation for
//! efficient evaluation and support exact symbolic differentiation to any order.
//!
//! # Features
//!
//! - Compilation of expressions to an optimised stack program in `f32` or `f64`
//! - Exact partial derivatives, gradients and Hessians
//! - Lazily built, thread-safe derivative caches
//! - Evaluation of many points in parallel
//!
//! # Example
//!
//! ```
//! use mexpress::Equation;
//!
//! let eq: Equation = Equation::new("2*x + y^2").unwrap();
//! let result = eq.evaluate(&[1.0, 2.0]).unwrap(); // Evaluates to 6.0
//! let gradient = eq.gradient(&[1.0, 2.0]).unwrap(); // Computes [2.0, 4.0]
//! let hessian = eq.hessian(&[1.0, 2.0]).unwrap(); // Computes [[0.0, 0.0], [0.0, 2.0]]
//! # assert_eq!(result, 6.0);
//! # assert_eq!(gradient, vec![2.0, 4.0]);
//! # assert_eq!(hessian, vec![vec![0.0, 0.0], vec![0.0, 2.0]]);
//! ```
//!
//! # Variable Handling
//!
//! Variables are extracted from the formula and sorted by the code points of their names.
//! Every input and output vector follows that order, not the order in which the names
//! first appear: in `"Δ + x"` slot 0 is `x` and slot 1 is `Δ`.
//!
//! # Derivative caches
//!
//! The first partials are derived once, on the first gradient or Hessian request, and the
//! upper triangle of second partials once, on the first Hessian request. Both caches are
//! `OnceLock`s, so concurrent first calls from several threads derive each entry exactly
//! once and all threads observe the same cached expressions.

use std::sync::{Arc, OnceLock};

use colored::Colorize;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;

use crate::backends::matrix::Matrix;
use crate::backends::vector::Vector;
use crate::builder::build_function;
use crate::convert::build_ast;
use crate::errors::EquationError;
use crate::expr::Expr;
use crate::float::{Precision, Real};
use crate::registry::Variables;
use crate::types::CompiledFunction;

/// Represents a mathematical equation that can be evaluated and differentiated.
///
/// This struct holds both the original equation string and the compiled function for
/// evaluating it, along with:
/// - The expression tree, shared with every clone
/// - The variable names and their slots
/// - Lazily populated caches of first and second order partial derivatives
///
/// Partial derivatives are themselves `Equation`s over the same variables, so they can be
/// evaluated, differentiated further and printed like any parsed formula.
#[derive(Clone)]
pub struct Equation<T: Real = f64> {
    equation_str: String,
    ast: Arc<Expr>,
    fun: CompiledFunction<T>,
    variables: Arc<Variables>,
    gradient_cache: OnceLock<Vec<Equation<T>>>,
    hessian_cache: OnceLock<Vec<Equation<T>>>,
}

impl<T: Real> std::fmt::Debug for Equation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{{\n")?;
        writeln!(f, "    {}: {}\n", "Equation".cyan(), self.equation_str)?;
        writeln!(f, "    {}: {}\n", "Expression".cyan(), self.ast)?;
        writeln!(
            f,
            "    {}: {:?}\n",
            "Sorted Variables".cyan(),
            self.variables.names()
        )?;
        writeln!(f, "    {}: {}\n", "Precision".cyan(), T::PRECISION)?;
        writeln!(f, "}}")?;
        Ok(())
    }
}

impl<T: Real> std::fmt::Display for Equation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{{\n")?;
        writeln!(f, "    {}: {}\n", "Equation".cyan(), self.equation_str)?;
        writeln!(
            f,
            "    {}: {:?}\n",
            "Sorted Variables".cyan(),
            self.variables.names()
        )?;
        writeln!(f, "}}")?;
        Ok(())
    }
}

impl<T: Real> Equation<T> {
    /// Creates a new `Equation` from a string representation.
    ///
    /// This function will automatically extract the variable names from the equation string
    /// and sort them by code point. Input arrays of values are expected in the same order.
    ///
    /// # Arguments
    /// * `equation_str` - The equation as a string (e.g. "2*x + y^2")
    ///
    /// # Returns
    /// * `Result<Self, EquationError>` - The compiled equation or an error
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("2*x + y^2").unwrap();
    /// let result = eq.evaluate(&[1.0, 2.0]).unwrap(); // x=1, y=2 -> 2*1 + 2^2 = 6
    /// # assert_eq!(result, 6.0);
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::Lex` or `EquationError::Parse` if the string is not a valid
    /// formula. The empty string is always an error.
    pub fn new(equation_str: impl Into<String>) -> Result<Self, EquationError> {
        let equation_str = equation_str.into();
        let (ast, variables) = build_ast(&equation_str)?;

        debug!(
            "compiled '{}' in {} with variables {:?}",
            equation_str,
            T::PRECISION,
            variables.names()
        );

        Ok(Self::from_parts(equation_str, ast, Arc::new(variables)))
    }

    /// Builds an `Equation` for a derived expression over existing variables.
    fn from_expr(ast: Expr, variables: Arc<Variables>) -> Self {
        let equation_str = ast.to_string();
        Self::from_parts(equation_str, ast, variables)
    }

    fn from_parts(equation_str: String, ast: Expr, variables: Arc<Variables>) -> Self {
        let fun = build_function::<T>(&ast);
        Self {
            equation_str,
            ast: Arc::new(ast),
            fun,
            variables,
            gradient_cache: OnceLock::new(),
            hessian_cache: OnceLock::new(),
        }
    }

    /// Number of distinct variables, and therefore the required input length.
    pub fn n_vars(&self) -> usize {
        self.variables.len()
    }

    /// Evaluates the equation for the given input values.
    ///
    /// # Arguments
    /// * `values` - Values corresponding to the variables in slot order
    ///
    /// # Returns
    /// * `Result<T, EquationError>` - The result of evaluating the equation
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("Δ + x^2 + 7").unwrap();
    /// // x sorts before Δ
    /// let result = eq.evaluate(&[2.0, 23.0]).unwrap();
    /// assert_eq!(result, 34.0);
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if the length of values doesn't match
    /// the number of variables. Numeric anomalies are not errors: they come back as NaN or
    /// infinity.
    pub fn evaluate<V: Vector<T> + ?Sized>(&self, values: &V) -> Result<T, EquationError> {
        self.validate_input_length(values.len())?;
        Ok((self.fun)(&values.as_slice()))
    }

    /// Returns the exact partial derivative with respect to the variable in slot `index`.
    ///
    /// The result is a new `Equation` over the same variables. If the gradient cache is
    /// already populated the cached entry is returned.
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("x^2 * y").unwrap();
    /// let dx = eq.partial(0).unwrap();
    /// assert_eq!(dx.evaluate(&[3.0, 2.0]).unwrap(), 12.0);
    /// assert!(eq.partial(2).is_err());
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::IndexOutOfRange` if `index >= n_vars()`.
    pub fn partial(&self, index: usize) -> Result<Equation<T>, EquationError> {
        self.validate_index(index)?;
        match self.gradient_cache.get() {
            Some(cache) => Ok(cache[index].clone()),
            None => Ok(self.derive(index)),
        }
    }

    /// Returns the cached first partials, deriving them on first use.
    ///
    /// Entry `i` is the derivative with respect to the variable in slot `i`.
    pub fn gradient_expressions(&self) -> &[Equation<T>] {
        self.gradient_cache.get_or_init(|| {
            debug!(
                "deriving {} first partials of '{}'",
                self.n_vars(),
                self.equation_str
            );
            (0..self.n_vars()).map(|i| self.derive(i)).collect()
        })
    }

    /// Returns the cached upper triangle of second partials, deriving it on first use.
    ///
    /// Entries are stored row by row: `(0,0), (0,1), .., (0,n-1), (1,1), ..`. Entry `(r,c)`
    /// is the partial of the `r`-th first partial with respect to slot `c`.
    pub fn hessian_expressions(&self) -> &[Equation<T>] {
        self.hessian_cache.get_or_init(|| {
            let n = self.n_vars();
            debug!(
                "deriving {} second partials of '{}'",
                n * (n + 1) / 2,
                self.equation_str
            );
            let gradient = self.gradient_expressions();
            (0..n)
                .flat_map(|r| (r..n).map(move |c| (r, c)))
                .map(|(r, c)| gradient[r].derive(c))
                .collect()
        })
    }

    /// Returns the second partial for slots `row` and `col` from the Hessian cache.
    ///
    /// Entries below the diagonal are served by their mirror above it.
    ///
    /// # Errors
    /// Returns `EquationError::IndexOutOfRange` if either slot is out of range.
    pub fn hessian_entry(&self, row: usize, col: usize) -> Result<&Equation<T>, EquationError> {
        self.validate_index(row)?;
        self.validate_index(col)?;
        let (r, c) = if row <= col { (row, col) } else { (col, row) };
        Ok(&self.hessian_expressions()[triangular_index(self.n_vars(), r, c)])
    }

    /// Computes the gradient (all first order partial derivatives) at the given point.
    ///
    /// # Arguments
    /// * `values` - Values corresponding to the variables in slot order
    ///
    /// # Returns
    /// * `Result<Vec<T>, EquationError>` - Vector of partial derivatives in slot order
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("2*x + y^2").unwrap();
    /// let gradient = eq.gradient(&[1.0, 2.0]).unwrap(); // at point (1,2)
    /// assert_eq!(gradient, vec![2.0, 4.0]); // [∂/∂x, ∂/∂y] = [2, 2y]
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if the length of values doesn't match
    /// the number of variables.
    pub fn gradient<V: Vector<T> + ?Sized>(&self, values: &V) -> Result<Vec<T>, EquationError> {
        let mut out = vec![T::zero(); self.n_vars()];
        self.gradient_into(values, out.as_mut_slice())?;
        Ok(out)
    }

    /// Computes the gradient at the given point into a caller-owned buffer.
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` for a wrongly sized input and
    /// `EquationError::InvalidOutputLength` for a wrongly sized output.
    pub fn gradient_into<V, O>(&self, values: &V, out: &mut O) -> Result<(), EquationError>
    where
        V: Vector<T> + ?Sized,
        O: Vector<T> + ?Sized,
    {
        self.validate_input_length(values.len())?;
        if out.len() != self.n_vars() {
            return Err(EquationError::InvalidOutputLength {
                expected: self.n_vars(),
                got: out.len(),
            });
        }

        let values = values.as_slice();
        for (i, partial) in self.gradient_expressions().iter().enumerate() {
            out.set(i, (partial.fun)(&values));
        }
        Ok(())
    }

    /// Computes the Hessian matrix (all second order partial derivatives) at the given point.
    ///
    /// Only the upper triangle is evaluated; the lower triangle is a copy, so the result is
    /// exactly symmetric.
    ///
    /// # Arguments
    /// * `values` - Values corresponding to the variables in slot order
    ///
    /// # Returns
    /// * `Result<Vec<Vec<T>>, EquationError>` - Matrix of second order derivatives in slot order
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("2*x + y^2").unwrap();
    /// let hessian = eq.hessian(&[1.0, 2.0]).unwrap(); // at point (1,2)
    /// assert_eq!(hessian, vec![vec![0.0, 0.0], vec![0.0, 2.0]]);
    /// // [[∂²/∂x², ∂²/∂x∂y],
    /// //  [∂²/∂y∂x, ∂²/∂y²]]
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if the length of values doesn't match
    /// the number of variables.
    pub fn hessian<V: Vector<T> + ?Sized>(
        &self,
        values: &V,
    ) -> Result<Vec<Vec<T>>, EquationError> {
        let n = self.n_vars();
        let mut out: Vec<Vec<T>> = Matrix::zeros(n, n);
        self.hessian_into(values, &mut out)?;
        Ok(out)
    }

    /// Computes the Hessian at the given point into a caller-owned matrix.
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` for a wrongly sized input and
    /// `EquationError::InvalidOutputShape` unless the matrix is `n_vars × n_vars`.
    pub fn hessian_into<V, M>(&self, values: &V, out: &mut M) -> Result<(), EquationError>
    where
        V: Vector<T> + ?Sized,
        M: Matrix<T>,
    {
        self.validate_input_length(values.len())?;
        let n = self.n_vars();
        if out.dims() != (n, n) {
            return Err(EquationError::InvalidOutputShape {
                expected: (n, n),
                got: out.dims(),
            });
        }

        let values = values.as_slice();
        let mut entries = self.hessian_expressions().iter();
        for r in 0..n {
            for c in r..n {
                if let Some(entry) = entries.next() {
                    let value = (entry.fun)(&values);
                    out.set(r, c, value);
                    out.set(c, r, value);
                }
            }
        }
        Ok(())
    }

    /// Returns the cached first partial with respect to a variable, by name.
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("2*x + y^2").unwrap();
    /// let dy = eq.derivative("y").unwrap();
    /// assert_eq!(dy.evaluate(&[1.0, 2.0]).unwrap(), 4.0);
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::DerivativeNotFound` if the variable is not found.
    pub fn derivative(&self, variable: &str) -> Result<&Equation<T>, EquationError> {
        let index = self
            .variable_index(variable)
            .ok_or_else(|| EquationError::DerivativeNotFound(variable.to_string()))?;
        Ok(&self.gradient_expressions()[index])
    }

    /// Computes the higher-order partial derivative of the function with respect to multiple variables.
    ///
    /// # Arguments
    /// * `variables` - Slice of variable names to differentiate with respect to, in order
    ///
    /// # Returns
    /// * `Result<Equation<T>, EquationError>` - The derived equation
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("x^2 * y^2").unwrap();
    /// let dxdy = eq.derive_wrt(&["x", "y"]).unwrap();
    /// let result = dxdy.evaluate(&[2.0, 3.0]).unwrap(); // evaluate ∂²/∂x∂y at (2,3)
    /// assert_eq!(result, 24.0); // ∂²/∂x∂y(x^2 * y^2) = 4xy
    /// ```
    ///
    /// # Errors
    /// Returns `EquationError::DerivativeNotFound` if any variable is not found.
    pub fn derive_wrt(&self, variables: &[&str]) -> Result<Equation<T>, EquationError> {
        let missing = variables
            .iter()
            .filter(|name| self.variables.index_of(name).is_none())
            .unique()
            .join(", ");
        if !missing.is_empty() {
            return Err(EquationError::DerivativeNotFound(missing));
        }

        let expr = variables
            .iter()
            .filter_map(|name| self.variables.index_of(name))
            .fold((*self.ast).clone(), |expr, index| expr.derivative(index));
        Ok(Self::from_expr(expr, Arc::clone(&self.variables)))
    }

    /// Evaluates the equation at many points in parallel.
    ///
    /// Results are returned in the order of `points`.
    ///
    /// # Errors
    /// Returns `EquationError::InvalidInputLength` if any point has the wrong length.
    pub fn eval_parallel(&self, points: &[Vec<T>]) -> Result<Vec<T>, EquationError> {
        points
            .par_iter()
            .map(|point| self.evaluate(point))
            .collect()
    }

    /// Renders the expression back into formula text.
    ///
    /// Parsing the result gives an equation that evaluates identically. Every binary
    /// operation is parenthesized, so the text rarely matches the original spelling.
    ///
    /// # Example
    /// ```
    /// # use mexpress::Equation;
    /// let eq = Equation::<f64>::new("-x^2 + 1/y").unwrap();
    /// assert_eq!(eq.unparse(), "((-(x)^2) + (1 / y))");
    /// ```
    pub fn unparse(&self) -> String {
        self.ast.to_string()
    }

    /// Returns the slot of a variable, by name.
    pub fn variable_index(&self, variable: &str) -> Option<usize> {
        self.variables.index_of(variable).map(|i| i as usize)
    }

    /// Returns the original equation string, or the unparsed text of a derived equation.
    pub fn equation_str(&self) -> &str {
        &self.equation_str
    }

    /// Returns the expression tree.
    pub fn expr(&self) -> &Expr {
        &self.ast
    }

    /// Returns the compiled evaluation function.
    pub fn fun(&self) -> &CompiledFunction<T> {
        &self.fun
    }

    /// Returns the sorted variables.
    pub fn sorted_variables(&self) -> &[String] {
        self.variables.names()
    }

    /// Returns the floating-point width the equation is evaluated in.
    pub fn precision(&self) -> Precision {
        T::PRECISION
    }

    fn derive(&self, index: usize) -> Equation<T> {
        Self::from_expr(
            self.ast.derivative(index as u32),
            Arc::clone(&self.variables),
        )
    }

    /// Validates that the input array length matches the number of variables in the equation.
    fn validate_input_length(&self, len: usize) -> Result<(), EquationError> {
        if len != self.n_vars() {
            return Err(EquationError::InvalidInputLength {
                expected: self.n_vars(),
                got: len,
            });
        }
        Ok(())
    }

    fn validate_index(&self, index: usize) -> Result<(), EquationError> {
        if index >= self.n_vars() {
            return Err(EquationError::IndexOutOfRange {
                index,
                n_vars: self.n_vars(),
            });
        }
        Ok(())
    }
}

/// Position of entry `(row, col)`, `row <= col`, in a row-major upper triangle of size `n`.
fn triangular_index(n: usize, row: usize, col: usize) -> usize {
    row * (2 * n - row + 1) / 2 + (col - row)
}
