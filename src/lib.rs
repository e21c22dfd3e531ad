//! Mathematical expression evaluator with exact symbolic differentiation.
//!
//! This crate parses formulas such as `"2*x*y^2 + cos(z) + sin(Δ)"`, evaluates them in single
//! or double precision, and derives exact partial derivatives, gradients and Hessians from
//! them. It is meant to feed numerical optimisers with objective, gradient and Hessian
//! callables without deriving anything by hand.
//!
//! # Features
//!
//! - Precedence parser with non-ASCII variable names and the usual unary functions
//! - Symbolic differentiation to any order
//! - Lazily cached, thread-safe gradient and Hessian expressions
//! - Evaluation in `f32` or `f64`, chosen statically or at runtime
//!
//! # Variable order
//!
//! Variables are bound to input slots by ascending code point of their names, not by the
//! order in which they appear. In `"Δ + x"` the first slot is `x`.
//!
//! # Example
//!
//! ```rust
//! use mexpress::Equation;
//!
//! // Create and compile an equation
//! let eq: Equation = Equation::new("2*x + y^2").unwrap();
//!
//! // Evaluate at point (x=1, y=2)
//! let result = eq.evaluate(&[1.0, 2.0]).unwrap(); // Returns 6.0
//!
//! // Compute gradient [∂/∂x, ∂/∂y]
//! let gradient = eq.gradient(&[1.0, 2.0]).unwrap(); // Returns [2.0, 4.0]
//! # assert_eq!(result, 6.0);
//! # assert_eq!(gradient, vec![2.0, 4.0]);
//! ```
//!
//! With the precision chosen at runtime:
//!
//! ```rust
//! use mexpress::{parse, Precision};
//!
//! let expr = parse("2*x*y^2 + cos(z) + sin(Δ)", Precision::Double).unwrap();
//! let hessian = expr.hessian(&[2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(hessian[0][1], 12.0);
//! assert_eq!(hessian[1][0], 12.0);
//! ```

pub use equation::Equation;
pub use errors::EquationError;
pub use float::{Precision, Real};
pub use precision::{parse, CompiledExpression};

pub mod prelude {
    pub use crate::backends::matrix::Matrix;
    pub use crate::backends::vector::Vector;
    pub use crate::builder::build_function;
    pub use crate::convert::build_ast;
    pub use crate::equation::Equation;
    pub use crate::errors::EquationError;
    pub use crate::expr::Expr;
    pub use crate::float::{Precision, Real};
    pub use crate::precision::{parse, CompiledExpression};
}

/// Input and output adapters for vector and matrix types
pub mod backends {
    pub mod matrix;
    pub mod vector;
}
/// Compilation of expression trees into callable functions
pub mod builder;
/// Conversion from parsed syntax trees to indexed expressions
pub mod convert;
/// High-level equation handling
pub mod equation;
/// Error types for the various failure modes
pub mod errors;
/// Expression tree representation and symbolic differentiation
pub mod expr;
/// Floating-point widths
pub mod float;
/// Reserved unary functions
pub mod functions;
/// Tokenizer
pub mod lexer;
/// Peephole optimiser for flattened expressions
pub mod opt;
/// Precedence parser
pub mod parser;
/// Runtime precision selection
pub mod precision;
/// Variable slot assignment
pub mod registry;
/// Type aliases for compiled functions
pub mod types;

#[cfg(test)]
mod tests {
    mod property_tests;
}
