//! Error types for the mexpress crate.
//!
//! This module defines the structural failures that can occur while turning a formula
//! into an [`Equation`](crate::Equation) and while calling it. The main error types are:
//!
//! - `LexError`: Errors while splitting the source text into tokens
//! - `ParseError`: Errors while building the syntax tree from tokens
//! - `EquationError`: High-level errors when compiling, differentiating or evaluating
//! - `UnknownPrecision`: A precision name that is neither single nor double
//!
//! Numeric anomalies (division by zero, `ln` of a negative number, overflow) are not
//! errors. They propagate as IEEE-754 NaN/infinity through every result.

use thiserror::Error;

/// Errors that can occur while tokenizing a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// The source string was empty
    #[error("cannot parse an empty string")]
    EmptyInput,
    /// A character that starts no valid token
    #[error("unrecognized character '{character}' at position {position}")]
    UnrecognizedCharacter { character: char, position: usize },
    /// A numeric literal that does not parse as a float
    #[error("invalid number literal '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
}

/// Error when a precision name is not recognized.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown precision '{0}', expected one of: f32, single, f64, double")]
pub struct UnknownPrecision(pub String);

/// Errors that can occur while building a syntax tree from tokens.
///
/// Positions are byte offsets into the source string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The token stream was empty (e.g. whitespace-only input)
    #[error("expression contains no tokens")]
    EmptyInput,
    /// The token stream ended while an operand was still expected
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A `(` without matching `)`, or a stray `)`
    #[error("unbalanced parentheses at position {position}")]
    UnbalancedParentheses { position: usize },
    /// A complete expression was parsed but tokens remain
    #[error("unexpected trailing token '{token}' at position {position}")]
    TrailingTokens { token: String, position: usize },
    /// An identifier used with call syntax that is not a known function
    #[error("unknown function '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },
    /// A function name without a usable operand
    #[error("function '{function}' at position {position} is missing its operand")]
    MissingOperand { function: String, position: usize },
    /// A token that cannot start an operand
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },
    /// Groups, signs or operator chains nested past the parser's limit
    #[error("expression nested deeper than {limit} levels at position {position}")]
    NestingTooDeep { limit: usize, position: usize },
}

/// High-level errors that can occur when working with compiled expressions.
///
/// Wraps the lexer and parser errors and adds the shape and index checks performed
/// by [`Equation`](crate::Equation) at every call boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EquationError {
    /// Error while tokenizing the source string
    #[error("failed to tokenize expression: {0}")]
    Lex(#[from] LexError),
    /// Error while parsing the token stream
    #[error("failed to parse expression: {0}")]
    Parse(#[from] ParseError),
    /// Error when a partial derivative is requested for a slot that does not exist
    #[error("variable index {index} out of range for expression with {n_vars} variables")]
    IndexOutOfRange { index: usize, n_vars: usize },
    /// Error when the input length is not the same as the number of variables
    #[error("Invalid input length: expected {expected}, got {got}")]
    InvalidInputLength { expected: usize, got: usize },
    /// Error when an output buffer has the wrong length
    #[error("Invalid output length: expected {expected}, got {got}")]
    InvalidOutputLength { expected: usize, got: usize },
    /// Error when an output matrix has the wrong dimensions
    #[error("Invalid output shape: expected {expected:?}, got {got:?}")]
    InvalidOutputShape {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// Error when a variable is not found in the expression
    #[error("Variable not found in equation: {0}")]
    VariableNotFound(String),
    /// Error when trying to get derivative for a variable that doesn't exist
    #[error("Derivative not found for variable: {0}")]
    DerivativeNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EquationError::InvalidInputLength {
            expected: 2,
            got: 3,
        };
        assert_eq!(err.to_string(), "Invalid input length: expected 2, got 3");

        let err = EquationError::from(LexError::EmptyInput);
        assert_eq!(
            err.to_string(),
            "failed to tokenize expression: cannot parse an empty string"
        );
    }

    #[test]
    fn test_from_parse_error() {
        let err: EquationError = ParseError::UnexpectedEnd.into();
        assert!(matches!(err, EquationError::Parse(ParseError::UnexpectedEnd)));
    }
}
