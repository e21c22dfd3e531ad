//! This module turns expression trees into callable functions.
//!
//! An expression is flattened into a postfix stack program (see [`LinearOp`]), run
//! through the peephole optimiser, and wrapped in a closure that interprets the
//! program in the requested floating-point width.
//!
//! The main entry point is:
//! - `build_function()` - Compiles a single expression into a [`CompiledFunction`]

use std::sync::Arc;

use log::trace;
use smallvec::{smallvec, SmallVec};

use crate::{
    expr::{Expr, FlattenedExpr, LinearOp},
    float::Real,
    opt::optimize,
    types::CompiledFunction,
};

/// Builds a compiled function from an expression tree.
///
/// Constants are narrowed to `T` once, at build time. Every operation of the program
/// is then executed in `T`, so an `f32` function never rounds through `f64`.
///
/// # Arguments
/// * `expr` - The expression tree to compile
///
/// # Returns
/// A thread-safe function that takes a slice of `T` values in slot order and returns the
/// result. The function is wrapped in an Arc to allow sharing between threads.
///
/// # Example
/// ```
/// use mexpress::builder::build_function;
/// use mexpress::convert::build_ast;
///
/// let (expr, _) = build_ast("x^2 + 7").unwrap();
/// let f = build_function::<f32>(&expr);
/// assert_eq!(f(&[2.0]), 11.0);
/// ```
pub fn build_function<T: Real>(expr: &Expr) -> CompiledFunction<T> {
    let flattened = optimize(expr.flatten::<T>());

    if let Some(constant) = flattened.constant_result {
        trace!("compiled constant function {}", constant);
        return Arc::new(move |_: &[T]| constant);
    }

    let program = StackProgram::new(flattened);
    trace!(
        "compiled stack program with {} ops, stack depth {}",
        program.ops.len(),
        program.depth
    );
    Arc::new(move |input: &[T]| program.run(input))
}

/// Programs needing at most this many stack slots run without heap allocation.
const INLINE_STACK: usize = 16;

/// An optimised stack program together with the stack size it needs.
struct StackProgram<T> {
    ops: Vec<LinearOp<T>>,
    depth: usize,
}

impl<T: Real> StackProgram<T> {
    fn new(flattened: FlattenedExpr<T>) -> Self {
        let depth = flattened.stack_depth();
        Self {
            ops: flattened.ops,
            depth,
        }
    }

    /// Executes the program. Slots past the end of `input` read as NaN.
    fn run(&self, input: &[T]) -> T {
        let mut stack: SmallVec<[T; INLINE_STACK]> = smallvec![T::zero(); self.depth.max(1)];
        let mut sp = 0;

        for op in &self.ops {
            match op {
                LinearOp::LoadConst(c) => {
                    stack[sp] = *c;
                    sp += 1;
                }
                LinearOp::LoadVar(index) => {
                    stack[sp] = input.get(*index as usize).copied().unwrap_or_else(T::nan);
                    sp += 1;
                }
                LinearOp::Add | LinearOp::Sub | LinearOp::Mul | LinearOp::Div | LinearOp::Pow => {
                    sp -= 1;
                    let rhs = stack[sp];
                    let lhs = stack[sp - 1];
                    stack[sp - 1] = match op {
                        LinearOp::Add => lhs + rhs,
                        LinearOp::Sub => lhs - rhs,
                        LinearOp::Mul => lhs * rhs,
                        LinearOp::Div => lhs / rhs,
                        _ => lhs.powf(rhs),
                    };
                }
                LinearOp::Neg => stack[sp - 1] = -stack[sp - 1],
                LinearOp::Square => stack[sp - 1] = stack[sp - 1] * stack[sp - 1],
                LinearOp::Recip => stack[sp - 1] = stack[sp - 1].recip(),
                LinearOp::PowI(n) => stack[sp - 1] = stack[sp - 1].powi(*n),
                LinearOp::PowF(p) => stack[sp - 1] = stack[sp - 1].powf(*p),
                LinearOp::Call(func) => stack[sp - 1] = func.apply(stack[sp - 1]),
            }
        }

        stack[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::build_ast;
    use approx::assert_relative_eq;

    fn compile<T: Real>(source: &str) -> CompiledFunction<T> {
        let (expr, _) = build_ast(source).unwrap();
        build_function(&expr)
    }

    #[test]
    fn test_arithmetic() {
        let f = compile::<f64>("2*x + y^2 - z/4");
        assert_eq!(f(&[1.0, 2.0, 8.0]), 4.0);
    }

    #[test]
    fn test_functions() {
        let f = compile::<f64>("exp(x) + ln(y) + sqrt(z)");
        assert_relative_eq!(f(&[0.0, 1.0, 9.0]), 4.0);

        let f = compile::<f64>("sin(x)^2 + cos(x)^2");
        assert_relative_eq!(f(&[0.7]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_expression() {
        let f = compile::<f64>("2^10 - round 2.3");
        assert_eq!(f(&[]), 1022.0);
    }

    #[test]
    fn test_single_precision() {
        let f = compile::<f32>("x / 3");
        assert_eq!(f(&[1.0]), 1.0f32 / 3.0);
    }

    #[test]
    fn test_numeric_anomalies_propagate() {
        let f = compile::<f64>("1 / x");
        assert_eq!(f(&[0.0]), f64::INFINITY);

        let f = compile::<f64>("ln(x) + sqrt(x)");
        assert!(f(&[-1.0]).is_nan());
    }

    #[test]
    fn test_general_power() {
        let f = compile::<f64>("x^y");
        assert_relative_eq!(f(&[2.0, 0.5]), 2.0f64.sqrt());
    }

    #[test]
    fn test_deep_nesting() {
        let source = "(".repeat(50) + "x" + &")".repeat(50) + " + 1";
        let f = compile::<f64>(&source);
        assert_eq!(f(&[1.0]), 2.0);
    }

    #[test]
    fn test_stack_spills_past_inline_buffer() {
        let source = "x + (".repeat(20) + "x" + &")".repeat(20);
        let (expr, _) = build_ast(&source).unwrap();
        let depth = optimize(expr.flatten::<f64>()).stack_depth();
        assert!(depth > INLINE_STACK);

        let f = build_function::<f64>(&expr);
        assert_eq!(f(&[1.5]), 31.5);
        assert_eq!(f(&[-2.0]), -42.0);

        let shallow = compile::<f32>("x * y + 1");
        assert_eq!(shallow(&[2.0, 3.0]), 7.0);
    }
}
