//! Lightweight peephole optimiser for the flattened stack IR.
//!
//! Pass pipeline
//! -------------
//!  1. **fold_consts**     – constant propagation through every opcode, in the
//!                           target width.
//!  2. **strength_reduce** – cheap replacements for small integer powers and
//!                           removal of double negation.
//!
//! The optimiser iterates the full pipeline until neither pass rewrites
//! anything, so you can call [`optimize`](fn.optimize.html) once and get the
//! fully cleaned program. Each pass reports whether it rewrote anything.
//! Every rewrite is exact: the optimised program returns bit-identical
//! results, NaN and infinity included, for every input.

use log::trace;

use crate::expr::{FlattenedExpr, LinearOp};
use crate::float::Real;

/// Run all optimisation passes until nothing changes.
pub fn optimize<T: Real>(flattened: FlattenedExpr<T>) -> FlattenedExpr<T> {
    let len_before = flattened.ops.len();
    let mut ops = flattened.ops;
    let mut rounds = 0;
    loop {
        rounds += 1;
        let (folded, folded_any) = fold_consts(ops);
        let (reduced, reduced_any) = strength_reduce(folded);
        ops = reduced;
        if !(folded_any || reduced_any) {
            break;
        }
    }

    trace!(
        "optimised stack program from {} to {} ops in {} rounds",
        len_before,
        ops.len(),
        rounds
    );

    let constant_result = match ops.as_slice() {
        [LinearOp::LoadConst(c)] => Some(*c),
        _ => flattened.constant_result,
    };

    FlattenedExpr {
        ops,
        constant_result,
        ..flattened
    }
}

// ────────────────────────────────────────────────────────────────────────────
//  Pass 1 – constant folding
// ────────────────────────────────────────────────────────────────────────────
fn fold_consts<T: Real>(ops: Vec<LinearOp<T>>) -> (Vec<LinearOp<T>>, bool) {
    use LinearOp::*;

    let mut changed = false;

    // Mirrors the program's stack: Some(c) if the slot is a compile-time
    // constant. A constant slot is always produced by the last LoadConst in
    // `out`, so folding only has to drop trailing loads.
    let mut out: Vec<LinearOp<T>> = Vec::with_capacity(ops.len());
    let mut cstk: Vec<Option<T>> = Vec::with_capacity(8);

    let push_const = |c: T, out: &mut Vec<LinearOp<T>>, cstk: &mut Vec<Option<T>>| {
        out.push(LoadConst(c));
        cstk.push(Some(c));
    };

    for op in ops {
        match op {
            LoadConst(c) => push_const(c, &mut out, &mut cstk),
            LoadVar(idx) => {
                out.push(LoadVar(idx));
                cstk.push(None);
            }

            // ───── unary ops ──────────────────────────────────────────────
            Neg | Square | Recip | PowI(_) | PowF(_) | Call(_) => {
                match cstk.pop().flatten() {
                    Some(cv) => {
                        let res = match op {
                            Neg => -cv,
                            Square => cv * cv,
                            Recip => cv.recip(),
                            PowI(n) => cv.powi(n),
                            PowF(p) => cv.powf(p),
                            Call(func) => func.apply(cv),
                            _ => cv,
                        };
                        out.pop();
                        push_const(res, &mut out, &mut cstk);
                        changed = true;
                    }
                    None => {
                        out.push(op);
                        cstk.push(None);
                    }
                }
            }

            // ───── binary ops ─────────────────────────────────────────────
            Add | Sub | Mul | Div | Pow => {
                let rhs = cstk.pop().flatten();
                let lhs = cstk.pop().flatten();

                match (lhs, rhs) {
                    (Some(a), Some(b)) => {
                        let res = match op {
                            Add => a + b,
                            Sub => a - b,
                            Mul => a * b,
                            Div => a / b,
                            _ => a.powf(b),
                        };
                        out.truncate(out.len().saturating_sub(2));
                        push_const(res, &mut out, &mut cstk);
                        changed = true;
                    }
                    (_, Some(b)) if matches!(op, Pow) => {
                        // constant exponent: fold it into the opcode
                        out.pop();
                        out.push(PowF(b));
                        cstk.push(None);
                        changed = true;
                    }
                    _ => {
                        out.push(op);
                        cstk.push(None);
                    }
                }
            }
        }
    }
    (out, changed)
}

// ────────────────────────────────────────────────────────────────────────────
//  Pass 2 – strength reduction
// ────────────────────────────────────────────────────────────────────────────
fn strength_reduce<T: Real>(ops: Vec<LinearOp<T>>) -> (Vec<LinearOp<T>>, bool) {
    use LinearOp::*;

    let mut changed = false;
    let mut out: Vec<LinearOp<T>> = Vec::with_capacity(ops.len());
    for op in ops {
        match op {
            PowI(1) => changed = true,
            PowI(2) => {
                out.push(Square);
                changed = true;
            }
            PowI(-1) => {
                out.push(Recip);
                changed = true;
            }
            Neg if matches!(out.last(), Some(Neg)) => {
                out.pop();
                changed = true;
            }
            op => out.push(op),
        }
    }
    (out, changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Func;
    use LinearOp::*;

    fn program(ops: Vec<LinearOp<f64>>) -> FlattenedExpr<f64> {
        FlattenedExpr {
            ops,
            max_var_index: Some(0),
            constant_result: None,
        }
    }

    #[test]
    fn test_folds_constant_subprograms() {
        // x + sin(0) * 2
        let out = optimize(program(vec![
            LoadVar(0),
            LoadConst(0.0),
            Call(Func::Sin),
            LoadConst(2.0),
            Mul,
            Add,
        ]));
        assert_eq!(out.ops, vec![LoadVar(0), LoadConst(0.0), Add]);
    }

    #[test]
    fn test_keeps_non_finite_folds() {
        let out = optimize(program(vec![LoadConst(1.0), LoadConst(0.0), Div]));
        assert_eq!(out.ops, vec![LoadConst(f64::INFINITY)]);
        assert_eq!(out.constant_result, Some(f64::INFINITY));
    }

    #[test]
    fn test_nan_constants_terminate() {
        let out = optimize(program(vec![LoadConst(f64::NAN)]));
        assert_eq!(out.ops.len(), 1);
        assert!(matches!(out.constant_result, Some(c) if c.is_nan()));

        let out = optimize(program(vec![LoadVar(0), LoadConst(f64::NAN), Mul]));
        assert_eq!(out.ops.len(), 3);
        assert!(matches!(out.ops[1], LoadConst(c) if c.is_nan()));
        assert_eq!(out.constant_result, None);

        // 0/0 folds to NaN and the loop still settles
        let out = optimize(program(vec![
            LoadVar(0),
            LoadConst(0.0),
            LoadConst(0.0),
            Div,
            Add,
        ]));
        assert_eq!(out.ops.len(), 3);
        assert!(matches!(out.ops[1], LoadConst(c) if c.is_nan()));
    }

    #[test]
    fn test_passes_report_rewrites() {
        let ops = vec![LoadVar(0), LoadConst(f64::NAN), Add];
        assert!(!fold_consts(ops.clone()).1);
        assert!(!strength_reduce(ops).1);
        assert!(fold_consts(vec![LoadConst(1.0), Neg]).1);
        assert!(strength_reduce::<f64>(vec![LoadVar(0), PowI(2)]).1);
    }

    #[test]
    fn test_strength_reduction() {
        let out = optimize(program(vec![LoadVar(0), PowI(2), LoadVar(0), PowI(-1), Add]));
        assert_eq!(out.ops, vec![LoadVar(0), Square, LoadVar(0), Recip, Add]);

        let out = optimize(program(vec![LoadVar(0), PowI(1), Neg, Neg]));
        assert_eq!(out.ops, vec![LoadVar(0)]);
    }

    #[test]
    fn test_constant_exponent_becomes_powf() {
        let out = optimize(program(vec![
            LoadVar(0),
            LoadConst(1.0),
            LoadConst(0.5),
            Add,
            Pow,
        ]));
        assert_eq!(out.ops, vec![LoadVar(0), PowF(1.5)]);
    }

    #[test]
    fn test_leaves_variable_programs_alone() {
        let ops = vec![LoadVar(0), LoadVar(1), Mul, Call(Func::Exp)];
        let out = optimize(program(ops.clone()));
        assert_eq!(out.ops, ops);
    }
}
