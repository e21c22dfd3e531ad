//! Expression module for representing mathematical expressions.
//!
//! This module defines the core expression types used to represent formulas in a form
//! that supports evaluation, symbolic differentiation and printing. The main types are:
//!
//! - `Expr`: An enum representing the different kinds of expression nodes
//! - `VarRef`: The name and input slot of a variable
//! - `LinearOp` / `FlattenedExpr`: The stack program an expression is lowered to for evaluation
//!
//! The expression tree is built recursively using `Box<Expr>` for nested expressions. Each
//! node owns its children exclusively, so the tree has no sharing and no cycles.
//!
//! # Constant Folding
//! The lowercase constructors (`Expr::add`, `Expr::mul`, ...) fold constant operands and
//! drop neutral elements as the tree is built, so that repeated differentiation does not
//! grow trees full of `0 * ...` and `... * 1` terms:
//! - Constant folding (e.g. 2 + 3 → 5, sin(0) → 0)
//! - Identity rules (e.g. x + 0 → x, x * 1 → x, x / 1 → x, x^1 → x)
//! - Zero rules (e.g. x * 0 → 0, x^0 → 1)
//!
//! The parser only applies the constant-with-constant part of this, via
//! [`Expr::fold_constants`], so a formula as written keeps its IEEE-754 behavior.
//!
//! # Symbolic Differentiation
//! [`Expr::derivative`] applies the sum, product, quotient, power and chain rules and the
//! per-function rules from [`Func::derivative_at`].

use std::fmt;

use crate::float::Real;
use crate::functions::Func;

/// Represents a reference to a variable in an expression.
///
/// The index is the variable's slot in every input vector. Slots are assigned by
/// ascending code-point order of the names, see [`Variables`](crate::registry::Variables).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub name: String,
    pub index: u32,
}

/// An expression tree node representing mathematical operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant floating point value
    Const(f64),
    /// A reference to a variable
    Var(VarRef),
    /// Negation of an expression
    Neg(Box<Expr>),
    /// Addition of two expressions
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction of two expressions
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication of two expressions
    Mul(Box<Expr>, Box<Expr>),
    /// Division of two expressions
    Div(Box<Expr>, Box<Expr>),
    /// Exponentiation of an expression by another expression
    Pow(Box<Expr>, Box<Expr>),
    /// A reserved unary function applied to an expression
    Call(Func, Box<Expr>),
}

/// Linear operation for flattened expression evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum LinearOp<T> {
    /// Load constant value
    LoadConst(T),
    /// Load variable by index
    LoadVar(u32),
    /// Add the two topmost stack values
    Add,
    /// Subtract the two topmost stack values
    Sub,
    /// Multiply the two topmost stack values
    Mul,
    /// Divide the two topmost stack values
    Div,
    /// Negate stack top
    Neg,
    /// Square stack top
    Square,
    /// Reciprocal of stack top
    Recip,
    /// Power operation with integer constant exponent
    PowI(i32),
    /// Power operation with floating point constant exponent
    PowF(T),
    /// Power operation with expression exponent
    Pow,
    /// Apply a unary function to stack top
    Call(Func),
}

impl<T> LinearOp<T> {
    /// Net change in stack height caused by this operation.
    pub fn stack_effect(&self) -> isize {
        match self {
            LinearOp::LoadConst(_) | LinearOp::LoadVar(_) => 1,
            LinearOp::Add | LinearOp::Sub | LinearOp::Mul | LinearOp::Div | LinearOp::Pow => -1,
            LinearOp::Neg
            | LinearOp::Square
            | LinearOp::Recip
            | LinearOp::PowI(_)
            | LinearOp::PowF(_)
            | LinearOp::Call(_) => 0,
        }
    }
}

/// Flattened expression representation for efficient evaluation
#[derive(Debug, Clone)]
pub struct FlattenedExpr<T> {
    /// Linear sequence of operations in postfix order
    pub ops: Vec<LinearOp<T>>,
    /// Maximum variable index accessed
    pub max_var_index: Option<u32>,
    /// Pre-computed constant result (if expression is constant)
    pub constant_result: Option<T>,
}

impl<T> FlattenedExpr<T> {
    /// Maximum stack height reached while executing `ops`.
    pub fn stack_depth(&self) -> usize {
        let mut depth: isize = 0;
        let mut max_depth: isize = 0;
        for op in &self.ops {
            depth += op.stack_effect();
            max_depth = max_depth.max(depth);
        }
        max_depth.max(0) as usize
    }
}

impl Expr {
    /// Creates a constant node.
    pub fn constant(value: f64) -> Expr {
        Expr::Const(value)
    }

    /// Creates a variable node.
    pub fn var(name: impl Into<String>, index: u32) -> Expr {
        Expr::Var(VarRef {
            name: name.into(),
            index,
        })
    }

    /// `-e`, folding constants and double negation.
    pub fn neg(e: Expr) -> Expr {
        match e {
            Expr::Const(c) => Expr::Const(-c),
            Expr::Neg(inner) => *inner,
            e => Expr::Neg(Box::new(e)),
        }
    }

    /// `l + r`
    pub fn add(l: Expr, r: Expr) -> Expr {
        match (l, r) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
            (Expr::Const(z), e) | (e, Expr::Const(z)) if z == 0.0 => e,
            (l, r) => Expr::Add(Box::new(l), Box::new(r)),
        }
    }

    /// `l - r`
    pub fn sub(l: Expr, r: Expr) -> Expr {
        match (l, r) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
            (e, Expr::Const(z)) if z == 0.0 => e,
            (Expr::Const(z), e) if z == 0.0 => Expr::neg(e),
            (l, r) => Expr::Sub(Box::new(l), Box::new(r)),
        }
    }

    /// `l * r`
    pub fn mul(l: Expr, r: Expr) -> Expr {
        match (l, r) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
            (Expr::Const(z), _) | (_, Expr::Const(z)) if z == 0.0 => Expr::Const(0.0),
            (Expr::Const(o), e) | (e, Expr::Const(o)) if o == 1.0 => e,
            (Expr::Const(m), e) | (e, Expr::Const(m)) if m == -1.0 => Expr::neg(e),
            (l, r) => Expr::Mul(Box::new(l), Box::new(r)),
        }
    }

    /// `l / r`
    pub fn div(l: Expr, r: Expr) -> Expr {
        match (l, r) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a / b),
            (e, Expr::Const(o)) if o == 1.0 => e,
            (l, r) => Expr::Div(Box::new(l), Box::new(r)),
        }
    }

    /// `base ^ exponent`
    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (base, exponent) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a.powf(b)),
            (_, Expr::Const(z)) if z == 0.0 => Expr::Const(1.0),
            (e, Expr::Const(o)) if o == 1.0 => e,
            (b, e) => Expr::Pow(Box::new(b), Box::new(e)),
        }
    }

    /// `func(arg)`
    pub fn call(func: Func, arg: Expr) -> Expr {
        match arg {
            Expr::Const(c) => Expr::Const(func.apply(c)),
            arg => Expr::Call(func, Box::new(arg)),
        }
    }

    /// Folds this node into a constant when all of its direct children are constants.
    ///
    /// Unlike the lowercase constructors this applies no identity or zero rules, so the
    /// result evaluates exactly like the unfolded node for every input.
    pub fn fold_constants(self) -> Expr {
        match self {
            Expr::Neg(e) => match *e {
                Expr::Const(c) => Expr::Const(-c),
                e => Expr::Neg(Box::new(e)),
            },
            Expr::Add(l, r) => match (*l, *r) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                (l, r) => Expr::Add(Box::new(l), Box::new(r)),
            },
            Expr::Sub(l, r) => match (*l, *r) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                (l, r) => Expr::Sub(Box::new(l), Box::new(r)),
            },
            Expr::Mul(l, r) => match (*l, *r) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                (l, r) => Expr::Mul(Box::new(l), Box::new(r)),
            },
            Expr::Div(l, r) => match (*l, *r) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a / b),
                (l, r) => Expr::Div(Box::new(l), Box::new(r)),
            },
            Expr::Pow(l, r) => match (*l, *r) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a.powf(b)),
                (l, r) => Expr::Pow(Box::new(l), Box::new(r)),
            },
            Expr::Call(func, e) => match *e {
                Expr::Const(c) => Expr::Const(func.apply(c)),
                e => Expr::Call(func, Box::new(e)),
            },
            leaf @ (Expr::Const(_) | Expr::Var(_)) => leaf,
        }
    }

    /// Returns whether the variable in slot `index` occurs in this expression.
    pub fn depends_on(&self, index: u32) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Var(var_ref) => var_ref.index == index,
            Expr::Neg(e) | Expr::Call(_, e) => e.depends_on(index),
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => l.depends_on(index) || r.depends_on(index),
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Var(_) => 1,
            Expr::Neg(e) | Expr::Call(_, e) => 1 + e.node_count(),
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Computes the symbolic derivative of this expression with respect to a variable.
    ///
    /// Recursively applies the rules of differentiation to build a new expression tree
    /// representing the derivative; `self` is left untouched. The rules implemented are:
    /// - d/dx(c) = 0 for constants
    /// - d/dx(x) = 1 for the variable we're differentiating with respect to
    /// - d/dx(y) = 0 for other variables
    /// - Sum rule: d/dx(f ± g) = df/dx ± dg/dx
    /// - Product rule: d/dx(f * g) = df/dx * g + f * dg/dx
    /// - Quotient rule: d/dx(f/g) = (df/dx * g - f * dg/dx) / (g * g)
    /// - Power rule: d/dx(f^c) = c * f^(c-1) * df/dx for constant c
    /// - General power rule: d/dx(f^g) = f^g * (dg/dx * ln(f) + g * (df/dx) / f)
    /// - Chain rule for functions: d/dx(h(f)) = h'(f) * df/dx
    /// - Negation: d/dx(-f) = -(df/dx)
    ///
    /// The general power rule is undefined for `f <= 0` and evaluates to NaN there unless
    /// the `ln(f)` term vanishes because `g` does not depend on the variable.
    ///
    /// # Arguments
    /// * `index` - The slot of the variable to differentiate with respect to
    pub fn derivative(&self, index: u32) -> Expr {
        match self {
            Expr::Const(_) => Expr::Const(0.0),

            Expr::Var(var_ref) => {
                if var_ref.index == index {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }

            Expr::Neg(e) => Expr::neg(e.derivative(index)),

            Expr::Add(l, r) => Expr::add(l.derivative(index), r.derivative(index)),

            Expr::Sub(l, r) => Expr::sub(l.derivative(index), r.derivative(index)),

            Expr::Mul(l, r) => Expr::add(
                Expr::mul(l.derivative(index), (**r).clone()),
                Expr::mul((**l).clone(), r.derivative(index)),
            ),

            Expr::Div(l, r) => Expr::div(
                Expr::sub(
                    Expr::mul(l.derivative(index), (**r).clone()),
                    Expr::mul((**l).clone(), r.derivative(index)),
                ),
                Expr::mul((**r).clone(), (**r).clone()),
            ),

            Expr::Pow(base, exponent) => match **exponent {
                Expr::Const(c) => Expr::mul(
                    Expr::mul(
                        Expr::Const(c),
                        Expr::pow((**base).clone(), Expr::Const(c - 1.0)),
                    ),
                    base.derivative(index),
                ),
                _ => Expr::mul(
                    Expr::pow((**base).clone(), (**exponent).clone()),
                    Expr::add(
                        Expr::mul(
                            exponent.derivative(index),
                            Expr::call(Func::Ln, (**base).clone()),
                        ),
                        Expr::mul(
                            (**exponent).clone(),
                            Expr::div(base.derivative(index), (**base).clone()),
                        ),
                    ),
                ),
            },

            Expr::Call(func, e) => {
                if func.is_step() {
                    return Expr::Const(0.0);
                }
                Expr::mul(func.derivative_at(e), e.derivative(index))
            }
        }
    }

    /// Evaluates the expression when it contains no variables, in the width of `T`.
    pub fn constant_value<T: Real>(&self) -> Option<T> {
        match self {
            Expr::Const(val) => Some(T::from_double(*val)),
            Expr::Var(_) => None,
            Expr::Neg(e) => Some(-e.constant_value::<T>()?),
            Expr::Add(l, r) => Some(l.constant_value::<T>()? + r.constant_value::<T>()?),
            Expr::Sub(l, r) => Some(l.constant_value::<T>()? - r.constant_value::<T>()?),
            Expr::Mul(l, r) => Some(l.constant_value::<T>()? * r.constant_value::<T>()?),
            Expr::Div(l, r) => Some(l.constant_value::<T>()? / r.constant_value::<T>()?),
            Expr::Pow(l, r) => Some(l.constant_value::<T>()?.powf(r.constant_value::<T>()?)),
            Expr::Call(func, e) => Some(func.apply(e.constant_value::<T>()?)),
        }
    }

    /// Converts expression tree to flattened linear operations for efficient evaluation.
    ///
    /// The result is a postfix sequence of stack operations with constants already
    /// narrowed to `T`. Powers with a constant integral exponent are lowered to `PowI`,
    /// other constant exponents to `PowF`.
    pub fn flatten<T: Real>(&self) -> FlattenedExpr<T> {
        if let Some(constant) = self.constant_value::<T>() {
            return FlattenedExpr {
                ops: vec![LinearOp::LoadConst(constant)],
                max_var_index: None,
                constant_result: Some(constant),
            };
        }

        let mut ops = Vec::with_capacity(self.node_count());
        let mut max_var_index = None;
        self.flatten_recursive(&mut ops, &mut max_var_index);

        FlattenedExpr {
            ops,
            max_var_index,
            constant_result: None,
        }
    }

    /// Recursively flattens expression into linear operations
    fn flatten_recursive<T: Real>(
        &self,
        ops: &mut Vec<LinearOp<T>>,
        max_var_index: &mut Option<u32>,
    ) {
        match self {
            Expr::Const(val) => ops.push(LinearOp::LoadConst(T::from_double(*val))),

            Expr::Var(var_ref) => {
                let index = var_ref.index;
                *max_var_index = Some(max_var_index.map_or(index, |m| m.max(index)));
                ops.push(LinearOp::LoadVar(index));
            }

            Expr::Neg(e) => {
                e.flatten_recursive(ops, max_var_index);
                ops.push(LinearOp::Neg);
            }

            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                l.flatten_recursive(ops, max_var_index);
                r.flatten_recursive(ops, max_var_index);
                ops.push(match self {
                    Expr::Add(..) => LinearOp::Add,
                    Expr::Sub(..) => LinearOp::Sub,
                    Expr::Mul(..) => LinearOp::Mul,
                    _ => LinearOp::Div,
                });
            }

            Expr::Pow(base, exponent) => {
                base.flatten_recursive(ops, max_var_index);
                match **exponent {
                    Expr::Const(c) if c.fract() == 0.0 && c.abs() <= f64::from(i32::MAX) => {
                        ops.push(LinearOp::PowI(c as i32));
                    }
                    Expr::Const(c) => ops.push(LinearOp::PowF(T::from_double(c))),
                    _ => {
                        exponent.flatten_recursive(ops, max_var_index);
                        ops.push(LinearOp::Pow);
                    }
                }
            }

            Expr::Call(func, e) => {
                e.flatten_recursive(ops, max_var_index);
                ops.push(LinearOp::Call(*func));
            }
        }
    }
}

/// Implements string formatting for expressions.
///
/// This is the unparser: the output parses back into an expression that evaluates
/// identically. Every binary operation is wrapped in parentheses, so the text does
/// not depend on operator precedence:
/// - Constants are formatted as numbers, non-finite ones as `(1/0)`, `(-1/0)`, `(0/0)`
/// - Variables are formatted as their names
/// - Binary operations use infix notation, e.g. `(x + y)`, `(x^2)`
/// - Functions use call notation, e.g. `sin(x)`
/// - Negation uses `-(...)`
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(val) if val.is_nan() => write!(f, "(0/0)"),
            Expr::Const(val) if val.is_infinite() => {
                write!(f, "({}1/0)", if *val < 0.0 { "-" } else { "" })
            }
            Expr::Const(val) => write!(f, "{val}"),
            Expr::Var(var_ref) => write!(f, "{}", var_ref.name),
            Expr::Neg(e) => write!(f, "-({e})"),
            Expr::Add(l, r) => write!(f, "({l} + {r})"),
            Expr::Sub(l, r) => write!(f, "({l} - {r})"),
            Expr::Mul(l, r) => write!(f, "({l} * {r})"),
            Expr::Div(l, r) => write!(f, "({l} / {r})"),
            Expr::Pow(l, r) => write!(f, "({l}^{r})"),
            Expr::Call(func, e) => write!(f, "{func}({e})"),
        }
    }
}
