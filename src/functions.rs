//! The closed set of unary functions a formula may call.
//!
//! Each [`Func`] knows its reserved name, how to apply itself to a number of either
//! width, and the outer factor of its chain rule. Step-like functions (`round`,
//! `floor`, `ceil`, `trunc`, `signum`) are treated as locally constant: their
//! derivative is zero everywhere, including at the jumps.

use std::f64::consts::{LN_10, LN_2};

use num_traits::Float;

use crate::expr::Expr;

/// A reserved unary function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    /// Natural logarithm, also spelled `log`
    Ln,
    Log2,
    Log10,
    Sqrt,
    Cbrt,
    Abs,
    Signum,
    Round,
    Floor,
    Ceil,
    Trunc,
    Fract,
}

impl Func {
    /// Every function, in declaration order.
    pub const ALL: [Func; 22] = [
        Func::Sin,
        Func::Cos,
        Func::Tan,
        Func::Asin,
        Func::Acos,
        Func::Atan,
        Func::Sinh,
        Func::Cosh,
        Func::Tanh,
        Func::Exp,
        Func::Ln,
        Func::Log2,
        Func::Log10,
        Func::Sqrt,
        Func::Cbrt,
        Func::Abs,
        Func::Signum,
        Func::Round,
        Func::Floor,
        Func::Ceil,
        Func::Trunc,
        Func::Fract,
    ];

    /// Looks up a reserved function name.
    pub fn from_name(name: &str) -> Option<Func> {
        let func = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "exp" => Func::Exp,
            "ln" | "log" => Func::Ln,
            "log2" => Func::Log2,
            "log10" => Func::Log10,
            "sqrt" => Func::Sqrt,
            "cbrt" => Func::Cbrt,
            "abs" => Func::Abs,
            "signum" => Func::Signum,
            "round" => Func::Round,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "trunc" => Func::Trunc,
            "fract" => Func::Fract,
            _ => return None,
        };
        Some(func)
    }

    /// Canonical name, accepted back by [`Func::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Log2 => "log2",
            Func::Log10 => "log10",
            Func::Sqrt => "sqrt",
            Func::Cbrt => "cbrt",
            Func::Abs => "abs",
            Func::Signum => "signum",
            Func::Round => "round",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Trunc => "trunc",
            Func::Fract => "fract",
        }
    }

    /// Whether the function is piecewise constant.
    pub fn is_step(self) -> bool {
        matches!(
            self,
            Func::Signum | Func::Round | Func::Floor | Func::Ceil | Func::Trunc
        )
    }

    /// Applies the function. Out-of-domain arguments yield NaN or infinity, never a panic.
    #[inline]
    pub fn apply<T: Float>(self, x: T) -> T {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Log2 => x.log2(),
            Func::Log10 => x.log10(),
            Func::Sqrt => x.sqrt(),
            Func::Cbrt => x.cbrt(),
            Func::Abs => x.abs(),
            Func::Signum => x.signum(),
            Func::Round => x.round(),
            Func::Floor => x.floor(),
            Func::Ceil => x.ceil(),
            Func::Trunc => x.trunc(),
            Func::Fract => x.fract(),
        }
    }

    /// Returns `f'(arg)`, the outer factor of the chain rule `d f(g) = f'(g) * dg`.
    ///
    /// Step-like functions return the constant zero.
    pub fn derivative_at(self, arg: &Expr) -> Expr {
        let one = || Expr::constant(1.0);
        let call = |func: Func| Expr::call(func, arg.clone());
        let square = || Expr::mul(arg.clone(), arg.clone());

        match self {
            // cos(e)
            Func::Sin => call(Func::Cos),
            // -sin(e)
            Func::Cos => Expr::neg(call(Func::Sin)),
            // 1 / (cos(e) * cos(e))
            Func::Tan => Expr::div(one(), Expr::mul(call(Func::Cos), call(Func::Cos))),
            // 1 / sqrt(1 - e^2)
            Func::Asin => Expr::div(one(), Expr::call(Func::Sqrt, Expr::sub(one(), square()))),
            // -(1 / sqrt(1 - e^2))
            Func::Acos => Expr::neg(Expr::div(
                one(),
                Expr::call(Func::Sqrt, Expr::sub(one(), square())),
            )),
            // 1 / (1 + e^2)
            Func::Atan => Expr::div(one(), Expr::add(one(), square())),
            Func::Sinh => call(Func::Cosh),
            Func::Cosh => call(Func::Sinh),
            // 1 - tanh(e)^2
            Func::Tanh => Expr::sub(one(), Expr::mul(call(Func::Tanh), call(Func::Tanh))),
            Func::Exp => call(Func::Exp),
            // 1 / e
            Func::Ln => Expr::div(one(), arg.clone()),
            Func::Log2 => Expr::div(one(), Expr::mul(arg.clone(), Expr::constant(LN_2))),
            Func::Log10 => Expr::div(one(), Expr::mul(arg.clone(), Expr::constant(LN_10))),
            // 1 / (2 * sqrt(e))
            Func::Sqrt => Expr::div(one(), Expr::mul(Expr::constant(2.0), call(Func::Sqrt))),
            // 1 / (3 * cbrt(e) * cbrt(e))
            Func::Cbrt => Expr::div(
                one(),
                Expr::mul(
                    Expr::constant(3.0),
                    Expr::mul(call(Func::Cbrt), call(Func::Cbrt)),
                ),
            ),
            Func::Abs => call(Func::Signum),
            Func::Fract => one(),
            Func::Signum | Func::Round | Func::Floor | Func::Ceil | Func::Trunc => {
                Expr::constant(0.0)
            }
        }
    }
}

impl std::fmt::Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_names_roundtrip() {
        for func in Func::ALL {
            assert_eq!(Func::from_name(func.name()), Some(func));
        }
        assert_eq!(Func::from_name("log"), Some(Func::Ln));
        assert_eq!(Func::from_name("foo"), None);
    }

    #[test]
    fn test_apply_both_widths() {
        assert_relative_eq!(Func::Sin.apply(2.0f64), 2.0f64.sin());
        assert_relative_eq!(Func::Sin.apply(2.0f32), 2.0f32.sin());
        assert_eq!(Func::Round.apply(2.3f64), 2.0);
        assert_eq!(Func::Round.apply(2.5f32), 3.0);
        assert_relative_eq!(Func::Fract.apply(2.25f64), 0.25);
    }

    #[test]
    fn test_domain_errors_propagate() {
        assert!(Func::Ln.apply(-1.0f64).is_nan());
        assert!(Func::Sqrt.apply(-1.0f32).is_nan());
        assert_eq!(Func::Ln.apply(0.0f64), f64::NEG_INFINITY);
    }

    #[test]
    fn test_step_functions_have_zero_derivative() {
        let x = Expr::var("x", 0);
        for func in Func::ALL.into_iter().filter(|f| f.is_step()) {
            assert_eq!(func.derivative_at(&x), Expr::Const(0.0));
        }
    }
}
