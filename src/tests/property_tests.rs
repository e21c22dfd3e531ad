//! Property-based tests.
//!
//! Uses quickcheck for:
//! - Parser robustness on arbitrary input
//! - Unparse/parse round trips of random formulas
//! - Agreement between single and double precision
//! - Agreement between symbolic gradients and central differences

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

use crate::{parse, Equation, Precision};

const VARIABLES: [&str; 4] = ["x", "y", "z", "Δ"];

/// A random formula together with a point in [-1, 1]^4.
#[derive(Debug, Clone)]
struct Case {
    formula: String,
    point: Vec<f64>,
}

/// Which constructs the generator may use.
#[derive(Clone, Copy)]
enum Grammar {
    /// Every operator, function and constant
    Full,
    /// Only operations that stay well conditioned on [-1, 1]
    Smooth,
}

fn unit_interval(g: &mut Gen) -> f64 {
    (u32::arbitrary(g) as f64 / u32::MAX as f64) * 2.0 - 1.0
}

fn gen_leaf(g: &mut Gen, grammar: Grammar) -> String {
    let scale = match grammar {
        Grammar::Full => 200,
        Grammar::Smooth => 100,
    };
    match u8::arbitrary(g) % 6 {
        0 => format!("{}", (u16::arbitrary(g) % scale) as f64 / 100.0),
        1 if matches!(grammar, Grammar::Full) => ["PI", "E", "τ"][usize::arbitrary(g) % 3].to_string(),
        _ => VARIABLES[usize::arbitrary(g) % VARIABLES.len()].to_string(),
    }
}

fn gen_formula(g: &mut Gen, depth: usize, grammar: Grammar) -> String {
    if depth == 0 {
        return gen_leaf(g, grammar);
    }

    let (ops, fns): (&[&str], &[&str]) = match grammar {
        Grammar::Full => (
            &["+", "-", "*", "/", "^"],
            &[
                "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "exp", "ln",
                "log2", "log10", "sqrt", "cbrt", "abs", "signum", "round", "floor", "ceil",
                "trunc", "fract",
            ],
        ),
        Grammar::Smooth => (&["+", "-", "*"], &["sin", "cos", "tanh", "atan"]),
    };

    match u8::arbitrary(g) % 10 {
        0..=3 => {
            let op = ops[usize::arbitrary(g) % ops.len()];
            let left = gen_formula(g, depth - 1, grammar);
            let right = gen_formula(g, depth - 1, grammar);
            format!("({} {} {})", left, op, right)
        }
        4..=6 => {
            let f = fns[usize::arbitrary(g) % fns.len()];
            format!("{}({})", f, gen_formula(g, depth - 1, grammar))
        }
        7 => format!("-{}", gen_formula(g, depth - 1, grammar)),
        _ => gen_formula(g, depth - 1, grammar),
    }
}

fn gen_case(g: &mut Gen, grammar: Grammar) -> Case {
    // smooth formulas stay shallow so that f32 rounding stays far below the tolerances
    let depth = match grammar {
        Grammar::Full => g.size().min(4),
        Grammar::Smooth => g.size().min(3),
    };
    Case {
        formula: gen_formula(g, depth, grammar),
        point: (0..VARIABLES.len()).map(|_| unit_interval(g)).collect(),
    }
}

#[derive(Debug, Clone)]
struct FullCase(Case);

#[derive(Debug, Clone)]
struct SmoothCase(Case);

impl Arbitrary for FullCase {
    fn arbitrary(g: &mut Gen) -> Self {
        FullCase(gen_case(g, Grammar::Full))
    }
}

impl Arbitrary for SmoothCase {
    fn arbitrary(g: &mut Gen) -> Self {
        SmoothCase(gen_case(g, Grammar::Smooth))
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * b.abs().max(1.0)
}

#[test]
fn test_parser_never_panics_on_random_input() {
    fn prop_parser_no_panic(input: String) -> TestResult {
        // Parser should either succeed or return Err, never panic
        if let Ok(eq) = Equation::<f64>::new(input.as_str()) {
            let point = vec![0.5; eq.n_vars()];
            let _ = eq.evaluate(&point);
        }
        TestResult::passed()
    }
    QuickCheck::new()
        .tests(1000)
        .quickcheck(prop_parser_no_panic as fn(String) -> TestResult);
}

#[test]
fn test_parser_edge_cases() {
    let edge_cases = [
        "", "   ", "()", "((()))", "+++", "---x", "1+", "+1", "sin()", "sin(x,y)", "1..2",
        "1e999999", "1e-999999", "x^y^z", "((((x))))", "sin(cos(tan(exp(ln(x)))))",
        "x+y*z^w/a-b", "1/0", "0/0", "(-0)", "∞", "π", "round round 2.5",
    ];

    for case in &edge_cases {
        // Should not panic - may succeed or fail with error
        let _ = Equation::<f32>::new(*case);
    }

    assert!(Equation::<f64>::new("1e999999").is_ok());
    assert!(Equation::<f64>::new("sin(x,y)").is_err());
}

#[test]
fn test_unparse_round_trip() {
    fn prop_round_trip(case: FullCase) -> TestResult {
        let case = case.0;
        let original = match parse(&case.formula, Precision::Double) {
            Ok(expr) => expr,
            Err(_) => return TestResult::discard(),
        };

        let text = original.unparse();
        let reparsed = match parse(&text, Precision::Double) {
            Ok(expr) => expr,
            Err(err) => return TestResult::error(format!("'{}' does not reparse: {}", text, err)),
        };

        if reparsed.unparse() != text || reparsed.n_vars() != original.n_vars() {
            return TestResult::failed();
        }

        let x = &case.point[..original.n_vars()];
        match (original.evaluate(x), reparsed.evaluate(x)) {
            (Ok(a), Ok(b)) => TestResult::from_bool(same_value(a, b)),
            _ => TestResult::failed(),
        }
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop_round_trip as fn(FullCase) -> TestResult);
}

#[test]
fn test_precision_independence() {
    fn prop_single_matches_double(case: SmoothCase) -> TestResult {
        let case = case.0;
        let (single, double) = match (
            parse(&case.formula, Precision::Single),
            parse(&case.formula, Precision::Double),
        ) {
            (Ok(s), Ok(d)) => (s, d),
            _ => return TestResult::discard(),
        };

        let x = &case.point[..double.n_vars()];
        match (single.evaluate(x), double.evaluate(x)) {
            (Ok(a), Ok(b)) => TestResult::from_bool(close(a, b, 1e-3)),
            _ => TestResult::failed(),
        }
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop_single_matches_double as fn(SmoothCase) -> TestResult);
}

#[test]
fn test_gradient_matches_central_difference() {
    fn prop_gradient(case: SmoothCase) -> TestResult {
        let case = case.0;
        let eq = match Equation::<f64>::new(case.formula.as_str()) {
            Ok(eq) => eq,
            Err(_) => return TestResult::discard(),
        };

        let x = &case.point[..eq.n_vars()];
        let gradient = match eq.gradient(x) {
            Ok(gradient) => gradient,
            Err(_) => return TestResult::failed(),
        };

        let h = 1e-6;
        for (i, analytic) in gradient.iter().enumerate() {
            let mut forward = x.to_vec();
            let mut backward = x.to_vec();
            forward[i] += h;
            backward[i] -= h;
            let (Ok(f), Ok(b)) = (eq.evaluate(&forward), eq.evaluate(&backward)) else {
                return TestResult::failed();
            };
            let numeric = (f - b) / (2.0 * h);
            if !close(*analytic, numeric, 1e-4) {
                return TestResult::error(format!(
                    "d/d{} of '{}': symbolic {} vs numeric {}",
                    eq.sorted_variables()[i],
                    case.formula,
                    analytic,
                    numeric
                ));
            }
        }
        TestResult::passed()
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(prop_gradient as fn(SmoothCase) -> TestResult);
}

#[test]
fn test_hessian_is_symmetric() {
    fn prop_symmetric(case: FullCase) -> TestResult {
        let case = case.0;
        let eq = match Equation::<f64>::new(case.formula.as_str()) {
            Ok(eq) => eq,
            Err(_) => return TestResult::discard(),
        };

        let x = &case.point[..eq.n_vars()];
        let hessian = match eq.hessian(x) {
            Ok(hessian) => hessian,
            Err(_) => return TestResult::failed(),
        };
        let n = eq.n_vars();
        TestResult::from_bool(
            (0..n).all(|r| (0..n).all(|c| same_value(hessian[r][c], hessian[c][r]))),
        )
    }
    QuickCheck::new()
        .tests(100)
        .quickcheck(prop_symmetric as fn(FullCase) -> TestResult);
}
