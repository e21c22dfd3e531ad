//! Expression Evaluation Benchmarks
//!
//! This benchmark suite measures the cost of the three things a numerical optimiser asks of
//! an expression: its value, its gradient and its Hessian. Each is measured in single and
//! double precision, next to a hand-written Rust baseline for the plain value.
//!
//! ## Benchmark Structure
//!
//! ### 1. Expression Evaluation (`benchmark_expressions`)
//! Compares hand-written Rust functions with compiled expressions in `f32` and `f64`.
//! Compilation is excluded since equations are built during setup.
//!
//! ### 2. Derivatives (`benchmark_derivatives`)
//! Evaluates gradients and Hessians. The derivative caches are filled once before
//! measuring, so only evaluation is timed.
//!
//! ### 3. Compilation Time (`benchmark_compilation_time`)
//! Measures parsing and compilation from a string, and the one-time cost of deriving the
//! full Hessian.
//!
//! ## Usage
//!
//! Run with: `cargo bench --bench expressions`

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mexpress::{parse, Equation, Precision};

/// Hand-written baselines, in the same order as `EXPRESSIONS`.
struct DirectEvaluator;

impl DirectEvaluator {
    /// Evaluates: 2.2 * a + 1.1
    fn evaluate_linear(x: &[f64]) -> f64 {
        2.2 * x[0] + 1.1
    }

    /// Evaluates: (a^3 + 2*a^2 - 5*a + 1) / (b^2 + 3*b + 2)
    fn evaluate_complex_poly(x: &[f64]) -> f64 {
        let (a, b) = (x[0], x[1]);
        (a * a * a + 2.0 * a * a - 5.0 * a + 1.0) / (b * b + 3.0 * b + 2.0)
    }

    /// Evaluates: ((a + b) * (a - b)) / ((c + 1) * (c - 1))
    fn evaluate_nested_expr(x: &[f64]) -> f64 {
        let (a, b, c) = (x[0], x[1], x[2]);
        ((a + b) * (a - b)) / ((c + 1.0) * (c - 1.0))
    }

    /// Evaluates: 2*x*y^2 + cos(z) + sin(Δ)
    fn evaluate_mixed(x: &[f64]) -> f64 {
        2.0 * x[0] * x[1] * x[1] + x[2].cos() + x[3].sin()
    }

    /// Evaluates: exp(-a) * sqrt(b + 3) / (1 + c^2) + atan(a / 2) - tanh(b)
    fn evaluate_transcendental(x: &[f64]) -> f64 {
        let (a, b, c) = (x[0], x[1], x[2]);
        (-a).exp() * (b + 3.0).sqrt() / (1.0 + c * c) + (a / 2.0).atan() - b.tanh()
    }
}

const EXPRESSIONS: [(&str, &str); 5] = [
    ("linear", "2.2 * a + 1.1"),
    ("complex_poly", "(a^3 + 2*a^2 - 5*a + 1) / (b^2 + 3*b + 2)"),
    ("nested_expr", "((a + b) * (a - b)) / ((c + 1) * (c - 1))"),
    ("mixed", "2*x*y^2 + cos(z) + sin(Δ)"),
    (
        "transcendental",
        "exp(-a) * sqrt(b + 3) / (1 + c^2) + atan(a / 2) - tanh(b)",
    ),
];

const POINT: [f64; 4] = [2.5, 1.8, 0.7, 0.3];

fn direct(index: usize, x: &[f64]) -> f64 {
    match index {
        0 => DirectEvaluator::evaluate_linear(x),
        1 => DirectEvaluator::evaluate_complex_poly(x),
        2 => DirectEvaluator::evaluate_nested_expr(x),
        3 => DirectEvaluator::evaluate_mixed(x),
        4 => DirectEvaluator::evaluate_transcendental(x),
        _ => unreachable!(),
    }
}

fn benchmark_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("Expression Evaluation");

    for (i, (name, source)) in EXPRESSIONS.iter().enumerate() {
        let double: Equation<f64> = Equation::new(*source).expect("benchmark expression parses");
        let single: Equation<f32> = Equation::new(*source).expect("benchmark expression parses");
        let x64 = &POINT[..double.n_vars()];
        let x32: Vec<f32> = x64.iter().map(|&v| v as f32).collect();

        group.bench_with_input(BenchmarkId::new("Direct", name), &x64, |b, x| {
            b.iter(|| black_box(direct(i, black_box(*x))))
        });

        group.bench_with_input(BenchmarkId::new("f64", name), &x64, |b, x| {
            b.iter(|| black_box(double.fun()(black_box(*x))))
        });

        group.bench_with_input(BenchmarkId::new("f32", name), &x32, |b, x| {
            b.iter(|| black_box(single.fun()(black_box(x.as_slice()))))
        });
    }

    group.finish();
}

fn benchmark_derivatives(c: &mut Criterion) {
    let mut group = c.benchmark_group("Derivatives");

    for (name, source) in EXPRESSIONS.iter() {
        for precision in [Precision::Single, Precision::Double] {
            let expr = parse(source, precision).expect("benchmark expression parses");
            let x = &POINT[..expr.n_vars()];

            // fill the caches outside the measurement
            expr.hessian(x).expect("point has the right length");

            group.bench_with_input(
                BenchmarkId::new(format!("gradient/{}", precision), name),
                &x,
                |b, x| b.iter(|| black_box(expr.gradient(black_box(*x)))),
            );

            group.bench_with_input(
                BenchmarkId::new(format!("hessian/{}", precision), name),
                &x,
                |b, x| b.iter(|| black_box(expr.hessian(black_box(*x)))),
            );
        }
    }

    group.finish();
}

fn benchmark_compilation_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("Compilation Time");

    for (name, source) in EXPRESSIONS.iter() {
        group.bench_with_input(BenchmarkId::new("Compile", name), source, |b, source| {
            b.iter(|| black_box(Equation::<f64>::new(*source)))
        });

        group.bench_with_input(BenchmarkId::new("Hessian", name), source, |b, source| {
            b.iter(|| {
                let equation = Equation::<f64>::new(*source).expect("benchmark expression parses");
                black_box(equation.hessian_expressions().len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_expressions,
    benchmark_derivatives,
    benchmark_compilation_time
);
criterion_main!(benches);
