//! Conversion module for transforming parsed syntax trees into our internal expression representation.
//!
//! This is the second pass of parsing. The parser keeps variables by name because slots can
//! only be assigned once every name is known; this module binds each name to its slot in
//! the finalized [`Variables`] and folds operations whose operands are all constants.
//!
//! The main entry point is the `build_ast` function which runs the whole pipeline from
//! source text to an indexed expression tree.

use crate::{
    errors::EquationError,
    expr::{Expr, VarRef},
    lexer::{tokenize, Operator},
    parser::{parse_tokens, Ast},
    registry::Variables,
};

/// Parses a formula into an indexed expression tree and its variable mapping.
///
/// # Arguments
/// * `source` - The formula, e.g. `"2*x + y^2"`
///
/// # Returns
/// * `Result<(Expr, Variables), EquationError>` - The tree and the slot assignment it uses
///
/// # Example
/// ```
/// use mexpress::convert::build_ast;
///
/// let (expr, vars) = build_ast("y + x").unwrap();
/// assert_eq!(vars.names(), &["x", "y"]);
/// assert_eq!(expr.to_string(), "(y + x)");
/// ```
pub fn build_ast(source: &str) -> Result<(Expr, Variables), EquationError> {
    let tokens = tokenize(source)?;
    let (ast, registry) = parse_tokens(&tokens)?;
    let variables = registry.finalize();
    let expr = build_expr(&ast, &variables)?;
    Ok((expr, variables))
}

/// Converts a syntax tree into our internal expression representation.
///
/// Children are converted first, so a constant subtree collapses bottom-up into a single
/// `Expr::Const` (e.g. `round 2.3` becomes `2`). No other rewriting is done.
///
/// # Arguments
/// * `ast` - The syntax tree to convert
/// * `variables` - The slot assignment for every variable the tree references
///
/// # Errors
/// Returns `EquationError::VariableNotFound` if the tree references a name that has no slot.
pub fn build_expr(ast: &Ast, variables: &Variables) -> Result<Expr, EquationError> {
    let expr = match ast {
        Ast::Number(n) => Expr::Const(*n),

        Ast::Variable(name) => {
            let index = variables
                .index_of(name)
                .ok_or_else(|| EquationError::VariableNotFound(name.clone()))?;
            Expr::Var(VarRef {
                name: name.clone(),
                index,
            })
        }

        Ast::Neg(e) => Expr::Neg(Box::new(build_expr(e, variables)?)),

        Ast::Binary(op, l, r) => {
            let l = Box::new(build_expr(l, variables)?);
            let r = Box::new(build_expr(r, variables)?);
            match op {
                Operator::Add => Expr::Add(l, r),
                Operator::Sub => Expr::Sub(l, r),
                Operator::Mul => Expr::Mul(l, r),
                Operator::Div => Expr::Div(l, r),
                Operator::Pow => Expr::Pow(l, r),
            }
        }

        Ast::Call(func, e) => Expr::Call(*func, Box::new(build_expr(e, variables)?)),
    };

    Ok(expr.fold_constants())
}
