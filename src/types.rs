use std::sync::Arc;

/// Type alias for a compiled function that evaluates a single expression.
///
/// This represents a function that:
/// - Takes a slice of input values corresponding to variables in slot order
/// - Returns a single result in the width it was compiled for
/// - Is both Send and Sync for thread safety
///
/// The slice length is checked by [`Equation`](crate::Equation) before the call. Called
/// directly, slots past the end of the slice read as NaN.
pub type CompiledFunction<T> = Arc<dyn Fn(&[T]) -> T + Send + Sync>;
