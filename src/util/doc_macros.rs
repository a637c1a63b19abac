//! Macros for reducing doc comment boilerplate.

/// Documents the errors returned by the entry points that validate their
/// inputs before iterating.
macro_rules! errors_solve {
    () => {
        r"- `DegenerateModel`: the equation has degree 0 after normalization.
- `InvalidModel`: coefficients are not finite, or the secular poles are not distinct.
- `DegreeMismatch`: the context states a degree the equation does not have.
- `InvalidContext`: an option is out of range.
- `WorkerPool`: the worker pool could not be built.
"
    };
}
pub(crate) use errors_solve;

/// Documents the panic on division by an exact zero.
macro_rules! panic_division_by_zero {
    () => {
        r"Panics if the divisor is exactly zero, like integer division does.
"
    };
}
pub(crate) use panic_division_by_zero;
