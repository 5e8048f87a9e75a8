//! Stack growth for the recursive parser and evaluator.
//!
//! Nested expressions and function calls recurse on the host stack. Wrapping
//! the recursive entry points keeps deep (but legal) programs from
//! overflowing it; runaway user recursion is still cut off by the
//! interpreter's call depth limit.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
