//! Stack growth for the recursive tree walker.

/// Run `f`, first moving to a fresh stack segment when less than the red zone
/// remains on the current one.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const NEW_SEGMENT: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, NEW_SEGMENT, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
