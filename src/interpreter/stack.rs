//! Native stack growth for nested tag calls.
//!
//! Each `do`/`$$` call recurses through `run_region`, so deep M recursion
//! would otherwise exhaust the thread's stack before `MAX_CALL_DEPTH` is hit.

/// Run `f`, first growing the stack onto the heap when less than the red
/// zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const STACK_PER_CALL: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_CALL, f)
}

/// WASM manages its own stack; run `f` directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
