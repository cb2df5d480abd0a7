//! Two integer functions and the computation that threads a value through them.
//!
//! Arithmetic wraps on overflow.

/// `a * 3`
fn local_f(a: i32) -> i32 {
    a.wrapping_mul(3)
}

/// `a * 6`
pub fn global_f(a: i32) -> i32 {
    a.wrapping_mul(6)
}

/// Thread 5 through both functions and return the sum of the two results
pub fn run() -> i32 {
    let a = 5;
    let b = local_f(a);
    let a = global_f(b);

    a.wrapping_add(b)
}
