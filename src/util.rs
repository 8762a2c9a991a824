//! Small helpers shared by the codec modules.

#[inline(always)]
#[cold]
fn cold_path() {}

/// "Annotation" to hint that a branch of an if-statement is likely to occur.
#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if !b {
        cold_path();
    }
    b
}

/// "Annotation" to hint that a branch of an if-statement is _not likely_ to occur.
#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold_path();
    }
    b
}

/// Returns `2^exp` exactly.
///
/// `exp` must be within the normal `f64` exponent range, `-1022..=1023`.
#[inline]
pub(crate) fn pow2(exp: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exp), "exponent {exp} out of range");
    #[allow(clippy::cast_sign_loss)]
    let biased = (exp + 1023) as u64;
    f64::from_bits(biased << 52)
}
