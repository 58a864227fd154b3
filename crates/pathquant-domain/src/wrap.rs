//! Two's-complement wraparound arithmetic over interval sets.
//!
//! A comparison side `c*x + k` is evaluated in the variable's declared width
//! by reducing mod 2^bits into the representable range. Solving such a
//! comparison exactly means enumerating the wraparound windows `m` for which
//! `c*x + k - m*2^bits` lands in the target interval; window enumeration is
//! exact because each unwrapped value lands in exactly one window.

use pathquant_ir::{CmpOp, Signedness};

use crate::interval::IntervalSet;

/// `2^bits`. Widths are capped at 64, so this always fits an i128.
pub fn modulus(bits: u32) -> i128 {
    1i128 << bits
}

/// Inclusive representable range of a declared width.
pub fn repr_range(bits: u32, signedness: Signedness) -> (i128, i128) {
    let m = modulus(bits);
    match signedness {
        Signedness::Unsigned => (0, m - 1),
        Signedness::Signed => (-(m / 2), m / 2 - 1),
    }
}

/// Reduce `v` into the representable range of the given width.
pub fn wrap_value(v: i128, bits: u32, signedness: Signedness) -> i128 {
    let m = modulus(bits);
    let r = v.rem_euclid(m);
    match signedness {
        Signedness::Unsigned => r,
        Signedness::Signed => {
            if r >= m / 2 {
                r - m
            } else {
                r
            }
        }
    }
}

/// Floor division, exact for negative operands.
pub fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Ceiling division, exact for negative operands.
pub fn div_ceil(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if r != 0 && ((r < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

pub fn cmp_holds(a: i128, op: CmpOp, b: i128) -> bool {
    match op {
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
    }
}

/// The set of integers `x` with `lo <= c*x + k <= hi`, for `c != 0`.
///
/// Unbounded in `x`; callers intersect with the variable's range.
pub fn solve_affine_between(c: i128, k: i128, lo: i128, hi: i128) -> IntervalSet {
    debug_assert!(c != 0);
    if lo > hi {
        return IntervalSet::empty();
    }
    if c > 0 {
        IntervalSet::range(div_ceil(lo - k, c), div_floor(hi - k, c))
    } else {
        IntervalSet::range(div_ceil(hi - k, c), div_floor(lo - k, c))
    }
}

/// Representable values satisfying `value op rhs`, as intervals within
/// `[rmin, rmax]`. The rhs is a plain integer and is clamped, not wrapped.
pub fn target_set(op: CmpOp, rhs: i128, rmin: i128, rmax: i128) -> IntervalSet {
    match op {
        CmpOp::Lt => IntervalSet::range(rmin, rmax.min(rhs.saturating_sub(1))),
        CmpOp::Le => IntervalSet::range(rmin, rmax.min(rhs)),
        CmpOp::Gt => IntervalSet::range(rmin.max(rhs.saturating_add(1)), rmax),
        CmpOp::Ge => IntervalSet::range(rmin.max(rhs), rmax),
        CmpOp::Eq => {
            if rmin <= rhs && rhs <= rmax {
                IntervalSet::point(rhs)
            } else {
                IntervalSet::empty()
            }
        }
        CmpOp::Ne => {
            if rmin <= rhs && rhs <= rmax {
                IntervalSet::point(rhs).complement_within(rmin, rmax)
            } else {
                IntervalSet::range(rmin, rmax)
            }
        }
    }
}

/// Solve `wrap(c*x + k) op rhs` over the full representable range of `x`.
pub fn solve_wrapped_cmp(
    c: i128,
    k: i128,
    op: CmpOp,
    rhs: i128,
    bits: u32,
    signedness: Signedness,
) -> IntervalSet {
    let (rmin, rmax) = repr_range(bits, signedness);
    if c == 0 {
        let value = wrap_value(k, bits, signedness);
        return if cmp_holds(value, op, rhs) {
            IntervalSet::range(rmin, rmax)
        } else {
            IntervalSet::empty()
        };
    }

    let m = modulus(bits);
    let target = target_set(op, rhs, rmin, rmax);
    let (y_min, y_max) = if c > 0 {
        (c * rmin + k, c * rmax + k)
    } else {
        (c * rmax + k, c * rmin + k)
    };

    let mut pieces = Vec::new();
    for &(tlo, thi) in target.ranges() {
        let w_lo = div_ceil(y_min - thi, m);
        let w_hi = div_floor(y_max - tlo, m);
        for w in w_lo..=w_hi {
            let sol = solve_affine_between(c, k, tlo + w * m, thi + w * m);
            pieces.extend(sol.ranges().iter().copied());
        }
    }
    IntervalSet::from_ranges(pieces).intersect(&IntervalSet::range(rmin, rmax))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::bigint::BigInt;

    #[test]
    fn wrap_value_signed() {
        assert_eq!(wrap_value(0, 8, Signedness::Signed), 0);
        assert_eq!(wrap_value(127, 8, Signedness::Signed), 127);
        assert_eq!(wrap_value(128, 8, Signedness::Signed), -128);
        assert_eq!(wrap_value(-129, 8, Signedness::Signed), 127);
        assert_eq!(wrap_value(256, 8, Signedness::Signed), 0);
    }

    #[test]
    fn wrap_value_unsigned() {
        assert_eq!(wrap_value(255, 8, Signedness::Unsigned), 255);
        assert_eq!(wrap_value(256, 8, Signedness::Unsigned), 0);
        assert_eq!(wrap_value(-1, 8, Signedness::Unsigned), 255);
    }

    #[test]
    fn floor_and_ceil_division() {
        assert_eq!(div_floor(7, 2), 3);
        assert_eq!(div_floor(-7, 2), -4);
        assert_eq!(div_floor(7, -2), -4);
        assert_eq!(div_ceil(7, 2), 4);
        assert_eq!(div_ceil(-7, 2), -3);
        assert_eq!(div_ceil(7, -2), -3);
        assert_eq!(div_floor(6, 3), 2);
        assert_eq!(div_ceil(6, 3), 2);
    }

    #[test]
    fn affine_between_negative_coefficient() {
        // -2x in [-10, 5]  =>  x in [-2, 5]
        let s = solve_affine_between(-2, 0, -10, 5);
        assert_eq!(s.ranges(), &[(-2, 5)]);
    }

    #[test]
    fn wrapped_identity_comparison() {
        // wrap(x) >= 100 over signed 32-bit is just [100, i32::MAX]
        let s = solve_wrapped_cmp(1, 0, CmpOp::Ge, 100, 32, Signedness::Signed);
        assert_eq!(s.ranges(), &[(100, i32::MAX as i128)]);
    }

    #[test]
    fn wrapped_negated_doubling() {
        // wrap(-2x) <= 200 over signed 32-bit picks up three windows.
        let s = solve_wrapped_cmp(-2, 0, CmpOp::Le, 200, 32, Signedness::Signed);
        let expected = IntervalSet::from_ranges([
            (-(1i128 << 31), -(1i128 << 30)),
            (-100, 1i128 << 30),
            ((1i128 << 31) - 100, (1i128 << 31) - 1),
        ]);
        assert_eq!(s, expected);
        assert_eq!(s.count(), BigInt::from(2147483850u64));
    }

    #[test]
    fn rhs_outside_repr_range_clamps() {
        // wrap(x) < 2^40 over signed 32-bit is always true.
        let s = solve_wrapped_cmp(1, 0, CmpOp::Lt, 1 << 40, 32, Signedness::Signed);
        assert_eq!(s.count(), BigInt::from(1u128 << 32));
        // wrap(x) > 2^40 is never true.
        let s = solve_wrapped_cmp(1, 0, CmpOp::Gt, 1 << 40, 32, Signedness::Signed);
        assert!(s.is_empty());
    }

    #[test]
    fn constant_side_folds() {
        let all = solve_wrapped_cmp(0, 300, CmpOp::Eq, 44, 8, Signedness::Unsigned);
        // wrap(300) in u8 is 44.
        assert_eq!(all.count(), BigInt::from(256));
        let none = solve_wrapped_cmp(0, 300, CmpOp::Ne, 44, 8, Signedness::Unsigned);
        assert!(none.is_empty());
    }

    #[test]
    fn matches_brute_force_on_small_widths() {
        for bits in 1..=5u32 {
            for &sg in &[Signedness::Signed, Signedness::Unsigned] {
                let (rmin, rmax) = repr_range(bits, sg);
                for c in [-5i128, -2, -1, 1, 3] {
                    for k in [-7i128, 0, 2] {
                        for rhs in [rmin - 1, 0, 1, rmax] {
                            for op in [CmpOp::Lt, CmpOp::Le, CmpOp::Gt, CmpOp::Ge, CmpOp::Eq, CmpOp::Ne] {
                                let s = solve_wrapped_cmp(c, k, op, rhs, bits, sg);
                                for x in rmin..=rmax {
                                    let holds = cmp_holds(wrap_value(c * x + k, bits, sg), op, rhs);
                                    assert_eq!(
                                        s.contains(x),
                                        holds,
                                        "bits={bits} sg={sg:?} c={c} k={k} op={op:?} rhs={rhs} x={x}"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
