//! Three-way integer comparison for sorting callbacks.

use std::cmp::Ordering;

/// Compares two `i32` values, returning `-1`, `0` or `1`.
///
/// The sign matches `a - b` for every pair, including pairs where that
/// subtraction would overflow (`i32::MIN` vs `1`, `i32::MAX` vs `-1`).
#[inline]
#[must_use]
pub fn compare_i32(a: i32, b: i32) -> i32 {
    match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_is_zero() {
        assert_eq!(compare_i32(5, 5), 0);
        assert_eq!(compare_i32(i32::MIN, i32::MIN), 0);
    }

    #[test]
    fn boundary_pairs_keep_sign() {
        let values = [i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX];
        for &a in &values {
            for &b in &values {
                let expected = (i64::from(a) - i64::from(b)).signum() as i32;
                assert_eq!(compare_i32(a, b), expected, "a={a} b={b}");
            }
        }
    }

    #[test]
    fn sorts_with_slice_sort() {
        let mut v = vec![3, i32::MIN, 0, i32::MAX, -7];
        v.sort_by(|a, b| compare_i32(*a, *b).cmp(&0));
        assert_eq!(v, vec![i32::MIN, -7, 0, 3, i32::MAX]);
    }
}
