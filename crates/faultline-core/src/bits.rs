//! Bit-length lookup.

/// `floor(log2(b))` for every byte value `b`, with `-1` for zero.
pub const LOG2_LOOKUP: [i32; 256] = build_log2_lookup();

const fn build_log2_lookup() -> [i32; 256] {
    let mut table = [0i32; 256];
    table[0] = -1;
    let mut i = 1usize;
    while i < 256 {
        table[i] = 7 - (i as u8).leading_zeros() as i32;
        i += 1;
    }
    table
}

/// Position of the highest set bit of `byte`, or `-1` when `byte == 0`.
#[inline]
#[must_use]
pub const fn log2_floor(byte: u8) -> i32 {
    LOG2_LOOKUP[byte as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors() {
        assert_eq!(log2_floor(0), -1);
        assert_eq!(log2_floor(1), 0);
        assert_eq!(log2_floor(2), 1);
        assert_eq!(log2_floor(3), 1);
        assert_eq!(log2_floor(127), 6);
        assert_eq!(log2_floor(128), 7);
        assert_eq!(log2_floor(255), 7);
    }

    #[test]
    fn table_matches_integer_log() {
        for b in 1..=255u8 {
            assert_eq!(log2_floor(b), b.ilog2() as i32, "byte {b}");
        }
    }

    #[test]
    fn powers_of_two_start_new_run() {
        for shift in 0..8 {
            let b = 1u8 << shift;
            assert_eq!(log2_floor(b), shift);
            if b > 1 {
                assert_eq!(log2_floor(b - 1), shift - 1);
            }
        }
    }
}
