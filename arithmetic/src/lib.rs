use core::num::{NonZeroU64, NonZeroUsize};

use easy_ext::ext;

#[ext(UsizeExt)]
pub impl usize {
    #[inline]
    #[must_use]
    fn is_odd(self) -> bool {
        self % 2 == 1
    }

    #[inline]
    #[must_use]
    fn prev_multiple_of(self, factor: NonZeroUsize) -> Self {
        self - self % factor
    }

    /// Returns the depth of the smallest perfect binary tree with at least `self` leaves.
    #[inline]
    #[must_use]
    fn ilog2_ceil(self) -> u8 {
        self.checked_next_power_of_two()
            .map_or(Self::BITS, Self::trailing_zeros)
            .try_into()
            .expect("number of bits in usize should fit in u8")
    }
}

#[ext(U64Ext)]
pub impl u64 {
    #[inline]
    #[must_use]
    fn prev_multiple_of(self, factor: NonZeroU64) -> Self {
        self - self % factor
    }

    #[inline]
    #[must_use]
    fn ilog2_ceil(self) -> u8 {
        self.checked_next_power_of_two()
            .map_or(Self::BITS, Self::trailing_zeros)
            .try_into()
            .expect("number of bits in u64 should fit in u8")
    }

    #[inline]
    #[must_use]
    fn prev_power_of_two(self) -> Self {
        1 << self.ilog2()
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use test_case::test_case;

    use super::*;

    #[test_case(0 => 0)]
    #[test_case(1 => 0)]
    #[test_case(2 => 1)]
    #[test_case(3 => 2)]
    #[test_case(4 => 2)]
    #[test_case(5 => 3)]
    #[test_case(1 << 40 => 40)]
    #[test_case((1 << 40) + 1 => 41)]
    fn u64_ilog2_ceil(value: u64) -> u8 {
        value.ilog2_ceil()
    }

    #[test_case(0 => 0)]
    #[test_case(1 => 0)]
    #[test_case(7 => 3)]
    #[test_case(8 => 3)]
    #[test_case(9 => 4)]
    fn usize_ilog2_ceil(value: usize) -> u8 {
        value.ilog2_ceil()
    }

    #[test]
    fn prev_multiple_of_rounds_down() {
        let increment = nonzero!(1_000_000_000_u64);

        assert_eq!(31_999_999_999_u64.prev_multiple_of(increment), 31_000_000_000);
        assert_eq!(32_000_000_000_u64.prev_multiple_of(increment), 32_000_000_000);
        assert_eq!(13_usize.prev_multiple_of(nonzero!(4_usize)), 12);
    }

    #[test]
    fn prev_power_of_two_keeps_highest_bit() {
        assert_eq!(1_u64.prev_power_of_two(), 1);
        assert_eq!(5_u64.prev_power_of_two(), 4);
        assert_eq!(64_u64.prev_power_of_two(), 64);
    }
}
