/// Clamps `value` to `[min, max]`
pub fn clip3<T: Ord>(min: T, max: T, value: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Saturates to the signed 8 bit range
pub fn clip_s8(value: i32) -> i32 {
    clip3(i8::MIN as i32, i8::MAX as i32, value)
}

pub const fn align8(value: u32) -> u32 {
    (value + 7) & !7
}

pub const fn align32(value: u32) -> u32 {
    (value + 31) & !31
}

/// Number of bits needed to code an index in `[0, n)`, `Ceil(Log2(n))`
pub const fn ceil_log2(n: u32) -> u32 {
    if n <= 1 { 0 } else { 32 - (n - 1).leading_zeros() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping() {
        assert_eq!(clip3(0, 15, -3), 0);
        assert_eq!(clip3(0, 15, 20), 15);
        assert_eq!(clip3(0, 15, 7), 7);
        assert_eq!(clip_s8(200), 127);
        assert_eq!(clip_s8(-300), -128);
    }

    #[test]
    fn alignment() {
        assert_eq!(align8(1), 8);
        assert_eq!(align8(64), 64);
        assert_eq!(align8(1921), 1928);
        assert_eq!(align32(1920 + 160), 2080);
    }

    #[test]
    fn bit_lengths() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(510), 9);
        assert_eq!(ceil_log2(512), 9);
    }
}
