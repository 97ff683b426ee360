use num_traits::ops::wrapping::{WrappingAdd, WrappingSub};
use num_traits::Zero;

/// Element types that support atomic delta operations.
///
/// Integer deltas wrap on overflow; float deltas follow IEEE-754 arithmetic.
pub trait Numeric: Copy + PartialEq + Zero + Send + Sync + 'static {
    /// `self + delta`.
    fn add_delta(self, delta: Self) -> Self;

    /// `self - delta`.
    fn sub_delta(self, delta: Self) -> Self;
}

macro_rules! impl_numeric_wrapping {
    ($($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn add_delta(self, delta: Self) -> Self {
                    WrappingAdd::wrapping_add(&self, &delta)
                }

                #[inline]
                fn sub_delta(self, delta: Self) -> Self {
                    WrappingSub::wrapping_sub(&self, &delta)
                }
            }
        )*
    };
}

macro_rules! impl_numeric_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn add_delta(self, delta: Self) -> Self {
                    self + delta
                }

                #[inline]
                fn sub_delta(self, delta: Self) -> Self {
                    self - delta
                }
            }
        )*
    };
}

impl_numeric_wrapping!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_numeric_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_deltas_wrap() {
        assert_eq!(i32::MAX.add_delta(1), i32::MIN);
        assert_eq!(0_u8.sub_delta(1), u8::MAX);
        assert_eq!(5_i64.sub_delta(7), -2);
    }

    #[test]
    fn test_float_deltas() {
        assert!((1.5_f64.add_delta(0.25) - 1.75).abs() < f64::EPSILON);
        assert!((1.0_f32.sub_delta(2.0) + 1.0).abs() < f32::EPSILON);
    }
}
