/// Element type tag stored in a shared region's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ScalarKind {
    /// `i8`
    I8 = 1,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `bool`
    Bool,
}

impl ScalarKind {
    const ALL: [Self; 11] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Bool,
    ];

    pub(crate) fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| *kind as u32 == tag)
    }

    /// Rust name of the element type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
        }
    }
}

/// Types that can be stored in a shared region.
///
/// Values travel through a 64-bit slot; `from_bits(to_bits(v)) == v`.
pub trait SharedScalar: Copy + PartialEq + Send + Sync + 'static {
    /// Tag written to, and checked against, the region header.
    const KIND: ScalarKind;

    /// Encodes the value into the slot.
    fn to_bits(self) -> u64;

    /// Decodes the value from the slot.
    fn from_bits(bits: u64) -> Self;
}

macro_rules! impl_shared_integer {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            impl SharedScalar for $t {
                const KIND: ScalarKind = ScalarKind::$kind;

                #[inline]
                fn to_bits(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_bits(bits: u64) -> Self {
                    bits as $t
                }
            }
        )*
    };
}

impl_shared_integer!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
);

impl SharedScalar for f32 {
    const KIND: ScalarKind = ScalarKind::F32;

    fn to_bits(self) -> u64 {
        u64::from(f32::to_bits(self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl SharedScalar for f64 {
    const KIND: ScalarKind = ScalarKind::F64;

    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

impl SharedScalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn to_bits(self) -> u64 {
        u64::from(self)
    }

    fn from_bits(bits: u64) -> Self {
        bits != 0
    }
}
