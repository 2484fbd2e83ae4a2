use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};
use crate::opcode::Width;

/// A memory value tagged with its wire width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl WireValue {
    pub fn width(self) -> Width {
        match self {
            Self::U8(_) => Width::W8,
            Self::U16(_) => Width::W16,
            Self::U32(_) => Width::W32,
            Self::U64(_) => Width::W64,
        }
    }

    /// Zero-extended value.
    pub fn as_u64(self) -> u64 {
        match self {
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::U64(v) => v,
        }
    }

    /// Narrow `value` to `width`, failing if it does not fit.
    pub fn from_u64(width: Width, value: u64) -> Result<Self> {
        let too_wide = || FrameError::WidthMismatch {
            expected: width.bytes(),
            actual: (u64::BITS - value.leading_zeros()).div_ceil(8) as usize,
        };
        Ok(match width {
            Width::W8 => Self::U8(u8::try_from(value).map_err(|_| too_wide())?),
            Width::W16 => Self::U16(u16::try_from(value).map_err(|_| too_wide())?),
            Width::W32 => Self::U32(u32::try_from(value).map_err(|_| too_wide())?),
            Width::W64 => Self::U64(value),
        })
    }

    /// Append the value in host byte order.
    pub fn put<B: BufMut>(self, dst: &mut B) {
        match self {
            Self::U8(v) => dst.put_u8(v),
            Self::U16(v) => dst.put_u16_ne(v),
            Self::U32(v) => dst.put_u32_ne(v),
            Self::U64(v) => dst.put_u64_ne(v),
        }
    }

    /// Read a `width`-byte value in host byte order.
    pub fn get<B: Buf>(width: Width, src: &mut B) -> Result<Self> {
        if src.remaining() < width.bytes() {
            return Err(FrameError::Truncated {
                needed: width.bytes(),
                available: src.remaining(),
            });
        }
        Ok(match width {
            Width::W8 => Self::U8(src.get_u8()),
            Width::W16 => Self::U16(src.get_u16_ne()),
            Width::W32 => Self::U32(src.get_u32_ne()),
            Width::W64 => Self::U64(src.get_u64_ne()),
        })
    }
}

/// A fixed-width integer that can be read from or written to emulator memory.
///
/// Implemented for every primitive integer. Types without a matching opcode
/// (`u128`, `i128`) still implement it so the failure surfaces as
/// [`FrameError::UnsupportedWidth`] at run time instead of a type error.
pub trait MemoryValue: Copy + Send + 'static {
    /// Size of the value in bytes.
    const SIZE: usize;

    /// Wire width, if the protocol has an opcode for it.
    fn width() -> Result<Width> {
        Width::from_size(Self::SIZE).ok_or(FrameError::UnsupportedWidth(Self::SIZE))
    }

    /// Reinterpret as a wire value of the same width.
    fn into_wire(self) -> Result<WireValue>;

    /// Reinterpret a wire value; widths must match exactly.
    fn from_wire(value: WireValue) -> Result<Self>;
}

macro_rules! memory_value {
    ($($ty:ty => $variant:ident($raw:ty)),* $(,)?) => {
        $(
            impl MemoryValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn into_wire(self) -> Result<WireValue> {
                    Ok(WireValue::$variant(self as $raw))
                }

                fn from_wire(value: WireValue) -> Result<Self> {
                    match value {
                        WireValue::$variant(raw) => Ok(raw as $ty),
                        other => Err(FrameError::WidthMismatch {
                            expected: Self::SIZE,
                            actual: other.width().bytes(),
                        }),
                    }
                }
            }
        )*
    };
}

memory_value!(
    u8 => U8(u8),
    i8 => U8(u8),
    u16 => U16(u16),
    i16 => U16(u16),
    u32 => U32(u32),
    i32 => U32(u32),
    u64 => U64(u64),
    i64 => U64(u64),
);

macro_rules! unsupported_memory_value {
    ($($ty:ty),*) => {
        $(
            impl MemoryValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn into_wire(self) -> Result<WireValue> {
                    Err(FrameError::UnsupportedWidth(Self::SIZE))
                }

                fn from_wire(_value: WireValue) -> Result<Self> {
                    Err(FrameError::UnsupportedWidth(Self::SIZE))
                }
            }
        )*
    };
}

unsupported_memory_value!(u128, i128);
