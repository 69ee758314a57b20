use super::*;

/// Native Rust types with a fixed element type.
pub trait HasDType: Copy {
    const DTYPE: ScalarDType;

    /// Append the native-endian encoding of `self`.
    fn extend_ne_bytes(self, out: &mut Vec<u8>);
}

macro_rules! impl_dtype_ext {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(impl HasDType for $ty {
            const DTYPE: ScalarDType = ScalarDType::$dtype;

            fn extend_ne_bytes(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }
        })*
    };
}

impl_dtype_ext! {
    u8 => UInt8, i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64, u64 => UInt64,
    f32 => Float32, f64 => Float64,
}

impl HasDType for bool {
    const DTYPE: ScalarDType = ScalarDType::Bool;

    fn extend_ne_bytes(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}
