//! Macro-generated typed, ordered accessors for [`super::AtomicBuffer`].
//!
//! One macro invocation per primitive width/type instead of hand-duplicated
//! methods. Method names are passed explicitly rather than built with
//! identifier concatenation, so no extra proc-macro crate is needed.

use crate::error::BufferError;
use std::sync::atomic::Ordering;

/// Marker for the byte-order a `_le`/`_be` accessor targets. Exposed so
/// callers writing generic code over both variants can name it; the typed
/// accessors themselves take no runtime parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderTarget {
    /// Little-endian.
    Little,
    /// Big-endian.
    Big,
    /// Platform-native (whatever `cfg(target_endian)` resolves to).
    Native,
}

/// Generates the full ordered-accessor surface for one integer type.
macro_rules! int_methods {
    (
        $t:ty, $at:ty,
        $get:ident, $put:ident,
        $get_plain:ident, $put_plain:ident,
        $get_opaque:ident, $put_opaque:ident,
        $get_acquire:ident, $put_release:ident,
        $cas:ident, $get_and_set:ident, $get_and_add:ident
    ) => {
        #[doc = concat!("Sequentially-consistent (volatile) load of a `", stringify!($t), "` at `index`.")]
        pub fn $get(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            // SAFETY: `ptr_ordered` validated bounds and alignment.
            Ok(unsafe { (*ptr.cast::<$at>()).load(Ordering::SeqCst) })
        }

        #[doc = concat!("Sequentially-consistent (volatile) store of a `", stringify!($t), "` at `index`.")]
        pub fn $put(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            // SAFETY: `ptr_ordered` validated bounds and alignment.
            unsafe { (*ptr.cast::<$at>()).store(value, Ordering::SeqCst) };
            Ok(())
        }

        #[doc = concat!("Non-atomic load of a `", stringify!($t), "`; caller must externally synchronize.")]
        pub fn $get_plain(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_plain(index, std::mem::size_of::<$t>())?;
            // SAFETY: `ptr_plain` validated bounds; unaligned-safe read.
            Ok(unsafe { ptr.cast::<$t>().read_unaligned() })
        }

        #[doc = concat!("Non-atomic store of a `", stringify!($t), "`; caller must externally synchronize.")]
        pub fn $put_plain(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_plain(index, std::mem::size_of::<$t>())?;
            // SAFETY: `ptr_plain` validated bounds; unaligned-safe write.
            unsafe { ptr.cast::<$t>().write_unaligned(value) };
            Ok(())
        }

        #[doc = concat!("Atomic, unordered (`Relaxed`) load of a `", stringify!($t), "`.")]
        pub fn $get_opaque(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            Ok(unsafe { (*ptr.cast::<$at>()).load(Ordering::Relaxed) })
        }

        #[doc = concat!("Atomic, unordered (`Relaxed`) store of a `", stringify!($t), "`.")]
        pub fn $put_opaque(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            unsafe { (*ptr.cast::<$at>()).store(value, Ordering::Relaxed) };
            Ok(())
        }

        #[doc = concat!("Acquire-load of a `", stringify!($t), "`.")]
        pub fn $get_acquire(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            Ok(unsafe { (*ptr.cast::<$at>()).load(Ordering::Acquire) })
        }

        #[doc = concat!("Release-store of a `", stringify!($t), "`.")]
        pub fn $put_release(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            unsafe { (*ptr.cast::<$at>()).store(value, Ordering::Release) };
            Ok(())
        }

        #[doc = concat!("Sequentially-consistent compare-and-set of a `", stringify!($t), "`. Returns whether it succeeded.")]
        pub fn $cas(&self, index: usize, expected: $t, new: $t) -> Result<bool, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            let cell = unsafe { &*ptr.cast::<$at>() };
            Ok(cell
                .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok())
        }

        #[doc = concat!("Atomic exchange of a `", stringify!($t), "`, returning the previous value.")]
        pub fn $get_and_set(&self, index: usize, new: $t) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            Ok(unsafe { (*ptr.cast::<$at>()).swap(new, Ordering::AcqRel) })
        }

        #[doc = concat!("Atomic fetch-and-add of a `", stringify!($t), "`, returning the previous value.")]
        pub fn $get_and_add(&self, index: usize, delta: $t) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            Ok(unsafe { (*ptr.cast::<$at>()).fetch_add(delta, Ordering::AcqRel) })
        }
    };
}

/// Byte-order overload pair for a multi-byte integer type, built atop the
/// plain non-atomic byte accessors: byte-order conversion is a
/// representation choice orthogonal to ordering, so these do not claim any
/// ordering guarantee beyond `put_bytes`/`get_bytes`. Callers pair a
/// `_le`/`_be` write with a separate ordered publish (e.g. the broadcast
/// transmitter writes a payload before a release-store of its length).
macro_rules! int_byteorder_methods {
    ($t:ty, $get_le:ident, $put_le:ident, $get_be:ident, $put_be:ident) => {
        #[doc = concat!("Little-endian load of a `", stringify!($t), "`.")]
        pub fn $get_le(&self, index: usize) -> Result<$t, BufferError> {
            let mut bytes = [0u8; std::mem::size_of::<$t>()];
            self.get_bytes(index, &mut bytes)?;
            Ok(<$t>::from_le_bytes(bytes))
        }

        #[doc = concat!("Little-endian store of a `", stringify!($t), "`.")]
        pub fn $put_le(&self, index: usize, value: $t) -> Result<(), BufferError> {
            self.put_bytes(index, &value.to_le_bytes())
        }

        #[doc = concat!("Big-endian load of a `", stringify!($t), "`.")]
        pub fn $get_be(&self, index: usize) -> Result<$t, BufferError> {
            let mut bytes = [0u8; std::mem::size_of::<$t>()];
            self.get_bytes(index, &mut bytes)?;
            Ok(<$t>::from_be_bytes(bytes))
        }

        #[doc = concat!("Big-endian store of a `", stringify!($t), "`.")]
        pub fn $put_be(&self, index: usize, value: $t) -> Result<(), BufferError> {
            self.put_bytes(index, &value.to_be_bytes())
        }
    };
}

/// Float accessors are implemented by bit-casting through the same-width
/// unsigned atomic, since `core` has no `AtomicF32`/`AtomicF64`. CAS/
/// fetch-add are not offered for floats; nothing in this crate needs a
/// floating-point read-modify-write.
macro_rules! float_methods {
    (
        $t:ty, $at:ty,
        $get:ident, $put:ident,
        $get_plain:ident, $put_plain:ident,
        $get_opaque:ident, $put_opaque:ident,
        $get_acquire:ident, $put_release:ident,
        $get_and_set:ident
    ) => {
        #[doc = concat!("Sequentially-consistent (volatile) load of an `", stringify!($t), "`.")]
        pub fn $get(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            let bits = unsafe { (*ptr.cast::<$at>()).load(Ordering::SeqCst) };
            Ok(<$t>::from_bits(bits))
        }

        #[doc = concat!("Sequentially-consistent (volatile) store of an `", stringify!($t), "`.")]
        pub fn $put(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            unsafe { (*ptr.cast::<$at>()).store(value.to_bits(), Ordering::SeqCst) };
            Ok(())
        }

        #[doc = concat!("Non-atomic load of an `", stringify!($t), "`; caller must externally synchronize.")]
        pub fn $get_plain(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_plain(index, std::mem::size_of::<$t>())?;
            Ok(unsafe { ptr.cast::<$t>().read_unaligned() })
        }

        #[doc = concat!("Non-atomic store of an `", stringify!($t), "`; caller must externally synchronize.")]
        pub fn $put_plain(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_plain(index, std::mem::size_of::<$t>())?;
            unsafe { ptr.cast::<$t>().write_unaligned(value) };
            Ok(())
        }

        #[doc = concat!("Atomic, unordered (`Relaxed`) load of an `", stringify!($t), "`.")]
        pub fn $get_opaque(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            let bits = unsafe { (*ptr.cast::<$at>()).load(Ordering::Relaxed) };
            Ok(<$t>::from_bits(bits))
        }

        #[doc = concat!("Atomic, unordered (`Relaxed`) store of an `", stringify!($t), "`.")]
        pub fn $put_opaque(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            unsafe { (*ptr.cast::<$at>()).store(value.to_bits(), Ordering::Relaxed) };
            Ok(())
        }

        #[doc = concat!("Acquire-load of an `", stringify!($t), "`.")]
        pub fn $get_acquire(&self, index: usize) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            let bits = unsafe { (*ptr.cast::<$at>()).load(Ordering::Acquire) };
            Ok(<$t>::from_bits(bits))
        }

        #[doc = concat!("Release-store of an `", stringify!($t), "`.")]
        pub fn $put_release(&self, index: usize, value: $t) -> Result<(), BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            unsafe { (*ptr.cast::<$at>()).store(value.to_bits(), Ordering::Release) };
            Ok(())
        }

        #[doc = concat!("Atomic exchange of an `", stringify!($t), "`, returning the previous value.")]
        pub fn $get_and_set(&self, index: usize, new: $t) -> Result<$t, BufferError> {
            let ptr = self.ptr_ordered(index, std::mem::size_of::<$t>())?;
            let prev = unsafe { (*ptr.cast::<$at>()).swap(new.to_bits(), Ordering::AcqRel) };
            Ok(<$t>::from_bits(prev))
        }
    };
}

pub(crate) use float_methods;
pub(crate) use int_byteorder_methods;
pub(crate) use int_methods;

/// Wires up every typed accessor onto `$Buf` by invoking the per-type macros
/// above once per supported primitive: i8, u8, i16, u16, i32, u32, i64, u64,
/// f32, f64 (`char` is modeled as `u16`).
macro_rules! impl_typed_accessors {
    ($Buf:ident) => {
        impl<'a> $Buf<'a> {
            fn ptr_ordered(&self, index: usize, width: usize) -> Result<*mut u8, BufferError> {
                self.alignment_check(index, width)?;
                self.ptr_at(index, width)
            }

            fn ptr_plain(&self, index: usize, width: usize) -> Result<*mut u8, BufferError> {
                self.ptr_at(index, width)
            }

            int_methods!(
                i8, std::sync::atomic::AtomicI8,
                get_i8, put_i8,
                get_i8_plain, put_i8_plain,
                get_i8_opaque, put_i8_opaque,
                get_i8_acquire, put_i8_release,
                compare_and_set_i8, get_and_set_i8, get_and_add_i8
            );

            int_methods!(
                u8, std::sync::atomic::AtomicU8,
                get_u8, put_u8,
                get_u8_plain, put_u8_plain,
                get_u8_opaque, put_u8_opaque,
                get_u8_acquire, put_u8_release,
                compare_and_set_u8, get_and_set_u8, get_and_add_u8
            );

            int_methods!(
                i16, std::sync::atomic::AtomicI16,
                get_i16, put_i16,
                get_i16_plain, put_i16_plain,
                get_i16_opaque, put_i16_opaque,
                get_i16_acquire, put_i16_release,
                compare_and_set_i16, get_and_set_i16, get_and_add_i16
            );
            int_byteorder_methods!(i16, get_i16_le, put_i16_le, get_i16_be, put_i16_be);

            int_methods!(
                u16, std::sync::atomic::AtomicU16,
                get_u16, put_u16,
                get_u16_plain, put_u16_plain,
                get_u16_opaque, put_u16_opaque,
                get_u16_acquire, put_u16_release,
                compare_and_set_u16, get_and_set_u16, get_and_add_u16
            );
            int_byteorder_methods!(u16, get_u16_le, put_u16_le, get_u16_be, put_u16_be);

            int_methods!(
                i32, std::sync::atomic::AtomicI32,
                get_i32, put_i32,
                get_i32_plain, put_i32_plain,
                get_i32_opaque, put_i32_opaque,
                get_i32_acquire, put_i32_release,
                compare_and_set_i32, get_and_set_i32, get_and_add_i32
            );
            int_byteorder_methods!(i32, get_i32_le, put_i32_le, get_i32_be, put_i32_be);

            int_methods!(
                u32, std::sync::atomic::AtomicU32,
                get_u32, put_u32,
                get_u32_plain, put_u32_plain,
                get_u32_opaque, put_u32_opaque,
                get_u32_acquire, put_u32_release,
                compare_and_set_u32, get_and_set_u32, get_and_add_u32
            );
            int_byteorder_methods!(u32, get_u32_le, put_u32_le, get_u32_be, put_u32_be);

            int_methods!(
                i64, std::sync::atomic::AtomicI64,
                get_i64, put_i64,
                get_i64_plain, put_i64_plain,
                get_i64_opaque, put_i64_opaque,
                get_i64_acquire, put_i64_release,
                compare_and_set_i64, get_and_set_i64, get_and_add_i64
            );
            int_byteorder_methods!(i64, get_i64_le, put_i64_le, get_i64_be, put_i64_be);

            int_methods!(
                u64, std::sync::atomic::AtomicU64,
                get_u64, put_u64,
                get_u64_plain, put_u64_plain,
                get_u64_opaque, put_u64_opaque,
                get_u64_acquire, put_u64_release,
                compare_and_set_u64, get_and_set_u64, get_and_add_u64
            );
            int_byteorder_methods!(u64, get_u64_le, put_u64_le, get_u64_be, put_u64_be);

            float_methods!(
                f32, std::sync::atomic::AtomicU32,
                get_f32, put_f32,
                get_f32_plain, put_f32_plain,
                get_f32_opaque, put_f32_opaque,
                get_f32_acquire, put_f32_release,
                get_and_set_f32
            );

            float_methods!(
                f64, std::sync::atomic::AtomicU64,
                get_f64, put_f64,
                get_f64_plain, put_f64_plain,
                get_f64_opaque, put_f64_opaque,
                get_f64_acquire, put_f64_release,
                get_and_set_f64
            );
        }
    };
}

pub(crate) use impl_typed_accessors;
