macro_rules! impl_base {
    ($type:ty) => {
        impl ::std::fmt::Debug for Hex<$type> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                impl_base_fmt(f, self.0)
            }
        }

        impl ::std::fmt::Display for Hex<$type> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                impl_base_fmt(f, self.0)
            }
        }
    };
}

fn impl_base_fmt<T>(f: &mut ::std::fmt::Formatter, data: T) -> ::std::fmt::Result
where
    T: Copy + ::std::fmt::LowerHex,
{
    match size_of::<T>() {
        1 => write!(f, "0x{:02x}", data),
        2 => write!(f, "0x{:04x}", data),
        4 => write!(f, "0x{:08x}", data),
        _ => write!(f, "0x{:x}", data),
    }
}

/// A hexadecimal representation of a value.
///
/// Register and descriptor words are logged through this wrapper so that
/// they always show up zero-padded to their natural width.
///
/// # Examples
///
/// ```
/// # use we32k_core::Hex;
/// assert_eq!(format!("{}", Hex(0x2au16)), "0x002a");
/// assert_eq!(format!("{}", Hex(0x2000u32)), "0x00002000");
/// ```
pub struct Hex<T>(pub T);

impl_base!(u8);
impl_base!(u16);
impl_base!(u32);
impl_base!(usize);
