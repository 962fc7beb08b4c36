/// Declares a transparent address-like newtype over an unsigned integer.
///
/// The generated type is ordered, hashable, serializable and formats as a
/// zero-padded hexadecimal number.
macro_rules! impl_ops {
    ($name:ident, $type:ty, $doc:expr) => {
        #[doc = concat!("A ", $doc, ".")]
        #[derive(
            Default,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $type);

        impl $name {
            #[doc = concat!("Wraps a raw value into `", stringify!($name), "`.")]
            pub const fn new(value: $type) -> Self {
                Self(value)
            }
        }

        impl From<$type> for $name {
            fn from(value: $type) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $type {
            fn from(value: $name) -> $type {
                value.0
            }
        }

        impl ::std::ops::Add<$type> for $name {
            type Output = $name;

            fn add(self, rhs: $type) -> Self::Output {
                Self(self.0.wrapping_add(rhs))
            }
        }

        impl ::std::ops::AddAssign<$type> for $name {
            fn add_assign(&mut self, rhs: $type) {
                self.0 = self.0.wrapping_add(rhs);
            }
        }

        impl ::std::ops::Sub<$type> for $name {
            type Output = $name;

            fn sub(self, rhs: $type) -> Self::Output {
                Self(self.0.wrapping_sub(rhs))
            }
        }

        impl ::std::ops::Sub<$name> for $name {
            type Output = $type;

            fn sub(self, rhs: $name) -> Self::Output {
                self.0.wrapping_sub(rhs.0)
            }
        }

        impl ::std::ops::BitAnd<$type> for $name {
            type Output = $name;

            fn bitand(self, rhs: $type) -> Self::Output {
                Self(self.0 & rhs)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(
                    f,
                    "0x{:0width$x}",
                    self.0,
                    width = 2 * ::std::mem::size_of::<$type>()
                )
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(self, f)
            }
        }

        impl ::std::fmt::LowerHex for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                ::std::fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use impl_ops;
