use std::fmt;

use serde::Serialize;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self(index)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

index_type!(
    /// Position of a value in the caller's ordered value list.
    ValueId,
    "value #"
);
index_type!(
    /// Index of a texture group (one render-target attachment per step).
    TextureGroupId,
    "texture #"
);
index_type!(
    /// Index of a draw pass within a tick.
    PassId,
    "pass #"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_kind_prefix() {
        assert_eq!(ValueId(3).to_string(), "value #3");
        assert_eq!(TextureGroupId(0).to_string(), "texture #0");
        assert_eq!(PassId::from(2).to_string(), "pass #2");
    }
}
