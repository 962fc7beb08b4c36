use serde::{Deserialize, Serialize};

use super::{Pa, Va};

/// A virtual address paired with the translation root it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressContext {
    /// The virtual address.
    pub va: Va,

    /// The root of the paging hierarchy that maps `va`.
    pub root: Pa,
}

impl AddressContext {
    /// Creates a new address context.
    pub fn new(va: impl Into<Va>, root: impl Into<Pa>) -> Self {
        Self {
            va: va.into(),
            root: root.into(),
        }
    }
}

impl From<(Va, Pa)> for AddressContext {
    fn from((va, root): (Va, Pa)) -> Self {
        Self { va, root }
    }
}

impl ::std::ops::Add<u64> for AddressContext {
    type Output = AddressContext;

    fn add(self, rhs: u64) -> Self::Output {
        Self {
            va: self.va + rhs,
            root: self.root,
        }
    }
}
