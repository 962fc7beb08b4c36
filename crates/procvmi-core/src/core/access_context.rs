use serde::{Deserialize, Serialize};

use super::macros::impl_ops;
use crate::AddressContext;

impl_ops!(Pa, u64, "Guest Physical Address");
impl_ops!(Va, u64, "Guest Virtual Address");

impl Va {
    /// Checks if the virtual address is NULL.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Pa {
    /// Checks if the physical address is NULL.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// How a guest address is turned into a physical location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TranslationMechanism {
    /// The address is already a guest physical address.
    Direct,

    /// The address is virtual and is walked through the paging structures
    /// rooted at `root`.
    Paging {
        /// Root of the paging hierarchy (the CR3 value on AMD64).
        ///
        /// `None` selects whatever hierarchy is active on the vCPU.
        root: Option<Pa>,
    },
}

/// A single memory access request: an address plus the way it must be
/// translated.
///
/// Every guest read goes through an `AccessContext`, which is what lets a
/// caller read another process's memory by naming that process's
/// translation root instead of the one currently loaded on the vCPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccessContext {
    /// The address to access.
    ///
    /// Interpreted as physical or virtual depending on [`mechanism`].
    ///
    /// [`mechanism`]: Self::mechanism
    pub address: u64,

    /// The translation mechanism for [`address`].
    ///
    /// [`address`]: Self::address
    pub mechanism: TranslationMechanism,
}

impl AccessContext {
    /// Creates a new `AccessContext` for a physical address.
    pub fn direct(address: impl Into<Pa>) -> Self {
        Self {
            address: u64::from(address.into()),
            mechanism: TranslationMechanism::Direct,
        }
    }

    /// Creates a new `AccessContext` for a virtual address translated through
    /// the given root.
    pub fn paging(address: impl Into<Va>, root: impl Into<Pa>) -> Self {
        Self {
            address: address.into().0,
            mechanism: TranslationMechanism::Paging {
                root: Some(root.into()),
            },
        }
    }

    /// Returns the translation root, if this is a paging access with an
    /// explicit root.
    pub fn root(&self) -> Option<Pa> {
        match self.mechanism {
            TranslationMechanism::Direct => None,
            TranslationMechanism::Paging { root } => root,
        }
    }
}

impl From<Pa> for AccessContext {
    fn from(value: Pa) -> Self {
        Self::direct(value)
    }
}

impl From<(Va, Pa)> for AccessContext {
    fn from(value: (Va, Pa)) -> Self {
        Self::paging(value.0, value.1)
    }
}

impl From<AddressContext> for AccessContext {
    fn from(value: AddressContext) -> Self {
        Self::paging(value.va, value.root)
    }
}

impl ::std::ops::Add<u64> for AccessContext {
    type Output = AccessContext;

    fn add(self, rhs: u64) -> Self::Output {
        Self {
            address: self.address.wrapping_add(rhs),
            ..self
        }
    }
}

impl ::std::ops::AddAssign<u64> for AccessContext {
    fn add_assign(&mut self, rhs: u64) {
        self.address = self.address.wrapping_add(rhs);
    }
}
