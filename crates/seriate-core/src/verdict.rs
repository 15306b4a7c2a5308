// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Analyst verdict attached to a cluster.
///
/// `Unset` is a first-class third state: a cluster nobody has judged yet is
/// distinguishable from one explicitly labeled false.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Unset,
    False,
    True,
}

impl Verdict {
    pub fn from_bool(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }

    /// Returns the explicit boolean, or `None` when unset.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::False => Some(false),
            Self::True => Some(true),
        }
    }

    pub fn is_set(self) -> bool {
        self != Self::Unset
    }
}
