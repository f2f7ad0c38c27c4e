//! Link records and the preconditions guarding link mutations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{AssociationId, Side};

/// A materialized link between two instances of an association.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Collection the link lives in.
    pub collection: String,
    /// Association the link instantiates.
    pub association: AssociationId,
    /// Instance ids, indexed by [`Side`].
    pub ids: [String; 2],
    /// Creation order within the store.
    pub sequence: u64,
}

impl LinkRecord {
    /// Returns the instance id on the given side.
    #[must_use]
    pub fn id(&self, side: Side) -> &str {
        &self.ids[side.index()]
    }

    /// Returns true if the record joins exactly `ids`.
    #[must_use]
    pub fn joins(&self, association: AssociationId, ids: &[String; 2]) -> bool {
        self.association == association && &self.ids == ids
    }
}

/// A fact about the link table a store must verify atomically with a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPrecondition {
    /// The instance on `side` holds no link of the association.
    NoLinkForRole {
        /// Association checked.
        association: AssociationId,
        /// Side the instance plays.
        side: Side,
        /// Instance id.
        id: String,
    },
    /// The exact pair is not linked.
    NoLinkBetween {
        /// Association checked.
        association: AssociationId,
        /// Instance ids, indexed by [`Side`].
        ids: [String; 2],
    },
}

impl LinkPrecondition {
    /// Returns true if the precondition holds over `links`.
    pub fn holds<'a>(&self, mut links: impl Iterator<Item = &'a LinkRecord>) -> bool {
        match self {
            Self::NoLinkForRole {
                association,
                side,
                id,
            } => !links.any(|l| l.association == *association && l.id(*side) == id),
            Self::NoLinkBetween { association, ids } => !links.any(|l| l.joins(*association, ids)),
        }
    }
}

impl fmt::Display for LinkPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLinkForRole {
                association,
                side,
                id,
            } => write!(f, "no link for {id} on side {side:?} of association {}", association.0),
            Self::NoLinkBetween { association, ids } => write!(
                f,
                "no link between {} and {} in association {}",
                ids[0], ids[1], association.0
            ),
        }
    }
}
