//! Association engine: cardinality rules for link and entity mutations.
//!
//! The engine reads the current links through an [`EntityStore`] and decides
//! whether a mutation is allowed. An allowed mutation comes back as a plan
//! carrying the [`LinkPrecondition`]s its decision relied on; the store
//! re-checks them atomically with the write, so a concurrent writer turns
//! into `PreconditionFailed` instead of a broken invariant.
//!
//! Multiplicities are read per end: the multiplicity on a side bounds how
//! many instances of that side one instance of the other side may be linked
//! to.

use entable_foundation::{ConflictReason, Error, ErrorKind, Result};
use entable_schema::{
    AssociationId, DeleteRequest, DocumentKey, EntityStore, LinkPrecondition, Multiplicity,
    SchemaSnapshot, Side,
};
use tracing::debug;

// =============================================================================
// Requests and Plans
// =============================================================================

/// One end of a link request: an instance of an entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkEndpoint {
    /// Entity type name.
    pub entity_type: String,
    /// Instance id.
    pub id: String,
}

impl LinkEndpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

/// An allowed link mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkPlan {
    /// Association the link belongs to.
    pub association: AssociationId,
    /// Side the source instance plays.
    pub source_side: Side,
    /// Instance ids, indexed by [`Side`].
    pub ids: [String; 2],
    /// Facts the store must re-check atomically with the write.
    pub preconditions: Vec<LinkPrecondition>,
}

/// Resolves the association joining two entity types.
///
/// Returns the association and the side `source` plays. For a
/// self-association the source plays side `A`.
///
/// # Errors
///
/// - `EntityTypeNotFound` if either type is not declared
/// - `AssociationNotFound` if no association joins them
pub fn resolve_association(
    snapshot: &SchemaSnapshot,
    source: &str,
    target: &str,
) -> Result<(AssociationId, Side)> {
    let (source_id, _) = snapshot
        .entity_type(source)
        .ok_or_else(|| Error::new(ErrorKind::EntityTypeNotFound(source.to_string())))?;
    let (target_id, _) = snapshot
        .entity_type(target)
        .ok_or_else(|| Error::new(ErrorKind::EntityTypeNotFound(target.to_string())))?;
    snapshot
        .association_between(source_id, target_id)
        .ok_or_else(|| {
            Error::new(ErrorKind::AssociationNotFound {
                source_type: source.to_string(),
                target_type: target.to_string(),
            })
        })
}

fn multiplicity(
    snapshot: &SchemaSnapshot,
    association: AssociationId,
    side: Side,
) -> Result<Multiplicity> {
    snapshot
        .association(association)
        .map(|a| a.end(side).multiplicity)
        .ok_or_else(|| {
            Error::internal(format!(
                "association {} missing from snapshot",
                association.0
            ))
        })
}

fn ids_for(source_side: Side, source: &LinkEndpoint, target: &LinkEndpoint) -> [String; 2] {
    match source_side {
        Side::A => [source.id.clone(), target.id.clone()],
        Side::B => [target.id.clone(), source.id.clone()],
    }
}

fn conflict(reason: ConflictReason, association: AssociationId) -> Error {
    debug!(association = association.0, %reason, "link conflict");
    Error::conflict(reason)
}

// =============================================================================
// Link Create / Delete
// =============================================================================

/// Decides whether `source` may be linked to `target`.
///
/// A link is refused when the pair is already linked, when the target end is
/// bounded and the source already holds a link of the association, or when
/// the source end is bounded and the target is already linked.
///
/// # Errors
///
/// - `Conflict` (`DuplicateLink` or `MultiplicityExceeded`)
/// - resolution errors from [`resolve_association`]
/// - store read errors
pub fn check_link_create<S: EntityStore + ?Sized>(
    store: &S,
    collection: &str,
    snapshot: &SchemaSnapshot,
    source: &LinkEndpoint,
    target: &LinkEndpoint,
) -> Result<LinkPlan> {
    let (association, source_side) =
        resolve_association(snapshot, &source.entity_type, &target.entity_type)?;
    let target_side = source_side.other();
    let ids = ids_for(source_side, source, target);

    let source_links = store.links(collection, association, source_side, &source.id)?;
    if source_links.iter().any(|l| l.joins(association, &ids)) {
        return Err(conflict(ConflictReason::DuplicateLink, association));
    }

    let mut preconditions = vec![LinkPrecondition::NoLinkBetween {
        association,
        ids: ids.clone(),
    }];

    if multiplicity(snapshot, association, target_side)?.is_bounded() {
        if !source_links.is_empty() {
            return Err(conflict(ConflictReason::MultiplicityExceeded, association));
        }
        preconditions.push(LinkPrecondition::NoLinkForRole {
            association,
            side: source_side,
            id: source.id.clone(),
        });
    }

    if multiplicity(snapshot, association, source_side)?.is_bounded() {
        if !store.links(collection, association, target_side, &target.id)?.is_empty() {
            return Err(conflict(ConflictReason::MultiplicityExceeded, association));
        }
        preconditions.push(LinkPrecondition::NoLinkForRole {
            association,
            side: target_side,
            id: target.id.clone(),
        });
    }

    Ok(LinkPlan {
        association,
        source_side,
        ids,
        preconditions,
    })
}

/// Decides whether the link between `source` and `target` may be removed.
///
/// # Errors
///
/// - `LinkNotFound` if the pair is not linked
/// - resolution errors from [`resolve_association`]
pub fn check_link_delete<S: EntityStore + ?Sized>(
    store: &S,
    collection: &str,
    snapshot: &SchemaSnapshot,
    source: &LinkEndpoint,
    target: &LinkEndpoint,
) -> Result<LinkPlan> {
    let (association, source_side) =
        resolve_association(snapshot, &source.entity_type, &target.entity_type)?;
    let ids = ids_for(source_side, source, target);
    let linked = store
        .links(collection, association, source_side, &source.id)?
        .iter()
        .any(|l| l.joins(association, &ids));
    if !linked {
        return Err(Error::new(ErrorKind::LinkNotFound));
    }
    Ok(LinkPlan {
        association,
        source_side,
        ids,
        preconditions: Vec::new(),
    })
}

// =============================================================================
// Entity Delete
// =============================================================================

/// Plans the deletion of an entity instance.
///
/// For every association the entity type takes part in, the entity plays
/// the target relative to the opposite end. When the opposite end is `*`,
/// existing links block the delete; when it is bounded, the links are
/// removed with the entity.
///
/// # Errors
///
/// - `EntityTypeNotFound` if the key's type is not declared
/// - `Conflict` (`LinkedEntityExists`)
/// - store read errors
pub fn plan_entity_delete<S: EntityStore + ?Sized>(
    store: &S,
    snapshot: &SchemaSnapshot,
    key: &DocumentKey,
) -> Result<DeleteRequest> {
    let (entity_type, _) = snapshot
        .entity_type(&key.entity_type)
        .ok_or_else(|| Error::new(ErrorKind::EntityTypeNotFound(key.entity_type.clone())))?;

    let mut request = DeleteRequest {
        key: key.clone(),
        unlink: Vec::new(),
        preconditions: Vec::new(),
    };
    for (association, assoc, side) in snapshot.associations_of(entity_type) {
        if assoc.end(side.other()).multiplicity.is_bounded() {
            request.unlink.push((association, side));
            continue;
        }
        if !store.links(&key.collection, association, side, &key.id)?.is_empty() {
            return Err(conflict(ConflictReason::LinkedEntityExists, association));
        }
        request.preconditions.push(LinkPrecondition::NoLinkForRole {
            association,
            side,
            id: key.id.clone(),
        });
    }
    Ok(request)
}
