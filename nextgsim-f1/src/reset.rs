//! Resolution of the UE-associated connections listed in a partial Reset

use nextgsim_f1ap::procedures::UeAssociatedLogicalF1ConnectionItem;
use nextgsim_f1ap::UeF1apId;

use crate::ue_context::{UeContextStore, UeIndex};

/// Result of resolving a partial Reset against the local contexts
#[derive(Debug, Default)]
pub(crate) struct ResetResolution {
    /// UEs to remove, each listed once
    pub ues: Vec<UeIndex>,
    /// Items for the acknowledge, one per requested item and in request order
    pub items: Vec<UeAssociatedLogicalF1ConnectionItem>,
}

/// Resolves every item by the local UE F1AP ID, falling back to the peer one.
///
/// `split` gives the (local, peer) IDs of a requested item and `join` builds
/// the acknowledged item of a resolved context. Unresolved items are echoed
/// back unchanged.
pub(crate) fn resolve_reset_items<L, P>(
    store: &UeContextStore<L, P>,
    requested: &[UeAssociatedLogicalF1ConnectionItem],
    split: impl Fn(&UeAssociatedLogicalF1ConnectionItem) -> (Option<L>, Option<P>),
    join: impl Fn(L, Option<P>) -> UeAssociatedLogicalF1ConnectionItem,
) -> ResetResolution
where
    L: UeF1apId,
    P: UeF1apId,
{
    let mut resolution = ResetResolution::default();

    for item in requested {
        let (local, peer) = split(item);
        let ctx = local
            .and_then(|id| store.find_by_local_id(id))
            .or_else(|| peer.and_then(|id| store.find_by_peer_id(id)));

        match ctx {
            Some(ctx) => {
                if !resolution.ues.contains(&ctx.ue_index) {
                    resolution.ues.push(ctx.ue_index);
                }
                resolution.items.push(join(ctx.local_id, ctx.peer_id()));
            }
            None => resolution.items.push(*item),
        }
    }
    resolution
}
