use std::collections::{BTreeMap, BTreeSet};

use crate::config::FanOutConfig;

use super::{Bundle, BundleKey, BundleMember, LayoutError, ResolvedRelationship};

/// Signed fan slot of the member at `index` in a bundle of `count`.
///
/// Odd counts: `0, +1, -1, +2, -2, ...`. Even counts: `+0.5, -0.5, +1.5,
/// -1.5, ...`. Magnitude never exceeds `(count - 1) / 2`.
pub(super) fn fan_slot(index: usize, count: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    if count % 2 == 1 {
        if index == 0 {
            return 0.0;
        }
        let magnitude = index.div_ceil(2) as f32;
        if index % 2 == 1 { magnitude } else { -magnitude }
    } else {
        let magnitude = (index / 2) as f32 + 0.5;
        if index % 2 == 0 { magnitude } else { -magnitude }
    }
}

/// Partition resolved relationships into bundles. Members are ordered by
/// relationship id and bundles by key.
pub(super) fn bundle_relationships(
    relationships: Vec<ResolvedRelationship>,
    fan_out: &FanOutConfig,
) -> Result<Vec<Bundle>, LayoutError> {
    let mut seen = BTreeSet::new();
    let mut groups: BTreeMap<BundleKey, Vec<ResolvedRelationship>> = BTreeMap::new();
    for relationship in relationships {
        if !seen.insert(relationship.id.clone()) {
            return Err(LayoutError::DuplicateRelationship {
                relationship_id: relationship.id,
            });
        }
        let key = BundleKey::for_endpoints(&relationship.start_node_id, &relationship.end_node_id);
        groups.entry(key).or_default().push(relationship);
    }

    let bundles = groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(|a, b| a.id.cmp(&b.id));
            let self_loop = matches!(key, BundleKey::SelfLoop(_));
            let members = members
                .into_iter()
                .map(|relationship| {
                    let offset = if self_loop {
                        0.0
                    } else {
                        relationship.slot * fan_out.bundle_separation
                    };
                    BundleMember {
                        relationship,
                        offset,
                    }
                })
                .collect();
            Bundle { key, members }
        })
        .collect();
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_slots_alternate_around_zero() {
        let slots: Vec<f32> = (0..5).map(|idx| fan_slot(idx, 5)).collect();
        assert_eq!(slots, vec![0.0, 1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn even_slots_straddle_the_chord() {
        let slots: Vec<f32> = (0..4).map(|idx| fan_slot(idx, 4)).collect();
        assert_eq!(slots, vec![0.5, -0.5, 1.5, -1.5]);
    }

    #[test]
    fn single_member_sits_on_the_chord() {
        assert_eq!(fan_slot(0, 1), 0.0);
    }
}
