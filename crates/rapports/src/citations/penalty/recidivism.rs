use std::collections::{BTreeMap, BTreeSet};

use super::super::domain::InfractionId;

/// Classify each selected infraction as first-time (`false`) or repeat (`true`).
///
/// An infraction is a repeat when the operator forces repeat pricing or when the
/// citizen's history already contains that exact infraction.
pub fn classify(
    selected: &[InfractionId],
    history: &BTreeSet<InfractionId>,
    global_repeat: bool,
) -> BTreeMap<InfractionId, bool> {
    selected
        .iter()
        .map(|id| (*id, global_repeat || history.contains(id)))
        .collect()
}
