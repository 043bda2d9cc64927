//! Tier ranking used for hierarchy override.

use crate::Tier;

/// Whether `actual` ranks strictly above `required`.
///
/// No tier membership never outranks anything.
pub fn is_higher_tier(actual: Option<Tier>, required: Tier) -> bool {
    actual.is_some_and(|tier| tier > required)
}
