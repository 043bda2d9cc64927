//! Position matching (seniority within a tier).

use serde::{Deserialize, Serialize};

/// How an actual position is compared to a required one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Position must equal the requirement.
    Exact,
    /// Position must be at least the requirement.
    #[default]
    Minimum,
}

/// Whether `actual` satisfies `required` under `mode`.
///
/// `required = None` means any position qualifies, in both modes.
pub fn satisfies(actual: i32, required: Option<i32>, mode: MatchMode) -> bool {
    let Some(required) = required else {
        return true;
    };

    match mode {
        MatchMode::Minimum => actual >= required,
        MatchMode::Exact => actual == required,
    }
}
