use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine behaviour
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where Post/Skip advance `next_due_date` from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Advance from the current due date: each Post/Skip consumes exactly
    /// one occurrence, so a backlog is worked off one entry at a time.
    #[default]
    Sequential,
    /// Advance from `max(next_due_date, today)`: a single Post/Skip drops
    /// the whole backlog.
    FastForward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum occurrences counted when resolving a backlog. Exhausting
    /// the budget marks the summary as overflowing.
    #[serde(default = "d_catch_up_budget")]
    pub catch_up_budget: u32,

    #[serde(default)]
    pub advance_policy: AdvancePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catch_up_budget: d_catch_up_budget(),
            advance_policy: AdvancePolicy::default(),
        }
    }
}

fn d_catch_up_budget() -> u32 {
    10_000
}
