//! The fixed set of goals a proof can be submitted against.
//!
//! Goal ids come from the frontend goal templates. The table is a static
//! lookup; there is no dynamic registration.

/// Known goal ids and their display names.
pub const GOALS: &[(&str, &str)] = &[
    ("run_5km", "Run 5km"),
    ("read_20_pages", "Read 20 pages"),
    ("meditate_10min", "Meditate 10 minutes"),
    ("make_sketch", "Make a sketch"),
    ("custom", "Custom goal"),
];

/// Look up the display name for a goal id.
#[must_use]
pub fn display_name(goal_id: &str) -> Option<&'static str> {
    GOALS
        .iter()
        .find(|(id, _)| *id == goal_id)
        .map(|(_, name)| *name)
}

/// Whether the goal id belongs to the known set.
#[must_use]
pub fn is_known(goal_id: &str) -> bool {
    display_name(goal_id).is_some()
}
