pub mod snapshot;

pub mod team;

/// Number of top objective slots on the map
pub const TOP_OBJECTIVE_SLOTS: usize = 3;

/// Maximum number of bottom objectives that can be secured in a match
pub const BOTTOM_OBJECTIVE_SLOTS: usize = 3;
