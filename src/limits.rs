//! Hard limits guarding the engine and the HTTP surface against oversized input.

/// Reservations kept on a single lane.
pub const MAX_RESERVATIONS_PER_LANE: usize = 100_000;

/// Longest bookable slot, in hours.
pub const MAX_SLOT_HOURS: i64 = 24;

/// Owner ids longer than this are rejected.
pub const MAX_OWNER_ID_LEN: usize = 256;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1_000;

/// Lanes examined by a single lane search.
pub const MAX_LANES_PER_SEARCH: usize = 1_000;
