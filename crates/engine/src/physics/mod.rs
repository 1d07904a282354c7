pub(crate) mod collision;
pub(crate) mod motion;
pub(crate) mod standing;

pub use collision::{sweep_against, EntityMoveResult, Side, SweepHit, ALL_SIDES, TOP_ONLY};
pub use motion::{active_friction, external_acceleration, integrate, Motion};
pub use standing::{foot_tiles, is_underfoot};
