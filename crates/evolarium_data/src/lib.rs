//! Plain data shared by the simulation core, the wire protocol and the server.
//!
//! Nothing in here owns behaviour that needs randomness or a world; those
//! live in `evolarium_core`.

pub mod data;

pub use data::color::{ColorParseError, CreatureColor};
pub use data::environment::Season;
pub use data::food::{Food, FoodKind};
pub use data::math::{clamp, map_range, Vec2};
pub use data::snapshot::{CreatureView, FoodView, WorldSnapshot};
