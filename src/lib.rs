pub mod body;
pub mod c_api;
pub mod collision;
pub mod config;
pub mod gravity;
pub mod quadtree;
pub mod seed;
pub mod universe;

pub use body::Body;
pub use config::{ForceMethod, UniverseConfig};
pub use gravity::Gravity;
pub use quadtree::{Node, Quadtree, Rect, VirtualBody};
pub use seed::SeedStrategy;
pub use universe::Universe;
