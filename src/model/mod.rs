//! # Property Graph Model
//!
//! The DTOs that define the property graph and its value system.
//! These types cross every boundary: storage ↔ planner ↔ execution ↔ user.
//!
//! This module is pure data — no I/O, no state, no storage dependency.

pub mod edge;
pub mod node;
pub mod path;
pub mod spatial;
pub mod temporal;
pub mod value;

pub use edge::{Direction, EdgeId, EdgeRef};
pub use node::{NodeId, NodeRef};
pub use path::PathValue;
pub use spatial::{Crs, Point};
pub use temporal::Duration;
pub use value::{PropertyMap, Truth, Value};
