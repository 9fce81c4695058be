pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{assign_coordinates, link_lots, CoordinateOptions};
pub use domain::{CoordinateStore, Lot, LotStore, UnitPoint};
