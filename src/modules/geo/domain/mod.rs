pub mod entities;
pub mod repository;

pub use entities::{Lot, LotTarget, UnitPoint, MULTIPLE_UNITS};
pub use repository::{CoordinateStore, LotStore};
