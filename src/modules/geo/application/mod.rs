pub mod coordinate_service;
pub mod lot_linker;

pub use coordinate_service::{assign_coordinates, CoordinateOptions, CoordinateService};
pub use lot_linker::{link_lots, LotLinker};
