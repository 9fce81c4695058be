pub mod point_reader;
pub mod repository;

pub use point_reader::{count_points, PointRangeReader};
pub use repository::GeoRepositoryImpl;
