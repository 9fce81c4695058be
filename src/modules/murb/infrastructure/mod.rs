pub mod repository;

pub use repository::MurbRepositoryImpl;
