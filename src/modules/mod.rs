pub mod crossref;
pub mod datasets;
pub mod geo;
pub mod imagery;
pub mod jobs;
pub mod murb;
pub mod roll;
