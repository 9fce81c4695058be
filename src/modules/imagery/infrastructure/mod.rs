pub mod repository;
pub mod streetview_client;
pub mod url_signer;

pub use repository::AvailabilityRepositoryImpl;
pub use streetview_client::StreetViewClient;
pub use url_signer::{sign_path, sign_url};
