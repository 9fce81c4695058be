use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};

/// Group of residential rows sharing one location and address.
#[derive(Debug, Clone, PartialEq, QueryableByName)]
pub struct Cluster {
    #[diesel(sql_type = Text)]
    pub address: String,
    #[diesel(sql_type = Text)]
    pub muni: String,
    #[diesel(sql_type = Double)]
    pub lat: f64,
    #[diesel(sql_type = Double)]
    pub lng: f64,
    #[diesel(sql_type = BigInt)]
    pub members: i64,
    #[diesel(sql_type = Nullable<BigInt>)]
    pub dwellings: Option<i64>,
}

/// Rows touched while replacing one cluster by its aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub inserted: usize,
    pub archived: usize,
    pub deleted: usize,
}
