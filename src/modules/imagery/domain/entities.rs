use diesel::prelude::*;
use diesel::sql_types::{Double, Text};

/// Land-use codes whose units get an imagery check.
pub const CANDIDATE_CUBFS: &[i32] = &[
    6811, 6812, 6813, 6814, 6815, 6816, 7219, 7221, 7222, 7223, 7224, 7225, 7229, 7233, 7239,
    7290, 7311, 7312, 7313, 7314, 7392, 7393, 7394, 7395, 7396, 7397, 7399, 7411, 7412, 7413,
    7414, 7415, 7416, 7417, 7418, 7419, 7421, 7422, 7423, 7424, 7425, 7429, 7431, 7432, 7433,
    7441, 7442, 7443, 7444, 7445, 7446, 7447, 7448, 7449, 7451, 7452, 7459, 7491, 7492, 7493,
    7499, 7611,
];

#[derive(Debug, Clone, PartialEq, QueryableByName)]
pub struct CandidateUnit {
    #[diesel(sql_type = Text)]
    pub id: String,
    #[diesel(sql_type = Double)]
    pub lat: f64,
    #[diesel(sql_type = Double)]
    pub lng: f64,
}

/// One cached probe result.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = crate::schema::sv_avail)]
pub struct Availability {
    pub id: String,
    pub avail: bool,
}
