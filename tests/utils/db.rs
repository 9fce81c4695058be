//! Database helpers for tests that need a PostGIS server.
//!
//! Driven by `TEST_DATABASE_URL`; tests using them are `#[ignore]`d and
//! run with `cargo test -- --ignored`.
#![allow(dead_code)]

use diesel::prelude::*;
use rollmap_lib::shared::infrastructure::Database;
use std::sync::{Mutex, MutexGuard, OnceLock};

static TEST_DB: OnceLock<Database> = OnceLock::new();
static TEST_LOCK: Mutex<()> = Mutex::new(());

pub fn test_database_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for database tests")
}

/// Shared pool with migrations applied once per test binary.
pub fn test_db() -> Database {
    TEST_DB
        .get_or_init(|| {
            let db = Database::new(&test_database_url()).expect("Failed to create test database pool");
            db.run_migrations().expect("Failed to run migrations");
            db
        })
        .clone()
}

/// Empty every pipeline table.
pub fn clean_test_db() {
    let db = test_db();
    let mut conn = db.get_connection().expect("Failed to get DB connection");
    diesel::sql_query(
        "TRUNCATE TABLE hlm_buildings, murb_disag, sv_avail, evalunits, lots RESTART IDENTITY CASCADE",
    )
    .execute(&mut conn)
    .expect("Failed to clean pipeline tables");
}

/// Serializes database tests; a poisoned lock is recovered.
pub fn acquire_test_lock() -> MutexGuard<'static, ()> {
    match TEST_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Minimal residential unit with a point.
pub fn insert_unit(id: &str, address: &str, cubf: i32, lng: f64, lat: f64, num_dwelling: Option<i32>) {
    let db = test_db();
    let mut conn = db.get_connection().expect("Failed to get DB connection");
    diesel::sql_query(
        "INSERT INTO evalunits (id, lat, lng, point, year, muni, muni_code, address, num_adr_inf, \
         street_name, mat18, cubf, num_dwelling) \
         VALUES ($1, $2, $3, ST_SetSRID(ST_MakePoint($3, $2), 4326), 2022, 'Montréal', '66023', \
         $4, split_part($4, ' ', 1), 'Rue Roy', right($1, 18), $5, $6)",
    )
    .bind::<diesel::sql_types::Text, _>(id)
    .bind::<diesel::sql_types::Double, _>(lat)
    .bind::<diesel::sql_types::Double, _>(lng)
    .bind::<diesel::sql_types::Text, _>(address)
    .bind::<diesel::sql_types::Integer, _>(cubf)
    .bind::<diesel::sql_types::Nullable<diesel::sql_types::Integer>, _>(num_dwelling)
    .execute(&mut conn)
    .expect("Failed to insert unit");
}

/// Square lot of `half` degrees around a point, returning its gid.
pub fn insert_lot(id_provinc: &str, lng: f64, lat: f64, half: f64) -> i32 {
    #[derive(QueryableByName)]
    struct Gid {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        gid: i32,
    }

    let db = test_db();
    let mut conn = db.get_connection().expect("Failed to get DB connection");
    let row: Gid = diesel::sql_query(
        "INSERT INTO lots (id_provinc, cubf, code_mun, geom) \
         VALUES ($1, 1000, '66023', ST_Multi(ST_MakeEnvelope($2 - $4, $3 - $4, $2 + $4, $3 + $4, 4326))) \
         RETURNING gid",
    )
    .bind::<diesel::sql_types::Text, _>(id_provinc)
    .bind::<diesel::sql_types::Double, _>(lng)
    .bind::<diesel::sql_types::Double, _>(lat)
    .bind::<diesel::sql_types::Double, _>(half)
    .get_result(&mut conn)
    .expect("Failed to insert lot");
    row.gid
}
