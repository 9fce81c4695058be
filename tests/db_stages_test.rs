//! Stages against a live PostGIS database.
//!
//! Run with `TEST_DATABASE_URL=... cargo test --test db_stages_test -- --ignored`.

mod utils;

use diesel::prelude::*;
use diesel::sql_types::BigInt;
use rollmap_lib::modules::crossref::domain::MatchStore;
use rollmap_lib::modules::crossref::infrastructure::CrossrefRepositoryImpl;
use rollmap_lib::modules::geo::link_lots;
use rollmap_lib::modules::murb::aggregate_murbs;
use tokio_util::sync::CancellationToken;
use utils::db::{acquire_test_lock, clean_test_db, insert_lot, insert_unit, test_db};

const UNIT_A: &str = "66023123456789000000001";
const UNIT_B: &str = "66023123456789000000002";
const UNIT_C: &str = "66023123456789000000003";

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    n: i64,
}

fn count(sql: &str) -> i64 {
    let db = test_db();
    let mut conn = db.get_connection().unwrap();
    diesel::sql_query(sql).get_result::<Count>(&mut conn).unwrap().n
}

#[tokio::test]
#[ignore]
async fn lots_link_named_and_contained_units() {
    let _guard = acquire_test_lock();
    clean_test_db();

    insert_unit(UNIT_A, "10 Rue Roy", 1000, -73.50, 45.50, Some(1));
    insert_unit(UNIT_B, "20 Rue Roy", 1000, -73.60, 45.60, Some(1));
    insert_unit(UNIT_C, "22 Rue Roy", 1000, -73.6001, 45.6001, Some(1));
    let named = insert_lot(UNIT_A, -73.50, 45.50, 0.0005);
    let shared = insert_lot("Multiple", -73.60, 45.60, 0.001);
    insert_lot("66023999999999999999999", -70.0, 46.0, 0.0005);

    let report = link_lots(&test_db(), false, CancellationToken::new()).await.unwrap();

    assert_eq!(report.tally.get("lots_linked"), 2);
    assert_eq!(report.tally.get("units_linked"), 3);
    assert_eq!(report.tally.get("lots_unmatched"), 1);
    assert_eq!(
        count(&format!("SELECT count(*) AS n FROM evalunits WHERE lot_id = {}", named)),
        1
    );
    assert_eq!(
        count(&format!("SELECT count(*) AS n FROM evalunits WHERE lot_id = {}", shared)),
        2
    );
}

#[tokio::test]
#[ignore]
async fn duplicate_residential_rows_collapse_once() {
    let _guard = acquire_test_lock();
    clean_test_db();

    insert_unit(UNIT_A, "55 Rue Roy", 1000, -73.5, 45.5, Some(5));
    insert_unit(UNIT_B, "55 Rue Roy", 1000, -73.5, 45.5, Some(3));
    insert_unit(UNIT_C, "57 Rue Roy", 1000, -73.5, 45.5, Some(2));

    let report = aggregate_murbs(&test_db(), 1, false, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.tally.get("clusters"), 1);
    assert_eq!(report.tally.get("aggregates_inserted"), 1);
    assert_eq!(count("SELECT count(*) AS n FROM evalunits"), 2);
    assert_eq!(
        count("SELECT count(*) AS n FROM evalunits WHERE id LIKE '%9999' AND num_dwelling = 8"),
        1
    );
    assert_eq!(
        count("SELECT count(*) AS n FROM murb_disag WHERE agg_id LIKE '%9999'"),
        2
    );

    let rerun = aggregate_murbs(&test_db(), 1, false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rerun.tally.get("aggregates_inserted"), 0);
    assert_eq!(count("SELECT count(*) AS n FROM evalunits"), 2);
    assert_eq!(count("SELECT count(*) AS n FROM murb_disag"), 2);
}

#[tokio::test]
#[ignore]
async fn match_queries_find_linked_and_addressed_units() {
    let _guard = acquire_test_lock();
    clean_test_db();

    insert_unit(UNIT_A, "10 Rue Roy", 1000, -73.50, 45.50, Some(6));
    insert_unit(UNIT_B, "4500 Rue Roy", 4500, -73.70, 45.70, None);
    insert_lot(UNIT_A, -73.50, 45.50, 0.0005);
    insert_lot(UNIT_B, -73.70, 45.70, 0.0005);
    link_lots(&test_db(), false, CancellationToken::new()).await.unwrap();

    let store = CrossrefRepositoryImpl::new(test_db());

    assert_eq!(
        store.containing_unit(-73.5001, 45.5001).await.unwrap().as_deref(),
        Some(UNIT_A)
    );
    // Excluded land-use codes never match.
    assert_eq!(store.containing_unit(-73.70, 45.70).await.unwrap(), None);
    assert_eq!(store.containing_unit(-60.0, 45.0).await.unwrap(), None);

    assert_eq!(
        store.unit_by_address("10 RUE ROY").await.unwrap().as_deref(),
        Some(UNIT_A)
    );
    assert_eq!(store.unit_by_address("4500 Rue Roy").await.unwrap(), None);

    let nearby = store.nearby_units(-73.5006, 45.5).await.unwrap();
    assert_eq!(nearby.first().map(|c| c.id.as_str()), Some(UNIT_A));
}
