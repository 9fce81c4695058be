//! Spatial match cascade: containment, then proximity, then literal address.
//! The first step that yields a unit wins.

use super::entities::{GeocodeResult, MatchMethod, UnitCandidate, UnitMatch};
use super::repository::MatchStore;
use crate::shared::errors::AppResult;

pub async fn match_unit<S: MatchStore + ?Sized>(
    store: &S,
    location: &GeocodeResult,
) -> AppResult<Option<UnitMatch>> {
    if let Some(unit_id) = store.containing_unit(location.lng, location.lat).await? {
        return Ok(Some(UnitMatch {
            unit_id,
            method: MatchMethod::Containment,
        }));
    }

    let nearby = store.nearby_units(location.lng, location.lat).await?;
    if let Some(candidate) = pick_candidate(&nearby, &location.street_num) {
        return Ok(Some(UnitMatch {
            unit_id: candidate.id.clone(),
            method: MatchMethod::Proximity,
        }));
    }

    Ok(store
        .unit_by_address(&location.address)
        .await?
        .map(|unit_id| UnitMatch {
            unit_id,
            method: MatchMethod::Address,
        }))
}

/// Disambiguate nearby units, closest first, by civic number: exact match
/// on the lower bound, then range with the same parity, then range alone.
pub fn pick_candidate<'a>(candidates: &'a [UnitCandidate], street_num: &str) -> Option<&'a UnitCandidate> {
    let number = civic_number(street_num)?;
    let ranges: Vec<(&UnitCandidate, Option<(u32, u32)>)> = candidates
        .iter()
        .map(|c| (c, range_of(c)))
        .collect();

    let in_range = |range: &Option<(u32, u32)>| range.is_some_and(|(inf, sup)| inf <= number && number <= sup);

    ranges
        .iter()
        .find(|(_, range)| range.is_some_and(|(inf, _)| inf == number))
        .or_else(|| {
            ranges
                .iter()
                .find(|(_, range)| in_range(range) && range.is_some_and(|(inf, _)| inf % 2 == number % 2))
        })
        .or_else(|| ranges.iter().find(|(_, range)| in_range(range)))
        .map(|(candidate, _)| *candidate)
}

fn range_of(candidate: &UnitCandidate) -> Option<(u32, u32)> {
    let inf = candidate.num_adr_inf.as_deref().and_then(civic_number)?;
    let sup = candidate
        .num_adr_sup
        .as_deref()
        .and_then(civic_number)
        .filter(|sup| *sup >= inf)
        .unwrap_or(inf);
    Some((inf, sup))
}

/// Leading digits of a civic number such as `1234 A`.
fn civic_number(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    raw[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::crossref::domain::repository::MockMatchStore;

    fn candidate(id: &str, inf: &str, sup: Option<&str>) -> UnitCandidate {
        UnitCandidate {
            id: id.to_string(),
            num_adr_inf: Some(inf.to_string()),
            num_adr_sup: sup.map(str::to_string),
        }
    }

    fn location(street_num: &str) -> GeocodeResult {
        GeocodeResult {
            lat: 46.81,
            lng: -71.22,
            address: format!("{} Rue Roy", street_num),
            street_name: "Rue Roy".into(),
            street_num: street_num.into(),
        }
    }

    #[test]
    fn exact_lower_bound_beats_closer_range() {
        let candidates = vec![
            candidate("a", "100", Some("120")),
            candidate("b", "110", None),
        ];
        assert_eq!(pick_candidate(&candidates, "110").map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn same_side_of_street_is_preferred() {
        let candidates = vec![
            candidate("odd", "101", Some("121")),
            candidate("even", "100", Some("120")),
        ];
        assert_eq!(pick_candidate(&candidates, "112").map(|c| c.id.as_str()), Some("even"));
        assert_eq!(pick_candidate(&candidates, "113").map(|c| c.id.as_str()), Some("odd"));
    }

    #[test]
    fn range_without_parity_is_last_resort() {
        let candidates = vec![candidate("a", "101", Some("121"))];
        assert_eq!(pick_candidate(&candidates, "110 A").map(|c| c.id.as_str()), Some("a"));
    }

    #[test]
    fn nothing_in_range_yields_none() {
        let candidates = vec![candidate("a", "10", Some("20")), candidate("b", "x", None)];
        assert_eq!(pick_candidate(&candidates, "300"), None);
        assert_eq!(pick_candidate(&candidates, "B"), None);
    }

    #[tokio::test]
    async fn containment_wins_without_proximity_search() {
        let mut store = MockMatchStore::new();
        store
            .expect_containing_unit()
            .times(1)
            .returning(|_, _| Ok(Some("lot-a-unit".into())));
        store.expect_nearby_units().never();
        store.expect_unit_by_address().never();

        let found = match_unit(&store, &location("55")).await.unwrap().unwrap();
        assert_eq!(found.unit_id, "lot-a-unit");
        assert_eq!(found.method, MatchMethod::Containment);
    }

    #[tokio::test]
    async fn proximity_miss_falls_through_to_address() {
        let mut store = MockMatchStore::new();
        store.expect_containing_unit().returning(|_, _| Ok(None));
        store
            .expect_nearby_units()
            .returning(|_, _| Ok(vec![candidate("far", "900", Some("910"))]));
        store
            .expect_unit_by_address()
            .withf(|address| address == "55 Rue Roy")
            .times(1)
            .returning(|_| Ok(Some("by-address".into())));

        let found = match_unit(&store, &location("55")).await.unwrap().unwrap();
        assert_eq!(found.unit_id, "by-address");
        assert_eq!(found.method, MatchMethod::Address);
    }

    #[tokio::test]
    async fn exhausted_cascade_is_unmatched() {
        let mut store = MockMatchStore::new();
        store.expect_containing_unit().returning(|_, _| Ok(None));
        store.expect_nearby_units().returning(|_, _| Ok(Vec::new()));
        store.expect_unit_by_address().returning(|_| Ok(None));

        assert_eq!(match_unit(&store, &location("55")).await.unwrap(), None);
    }
}
