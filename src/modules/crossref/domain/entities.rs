use super::housing_record::HousingRecord;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Text};

/// Address sent to a geocoder once municipality and street are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeQuery {
    pub street_num: String,
    pub street_name: String,
    pub muni: String,
    pub postal_code: Option<String>,
}

impl GeocodeQuery {
    /// Single-line form used by free-text geocoders.
    pub fn one_line(&self) -> String {
        let mut line = format!("{} {} {} QC", self.street_num, self.street_name, self.muni);
        if let Some(postal_code) = &self.postal_code {
            line.push(' ');
            line.push_str(postal_code);
        }
        line
    }
}

/// Accepted geocoder answer. Address parts are the geocoder's own
/// normalized spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub street_name: String,
    pub street_num: String,
}

/// Unit near a point, with its civic number range.
#[derive(Debug, Clone, PartialEq, QueryableByName)]
pub struct UnitCandidate {
    #[diesel(sql_type = Text)]
    pub id: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub num_adr_inf: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub num_adr_sup: Option<String>,
}

#[derive(Debug, Clone, PartialEq, QueryableByName)]
pub struct UnitId {
    #[diesel(sql_type = Text)]
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Containment,
    Proximity,
    Address,
}

impl MatchMethod {
    pub fn counter(&self) -> &'static str {
        match self {
            MatchMethod::Containment => "matched_by_containment",
            MatchMethod::Proximity => "matched_by_proximity",
            MatchMethod::Address => "matched_by_address",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitMatch {
    pub unit_id: String,
    pub method: MatchMethod,
}

/// Persisted public-housing building.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::hlm_buildings)]
#[diesel(treat_none_as_null = true)]
pub struct HousingBuilding {
    pub id: i32,
    pub lat: f64,
    pub lng: f64,
    pub eval_unit_id: Option<String>,
    pub streetview_available: bool,
    pub project_id: i32,
    pub organism: String,
    pub service_center: Option<String>,
    pub address: Option<String>,
    pub street_num: Option<String>,
    pub street_name: Option<String>,
    pub muni: Option<String>,
    pub postal_code: Option<String>,
    pub num_dwellings: i32,
    pub num_floors: i32,
    pub area_footprint: f64,
    pub area_total: f64,
    pub ivp: f64,
    pub disrepair_state: Option<String>,
    pub interest_adjust_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub building_id: Option<i32>,
}

impl HousingBuilding {
    pub fn new(
        record: &HousingRecord,
        muni: &str,
        location: &GeocodeResult,
        unit: Option<&UnitMatch>,
        streetview_available: bool,
    ) -> Self {
        Self {
            id: record.id,
            lat: location.lat,
            lng: location.lng,
            eval_unit_id: unit.map(|u| u.unit_id.clone()),
            streetview_available,
            project_id: record.project_id,
            organism: record.organism.clone(),
            service_center: record.service_center.clone(),
            address: Some(location.address.clone()),
            street_num: Some(location.street_num.clone()),
            street_name: Some(location.street_name.clone()),
            muni: Some(muni.to_string()),
            postal_code: record.postal_code.clone(),
            num_dwellings: record.num_dwellings,
            num_floors: record.num_floors,
            area_footprint: record.area_footprint,
            area_total: record.area_total,
            ivp: record.ivp,
            disrepair_state: record.disrepair_state.clone(),
            interest_adjust_date: record.interest_adjust_date,
            contract_end_date: record.contract_end_date,
            category: record.category.clone(),
            building_id: record.building_id,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::crossref::domain::housing_record::fixtures::record;

    fn location() -> GeocodeResult {
        GeocodeResult {
            lat: 45.52,
            lng: -73.56,
            address: "1234 Rue Sainte-Catherine E".into(),
            street_name: "Rue Sainte-Catherine E".into(),
            street_num: "1234".into(),
        }
    }

    #[test]
    fn one_line_query_appends_postal_code() {
        let mut query = GeocodeQuery {
            street_num: "55".into(),
            street_name: "Rue Roy".into(),
            muni: "Montréal".into(),
            postal_code: Some("H2W 1L1".into()),
        };
        assert_eq!(query.one_line(), "55 Rue Roy Montréal QC H2W 1L1");
        query.postal_code = None;
        assert_eq!(query.one_line(), "55 Rue Roy Montréal QC");
    }

    #[test]
    fn unmatched_building_has_no_unit() {
        let building = HousingBuilding::new(&record(7, 10), "Montréal", &location(), None, false);
        assert_eq!(building.eval_unit_id, None);
        assert_eq!(building.address.as_deref(), Some("1234 Rue Sainte-Catherine E"));
        assert_eq!(building.num_dwellings, 10);
    }

    #[test]
    fn matched_building_keeps_unit_id() {
        let unit = UnitMatch {
            unit_id: "66023123456789000000".into(),
            method: MatchMethod::Containment,
        };
        let building = HousingBuilding::new(&record(7, 10), "Montréal", &location(), Some(&unit), true);
        assert_eq!(building.eval_unit_id.as_deref(), Some("66023123456789000000"));
        assert!(building.streetview_available);
        assert_eq!(building.project_id, 812);
    }
}
