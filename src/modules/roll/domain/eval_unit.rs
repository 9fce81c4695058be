/// Evaluation unit: the primary registry record for one assessed property.
use super::address::AddressParts;
use super::derived_code::{DerivedCode, UNIT_ID_LEN};
use crate::schema::evalunits;
use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = evalunits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EvalUnit {
    pub id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub lot_id: Option<i32>,
    pub year: i32,
    pub muni: String,
    pub muni_code: String,
    pub arrond: Option<String>,
    pub address: String,
    pub num_adr_inf: Option<String>,
    pub num_adr_inf_2: Option<String>,
    pub num_adr_sup: Option<String>,
    pub num_adr_sup_2: Option<String>,
    pub street_name: Option<String>,
    pub apt_num: Option<String>,
    pub apt_num_1: Option<String>,
    pub apt_num_2: Option<String>,
    pub mat18: String,
    pub cubf: i32,
    pub file_num: Option<String>,
    pub nghbr_unit: Option<String>,
    pub owner_date: Option<NaiveDate>,
    pub owner_type: Option<String>,
    pub owner_status: Option<String>,
    pub lot_lin_dim: Option<f64>,
    pub lot_area: Option<f64>,
    pub max_floors: Option<i32>,
    pub const_yr: Option<i32>,
    pub const_yr_real: Option<String>,
    pub floor_area: Option<f64>,
    pub phys_link: Option<String>,
    pub const_type: Option<String>,
    pub num_dwelling: Option<i32>,
    pub num_rental: Option<i32>,
    pub num_non_res: Option<i32>,
    pub apprais_date: Option<NaiveDate>,
    pub lot_value: Option<f64>,
    pub building_value: Option<f64>,
    pub total_value: Option<f64>,
    pub prev_total_value: Option<f64>,
    pub associated: Option<serde_json::Value>,
    pub date_added: DateTime<Utc>,
}

/// Identity of a unit within its roll document.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitKey {
    pub id: String,
    pub code: DerivedCode,
    pub muni: String,
    pub muni_code: String,
    pub year: i32,
    pub cubf: i32,
}

/// Whether the registered owner is a physical or a moral person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerType {
    Physical,
    Moral,
}

impl OwnerType {
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "1" {
            OwnerType::Physical
        } else {
            OwnerType::Moral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Physical => "physical",
            OwnerType::Moral => "moral",
        }
    }
}

/// Everything besides identity and address, already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitDetails {
    pub arrond: Option<String>,
    pub file_num: Option<String>,
    pub nghbr_unit: Option<String>,
    pub owner_date: Option<NaiveDate>,
    pub owner_type: Option<OwnerType>,
    pub owner_status: Option<String>,
    pub lot_lin_dim: Option<f64>,
    pub lot_area: Option<f64>,
    pub max_floors: Option<i32>,
    pub const_yr: Option<i32>,
    pub const_yr_real: Option<String>,
    pub floor_area: Option<f64>,
    pub phys_link: Option<String>,
    pub const_type: Option<String>,
    pub num_dwelling: Option<i32>,
    pub num_rental: Option<i32>,
    pub num_non_res: Option<i32>,
    pub apprais_date: Option<NaiveDate>,
    pub lot_value: Option<f64>,
    pub building_value: Option<f64>,
    pub total_value: Option<f64>,
    pub prev_total_value: Option<f64>,
}

impl EvalUnit {
    /// Assemble a freshly parsed unit. Geometry and lot are filled by later
    /// stages.
    pub fn from_parts(key: UnitKey, address: AddressParts, details: UnitDetails) -> AppResult<Self> {
        if key.id.chars().count() != UNIT_ID_LEN {
            return Err(AppError::ValidationError(format!(
                "unit id '{}' must be {} characters",
                key.id, UNIT_ID_LEN
            )));
        }
        if !key.id.ends_with(key.code.as_str()) {
            return Err(AppError::ValidationError(format!(
                "unit id '{}' does not end with its derived code {}",
                key.id, key.code
            )));
        }

        Ok(Self {
            id: key.id,
            lat: None,
            lng: None,
            lot_id: None,
            year: key.year,
            muni: key.muni,
            muni_code: key.muni_code,
            arrond: details.arrond,
            address: address.address,
            num_adr_inf: address.num_adr_inf,
            num_adr_inf_2: address.num_adr_inf_2,
            num_adr_sup: address.num_adr_sup,
            num_adr_sup_2: address.num_adr_sup_2,
            street_name: address.street_name,
            apt_num: address.apt_num,
            apt_num_1: address.apt_num_1,
            apt_num_2: address.apt_num_2,
            mat18: key.code.as_str().to_string(),
            cubf: key.cubf,
            file_num: details.file_num,
            nghbr_unit: details.nghbr_unit,
            owner_date: details.owner_date,
            owner_type: details.owner_type.map(|t| t.as_str().to_string()),
            owner_status: details.owner_status,
            lot_lin_dim: details.lot_lin_dim,
            lot_area: details.lot_area,
            max_floors: details.max_floors,
            const_yr: details.const_yr,
            const_yr_real: details.const_yr_real,
            floor_area: details.floor_area,
            phys_link: details.phys_link,
            const_type: details.const_type,
            num_dwelling: details.num_dwelling,
            num_rental: details.num_rental,
            num_non_res: details.num_non_res,
            apprais_date: details.apprais_date,
            lot_value: details.lot_value,
            building_value: details.building_value,
            total_value: details.total_value,
            prev_total_value: details.prev_total_value,
            associated: None,
            date_added: Utc::now(),
        })
    }

    pub fn has_street_number(&self) -> bool {
        self.num_adr_inf.is_some() || self.num_adr_sup.is_some()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::modules::roll::domain::derived_code::CodeSegments;

    /// Minimal valid unit used across module tests.
    pub fn unit(id_tail: &str) -> EvalUnit {
        let code = DerivedCode::from_segments(&CodeSegments {
            a: Some("1234"),
            b: Some("56"),
            c: Some("7890"),
            d: None,
            e: None,
            f: Some(id_tail),
        })
        .unwrap();
        let key = UnitKey {
            id: code.unit_id("66023").unwrap(),
            code,
            muni: "Montréal".into(),
            muni_code: "66023".into(),
            year: 2022,
            cubf: 1000,
        };
        let address = AddressParts {
            address: "55 Rue Roy".into(),
            street_name: Some("Rue Roy".into()),
            num_adr_inf: Some("55".into()),
            ..Default::default()
        };
        EvalUnit::from_parts(key, address, UnitDetails::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::roll::domain::derived_code::CodeSegments;

    #[test]
    fn from_parts_rejects_mismatched_id() {
        let code = DerivedCode::from_segments(&CodeSegments {
            a: Some("1234"),
            b: Some("56"),
            c: Some("7890"),
            ..Default::default()
        })
        .unwrap();
        let key = UnitKey {
            id: "66023999999999999999999".into(),
            code,
            muni: "Montréal".into(),
            muni_code: "66023".into(),
            year: 2022,
            cubf: 1000,
        };
        let err = EvalUnit::from_parts(key, AddressParts::default(), UnitDetails::default());
        assert!(matches!(err, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn owner_type_codes() {
        assert_eq!(OwnerType::from_code("1"), OwnerType::Physical);
        assert_eq!(OwnerType::from_code("2").as_str(), "moral");
    }

    #[test]
    fn fixture_unit_is_valid() {
        let unit = fixtures::unit("0013");
        assert_eq!(unit.id, "66023123456789000000013");
        assert!(unit.has_street_number());
        assert!(unit.lat.is_none());
    }
}
