//! Public-housing dataset rows. Text fields are cut at a fixed width,
//! decimals use a comma and `#N/A` stands for a missing date.

use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use csv::StringRecord;

/// Records with fewer dwellings are out of scope.
pub const MIN_DWELLINGS: i32 = 3;
const MISSING_SENTINEL: &str = "#N/A";
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

mod col {
    pub const ID: usize = 0;
    pub const PROJECT_ID: usize = 1;
    pub const ORGANISM: usize = 2;
    pub const SERVICE_CENTER: usize = 3;
    pub const STREET_DESIGNATION: usize = 4;
    pub const STREET_NAME: usize = 5;
    pub const MUNI: usize = 6;
    pub const POSTAL_CODE: usize = 8;
    pub const NUM_DWELLINGS: usize = 9;
    pub const NUM_FLOORS: usize = 11;
    pub const AREA_FOOTPRINT: usize = 12;
    pub const AREA_TOTAL: usize = 13;
    pub const IVP: usize = 14;
    pub const DISREPAIR_STATE: usize = 15;
    pub const INTEREST_ADJUST_DATE: usize = 16;
    pub const CONTRACT_END_DATE: usize = 17;
    pub const CATEGORY: usize = 19;
    pub const BUILDING_ID: usize = 20;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HousingRecord {
    pub id: i32,
    pub project_id: i32,
    pub organism: String,
    pub service_center: Option<String>,
    pub street_num: String,
    pub street_name: String,
    pub muni: String,
    pub postal_code: Option<String>,
    pub num_dwellings: i32,
    pub num_floors: i32,
    pub area_footprint: f64,
    pub area_total: f64,
    /// Disrepair index, percent of the building's value.
    pub ivp: f64,
    pub disrepair_state: Option<String>,
    pub interest_adjust_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub building_id: Option<i32>,
}

impl HousingRecord {
    pub fn from_csv(record: &StringRecord) -> AppResult<Self> {
        Ok(Self {
            id: integer(record, col::ID)?,
            project_id: integer(record, col::PROJECT_ID)?,
            organism: field(record, col::ORGANISM)?.to_string(),
            service_center: optional_text(record, col::SERVICE_CENTER),
            street_num: street_number(field(record, col::STREET_DESIGNATION)?),
            street_name: field(record, col::STREET_NAME)?.to_string(),
            muni: field(record, col::MUNI)?.to_string(),
            postal_code: optional_text(record, col::POSTAL_CODE),
            num_dwellings: integer(record, col::NUM_DWELLINGS)?,
            num_floors: integer(record, col::NUM_FLOORS)?,
            area_footprint: decimal(field(record, col::AREA_FOOTPRINT)?)?,
            area_total: decimal(field(record, col::AREA_TOTAL)?)?,
            ivp: decimal(field(record, col::IVP)?.trim_end_matches('%'))?,
            disrepair_state: optional_text(record, col::DISREPAIR_STATE),
            interest_adjust_date: date(record, col::INTEREST_ADJUST_DATE)?,
            contract_end_date: date(record, col::CONTRACT_END_DATE)?,
            category: optional_text(record, col::CATEGORY),
            building_id: optional_text(record, col::BUILDING_ID)
                .map(|v| v.parse::<i32>())
                .transpose()?,
        })
    }

    pub fn has_enough_dwellings(&self) -> bool {
        self.num_dwellings >= MIN_DWELLINGS
    }
}

/// Split a civic designation such as `1234A` into its leading digits and
/// suffix.
pub fn split_street_designation(designation: &str) -> (String, Option<String>) {
    let designation = designation.trim();
    let digits_end = designation
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(designation.len());
    let (number, rest) = designation.split_at(digits_end);
    let suffix = rest.trim().trim_start_matches('-').trim();
    (
        number.to_string(),
        (!suffix.is_empty()).then(|| suffix.to_string()),
    )
}

fn street_number(designation: &str) -> String {
    match split_street_designation(designation) {
        (number, Some(suffix)) if !number.is_empty() => format!("{} {}", number, suffix),
        (_, Some(suffix)) => suffix,
        (number, None) => number,
    }
}

/// Comma-decimal number such as `1234,56`.
pub fn decimal(raw: &str) -> AppResult<f64> {
    raw.trim()
        .replace(' ', "")
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| AppError::ParseError(format!("'{}' is not a decimal: {}", raw, e)))
}

fn field(record: &StringRecord, index: usize) -> AppResult<&str> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| AppError::ParseError(format!("missing column {}", index)))
}

fn optional_text(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != MISSING_SENTINEL)
        .map(str::to_string)
}

fn integer(record: &StringRecord, index: usize) -> AppResult<i32> {
    let raw = field(record, index)?;
    raw.parse::<i32>()
        .map_err(|e| AppError::ParseError(format!("column {}: '{}' is not an integer: {}", index, raw, e)))
}

fn date(record: &StringRecord, index: usize) -> AppResult<Option<NaiveDate>> {
    let Some(raw) = optional_text(record, index) else {
        return Ok(None);
    };
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&raw, format).ok())
        .map(Some)
        .ok_or_else(|| AppError::ParseError(format!("column {}: '{}' is not a date", index, raw)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_fields() {
        let record = fixtures::record(42, 12);
        assert_eq!(record.id, 42);
        assert_eq!(record.project_id, 812);
        assert_eq!(record.street_num, "1234 A");
        assert_eq!(record.street_name, "SAINTE-CATHERINE E");
        assert_eq!(record.postal_code.as_deref(), Some("H2L 2G5"));
        assert_eq!(record.num_floors, 5);
        assert_eq!(record.area_footprint, 350.5);
        assert_eq!(record.area_total, 1402.25);
        assert_eq!(record.ivp, 12.5);
        assert_eq!(
            record.interest_adjust_date,
            NaiveDate::from_ymd_opt(2019, 4, 1)
        );
        assert_eq!(record.contract_end_date, None);
        assert_eq!(record.building_id, Some(1042));
        assert!(record.has_enough_dwellings());
    }

    #[test]
    fn small_buildings_fall_below_threshold() {
        assert!(!fixtures::record(1, 2).has_enough_dwellings());
        assert!(fixtures::record(1, 3).has_enough_dwellings());
    }

    #[test]
    fn splits_street_designations() {
        assert_eq!(split_street_designation("1234"), ("1234".into(), None));
        assert_eq!(
            split_street_designation("1234A"),
            ("1234".into(), Some("A".into()))
        );
        assert_eq!(
            split_street_designation("55-2"),
            ("55".into(), Some("2".into()))
        );
        assert_eq!(split_street_designation("B"), ("".into(), Some("B".into())));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(decimal("12,5x").is_err());
        assert_eq!(decimal(" 1 402,25 ").unwrap(), 1402.25);
    }
}
