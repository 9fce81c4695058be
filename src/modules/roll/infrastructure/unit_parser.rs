//! Field extraction from one `RLUEx` unit subtree.

use super::xml_reader::{DocumentHeader, XmlNode};
use crate::modules::roll::domain::address::RawAddress;
use crate::modules::roll::domain::codes::{
    resolve_or_raw, CONSTRUCTION_TYPES, OWNER_STATUSES, PHYSICAL_LINKS,
};
use crate::modules::roll::domain::derived_code::{CodeSegments, DerivedCode};
use crate::modules::roll::domain::eval_unit::{EvalUnit, OwnerType, UnitDetails, UnitKey};
use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Land-use code; mandatory on every unit.
pub fn parse_cubf(unit: &XmlNode) -> AppResult<i32> {
    required(unit, "RL0105A")?
        .parse()
        .map_err(|_| AppError::ParseError("RL0105A: land-use code is not a number".to_string()))
}

pub fn parse_derived_code(unit: &XmlNode) -> AppResult<DerivedCode> {
    let rl0104 = unit
        .find("RL0104")
        .ok_or_else(|| AppError::ParseError("missing RL0104".to_string()))?;

    DerivedCode::from_segments(&CodeSegments {
        a: rl0104.text_of("RL0104A"),
        b: rl0104.text_of("RL0104B"),
        c: rl0104.text_of("RL0104C"),
        d: rl0104.text_of("RL0104D"),
        e: rl0104.text_of("RL0104E"),
        f: rl0104.text_of("RL0104F"),
    })
}

pub fn unit_key(
    header: &DocumentHeader,
    muni: &str,
    code: DerivedCode,
    cubf: i32,
) -> AppResult<UnitKey> {
    Ok(UnitKey {
        id: code.unit_id(&header.muni_code)?,
        code,
        muni: muni.to_string(),
        muni_code: header.muni_code.clone(),
        year: header.year,
        cubf,
    })
}

/// Full extraction. Only called for kept land-use codes and ids not yet
/// stored.
pub fn parse_unit(unit: &XmlNode, key: UnitKey) -> AppResult<EvalUnit> {
    // Several RL0101x may exist in theory; the first is the one in use.
    let raw_address = unit
        .find("RL0101x")
        .map(parse_raw_address)
        .unwrap_or_default();

    let (owner_date, owner_type) = latest_owner(unit)?;

    let details = UnitDetails {
        arrond: text(unit, "RL0102A"),
        file_num: text(unit, "RL0106A"),
        nghbr_unit: text(unit, "RL0107A"),
        owner_date,
        owner_type,
        owner_status: unit
            .find("RL0201")
            .and_then(|owner| owner.text_of("RL0201U"))
            .map(|code| resolve_or_raw(OWNER_STATUSES, code, "owner status")),
        lot_lin_dim: number(unit, "RL0301A")?,
        lot_area: number(unit, "RL0302A")?,
        max_floors: number(unit, "RL0306A")?,
        const_yr: number(unit, "RL0307A")?,
        const_yr_real: text(unit, "RL0307B"),
        floor_area: number(unit, "RL0308A")?,
        phys_link: unit
            .text_of("RL0309A")
            .map(|code| resolve_or_raw(PHYSICAL_LINKS, code, "physical link")),
        const_type: unit
            .text_of("RL0310A")
            .map(|code| resolve_or_raw(CONSTRUCTION_TYPES, code, "construction type")),
        num_dwelling: number(unit, "RL0311A")?,
        num_rental: number(unit, "RL0312A")?,
        num_non_res: number(unit, "RL0313A")?,
        apprais_date: date(unit, "RL0401A")?,
        lot_value: number(unit, "RL0402A")?,
        building_value: number(unit, "RL0403A")?,
        total_value: number(unit, "RL0404A")?,
        prev_total_value: number(unit, "RL0405A")?,
    };

    EvalUnit::from_parts(key, raw_address.resolve(), details)
}

fn parse_raw_address(rl0101x: &XmlNode) -> RawAddress {
    RawAddress {
        num_adr_inf: text(rl0101x, "RL0101Ax"),
        num_adr_inf_2: text(rl0101x, "RL0101Bx"),
        num_adr_sup: text(rl0101x, "RL0101Cx"),
        num_adr_sup_2: text(rl0101x, "RL0101Dx"),
        way_type: text(rl0101x, "RL0101Ex"),
        way_link: text(rl0101x, "RL0101Fx"),
        street: text(rl0101x, "RL0101Gx"),
        cardinal: text(rl0101x, "RL0101Hx"),
        apt_num_1: text(rl0101x, "RL0101Ix"),
        apt_num_2: text(rl0101x, "RL0101Jx"),
    }
}

/// The most recently dated owner record wins.
fn latest_owner(unit: &XmlNode) -> AppResult<(Option<NaiveDate>, Option<OwnerType>)> {
    let Some(rl0201) = unit.find("RL0201") else {
        return Ok((None, None));
    };

    let mut latest: Option<(NaiveDate, OwnerType)> = None;
    for record in rl0201.find_all("RL0201x") {
        let Some(owner_date) = date(record, "RL0201Gx")? else {
            continue;
        };
        let owner_type = OwnerType::from_code(record.text_of("RL0201Hx").unwrap_or_default());
        if latest.map_or(true, |(best, _)| owner_date > best) {
            latest = Some((owner_date, owner_type));
        }
    }

    Ok(match latest {
        Some((d, t)) => (Some(d), Some(t)),
        None => (None, None),
    })
}

fn required<'a>(node: &'a XmlNode, tag: &str) -> AppResult<&'a str> {
    node.text_of(tag)
        .ok_or_else(|| AppError::ParseError(format!("missing {}", tag)))
}

fn text(node: &XmlNode, tag: &str) -> Option<String> {
    node.text_of(tag).map(str::to_string)
}

fn number<T: FromStr>(node: &XmlNode, tag: &str) -> AppResult<Option<T>> {
    node.text_of(tag)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::ParseError(format!("{}: '{}' is not a number", tag, raw)))
        })
        .transpose()
}

fn date(node: &XmlNode, tag: &str) -> AppResult<Option<NaiveDate>> {
    node.text_of(tag)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|e| AppError::ParseError(format!("{}: '{}' {}", tag, raw, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::roll::infrastructure::xml_reader::RollDocumentReader;

    const UNIT: &str = r#"<RL><RLM01A>66023</RLM01A><RLM02A>2022</RLM02A>
<RLUEx>
  <RL0101><RL0101x>
    <RL0101Ax>4040</RL0101Ax><RL0101Ex>RU</RL0101Ex><RL0101Fx>5</RL0101Fx>
    <RL0101Gx>ÉCLUSE</RL0101Gx><RL0101Ix>1204</RL0101Ix>
  </RL0101x></RL0101>
  <RL0102A>03</RL0102A>
  <RL0104><RL0104A>9753</RL0104A><RL0104B>21</RL0104B><RL0104C>4538</RL0104C><RL0104F>0013</RL0104F></RL0104>
  <RL0105A>1000</RL0105A>
  <RL0201>
    <RL0201x><RL0201Gx>2019-03-12</RL0201Gx><RL0201Hx>2</RL0201Hx></RL0201x>
    <RL0201x><RL0201Gx>2001-05-01</RL0201Gx><RL0201Hx>1</RL0201Hx></RL0201x>
    <RL0201U>1</RL0201U>
  </RL0201>
  <RL0302A>412.5</RL0302A>
  <RL0309A>2</RL0309A>
  <RL0310A>9</RL0310A>
  <RL0311A>1</RL0311A>
  <RL0401A>2021-07-01</RL0401A>
  <RL0404A>310000</RL0404A>
</RLUEx></RL>"#;

    fn first_unit() -> (DocumentHeader, XmlNode) {
        let mut reader = RollDocumentReader::from_reader(UNIT.as_bytes(), "unit");
        let header = reader.read_header().unwrap();
        let unit = reader.next_unit().unwrap().unwrap();
        (header, unit)
    }

    #[test]
    fn parses_a_complete_unit() {
        let (header, node) = first_unit();
        let cubf = parse_cubf(&node).unwrap();
        let code = parse_derived_code(&node).unwrap();
        assert_eq!(code.as_str(), "975321453800000013");

        let key = unit_key(&header, "Québec", code, cubf).unwrap();
        let unit = parse_unit(&node, key).unwrap();

        assert_eq!(unit.id, "66023975321453800000013");
        assert_eq!(unit.cubf, 1000);
        assert_eq!(unit.address, "4040 Rue De L'Écluse");
        assert_eq!(unit.apt_num_1.as_deref(), Some("1204"));
        assert_eq!(unit.arrond.as_deref(), Some("03"));
        assert_eq!(unit.owner_date, NaiveDate::from_ymd_opt(2019, 3, 12));
        assert_eq!(unit.owner_type.as_deref(), Some("moral"));
        assert_eq!(unit.owner_status.as_deref(), Some("Propriétaire"));
        assert_eq!(unit.lot_area, Some(412.5));
        assert_eq!(unit.phys_link.as_deref(), Some("Jumelé"));
        // Unknown construction type stays raw.
        assert_eq!(unit.const_type.as_deref(), Some("9"));
        assert_eq!(unit.total_value, Some(310000.0));
        assert_eq!(unit.year, 2022);
    }

    #[test]
    fn bad_number_is_reported_with_tag() {
        let mut node = XmlNode::new("RLUEx");
        let mut field = XmlNode::new("RL0311A");
        field.text = "trois".into();
        node.children.push(field);

        let err = number::<i32>(&node, "RL0311A").unwrap_err();
        assert!(err.to_string().contains("RL0311A"));
    }

    #[test]
    fn missing_land_use_code_is_an_error() {
        let node = XmlNode::new("RLUEx");
        assert!(parse_cubf(&node).is_err());
    }
}
