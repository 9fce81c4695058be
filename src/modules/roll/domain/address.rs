use super::codes::{resolve_or_raw, CARDINAL_POINTS, WAY_LINKS, WAY_TYPES};

/// Raw address sub-fields of one unit, as coded in the roll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAddress {
    pub num_adr_inf: Option<String>,
    pub num_adr_inf_2: Option<String>,
    pub num_adr_sup: Option<String>,
    pub num_adr_sup_2: Option<String>,
    pub way_type: Option<String>,
    pub way_link: Option<String>,
    pub street: Option<String>,
    pub cardinal: Option<String>,
    pub apt_num_1: Option<String>,
    pub apt_num_2: Option<String>,
}

/// Resolved address columns stored on an evaluation unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressParts {
    pub address: String,
    pub street_name: Option<String>,
    pub num_adr_inf: Option<String>,
    pub num_adr_inf_2: Option<String>,
    pub num_adr_sup: Option<String>,
    pub num_adr_sup_2: Option<String>,
    pub apt_num: Option<String>,
    pub apt_num_1: Option<String>,
    pub apt_num_2: Option<String>,
}

impl RawAddress {
    /// Resolve code tables and build the formatted address and street name.
    ///
    /// `1234 A-1240 rue de l'Église Est` style: number range, way type,
    /// way link, street name, cardinal point, title-cased.
    pub fn resolve(&self) -> AddressParts {
        let way_type = self
            .way_type
            .as_deref()
            .map(|c| resolve_or_raw(WAY_TYPES, c, "way type"));
        let way_link = self
            .way_link
            .as_deref()
            .map(|c| resolve_or_raw(WAY_LINKS, c, "way link"));
        let cardinal = self
            .cardinal
            .as_deref()
            .map(|c| resolve_or_raw(CARDINAL_POINTS, c, "cardinal point"));

        let street_parts: Vec<&str> = [
            way_type.as_deref(),
            way_link.as_deref(),
            self.street.as_deref(),
            cardinal.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        let street = join_street(&street_parts);

        let mut number = [self.num_adr_inf.as_deref(), self.num_adr_inf_2.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(sup) = self.num_adr_sup.as_deref() {
            number.push('-');
            number.push_str(sup);
            if let Some(sup_2) = self.num_adr_sup_2.as_deref() {
                number.push(' ');
                number.push_str(sup_2);
            }
        }

        let address = [number.as_str(), street.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let apt_num = [self.apt_num_1.as_deref(), self.apt_num_2.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        AddressParts {
            address: title_case(address.trim()),
            street_name: (!street.is_empty()).then(|| title_case(&street)),
            num_adr_inf: self.num_adr_inf.clone(),
            num_adr_inf_2: self.num_adr_inf_2.clone(),
            num_adr_sup: self.num_adr_sup.clone(),
            num_adr_sup_2: self.num_adr_sup_2.clone(),
            apt_num: (!apt_num.is_empty()).then_some(apt_num),
            apt_num_1: self.apt_num_1.clone(),
            apt_num_2: self.apt_num_2.clone(),
        }
    }
}

/// Join street tokens with spaces, except after an elided link (`de l'`).
fn join_street(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        if !out.is_empty() && !out.ends_with('\'') {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
/// Digits and punctuation start a new run, so `1234a` becomes `1234A` and
/// `l'église` becomes `L'Église`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
