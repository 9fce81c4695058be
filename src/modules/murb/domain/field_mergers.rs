use crate::modules::roll::domain::codes::{
    resolve_or_raw, CONSTRUCTION_TYPES, CONST_TYPE_FULL_STOREY, PHYSICAL_LINKS, PHYS_LINK_DETACHED,
};
use crate::modules::roll::EvalUnit;

/// Field-specific mergers for duplicate clusters.
/// Each merger handles one category of aggregate fields.
pub trait FieldMerger {
    /// Merge member values into the aggregate.
    fn merge_into(&self, target: &mut EvalUnit, members: &[EvalUnit]);
}

/// Most frequent value, ties to the first one seen. Absent values vote
/// like any other value.
pub fn vote<T: PartialEq + Clone>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, n) in counts {
        if best.as_ref().map_or(true, |(_, m)| n > *m) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}

/// Sum over present values; `None` when no member has one.
pub fn sum_present<T>(values: impl IntoIterator<Item = Option<T>>) -> Option<T>
where
    T: std::iter::Sum<T>,
{
    let mut present = values.into_iter().flatten().peekable();
    present.peek()?;
    Some(present.sum())
}

pub fn average_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.into_iter().flatten().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Building whose apartment numbering breaks the digit-position rule.
const FLOOR_EXCEPTION_POINT: (f64, f64) = (46.7174122671, -71.2773427875);
const FLOOR_EXCEPTION_FLOORS: i32 = 3;

/// Floor count from the largest apartment number: the leading one or two
/// digits are taken as the floor.
pub fn infer_floors(members: &[EvalUnit], lat: Option<f64>, lng: Option<f64>) -> Option<i32> {
    let largest = members
        .iter()
        .filter_map(|m| m.apt_num_1.as_deref())
        .filter_map(|apt| apt.trim().parse::<i32>().ok())
        .max()?;

    let floors = if largest >= 10_000 {
        if lat == Some(FLOOR_EXCEPTION_POINT.0) && lng == Some(FLOOR_EXCEPTION_POINT.1) {
            FLOOR_EXCEPTION_FLOORS
        } else {
            10
        }
    } else if largest >= 1000 {
        largest / 100
    } else {
        largest / 10
    };
    Some(floors)
}

/// Entry year, owner and construction fields by majority vote.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalMerger;

impl FieldMerger for CategoricalMerger {
    fn merge_into(&self, target: &mut EvalUnit, members: &[EvalUnit]) {
        if let Some(year) = vote(members.iter().map(|m| m.year)) {
            target.year = year;
        }
        target.nghbr_unit = vote(members.iter().map(|m| m.nghbr_unit.clone())).flatten();
        target.owner_date = vote(members.iter().map(|m| m.owner_date)).flatten();
        target.owner_type = vote(members.iter().map(|m| m.owner_type.clone())).flatten();
        target.owner_status = vote(members.iter().map(|m| m.owner_status.clone())).flatten();
        target.const_yr = vote(members.iter().map(|m| m.const_yr)).flatten();
        target.const_yr_real = vote(members.iter().map(|m| m.const_yr_real.clone())).flatten();
        target.apprais_date = vote(members.iter().map(|m| m.apprais_date)).flatten();
    }
}

/// Dwelling, rental and non-residential counts by sum.
#[derive(Debug, Clone, Copy)]
pub struct CountMerger;

impl FieldMerger for CountMerger {
    fn merge_into(&self, target: &mut EvalUnit, members: &[EvalUnit]) {
        target.num_dwelling = sum_present(members.iter().map(|m| m.num_dwelling));
        target.num_rental = sum_present(members.iter().map(|m| m.num_rental));
        target.num_non_res = sum_present(members.iter().map(|m| m.num_non_res));
    }
}

/// Areas and values summed, frontage averaged, all to two decimals.
#[derive(Debug, Clone, Copy)]
pub struct MeasureMerger;

impl FieldMerger for MeasureMerger {
    fn merge_into(&self, target: &mut EvalUnit, members: &[EvalUnit]) {
        let sum = |field: fn(&EvalUnit) -> Option<f64>| {
            sum_present(members.iter().map(field)).map(round2)
        };

        target.lot_area = sum(|m| m.lot_area);
        target.floor_area = sum(|m| m.floor_area);
        target.lot_value = sum(|m| m.lot_value);
        target.building_value = sum(|m| m.building_value);
        target.total_value = sum(|m| m.total_value);
        target.prev_total_value = sum(|m| m.prev_total_value);
        target.lot_lin_dim = average_present(members.iter().map(|m| m.lot_lin_dim)).map(round2);
    }
}

/// Physical description of the rebuilt building.
#[derive(Debug, Clone, Copy)]
pub struct BuildingMerger;

impl FieldMerger for BuildingMerger {
    fn merge_into(&self, target: &mut EvalUnit, members: &[EvalUnit]) {
        target.max_floors = infer_floors(members, target.lat, target.lng);
        target.phys_link = Some(resolve_or_raw(PHYSICAL_LINKS, PHYS_LINK_DETACHED, "physical link"));
        target.const_type = Some(resolve_or_raw(
            CONSTRUCTION_TYPES,
            CONST_TYPE_FULL_STOREY,
            "construction type",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::roll::domain::eval_unit::fixtures::unit;

    #[test]
    fn vote_breaks_ties_by_first_seen() {
        assert_eq!(vote(vec!["b", "a", "a", "b"]), Some("b"));
        assert_eq!(vote(vec![1, 2, 2]), Some(2));
        assert_eq!(vote(Vec::<i32>::new()), None);
    }

    #[test]
    fn absent_values_take_part_in_the_vote() {
        assert_eq!(vote(vec![None, Some(1990), None]), Some(None));
    }

    #[test]
    fn sums_ignore_absent_members() {
        assert_eq!(sum_present(vec![Some(2), None, Some(3)]), Some(5));
        assert_eq!(sum_present(vec![Some(0), None]), Some(0));
        assert_eq!(sum_present::<i32>(vec![None, None]), None);
    }

    #[test]
    fn average_and_rounding() {
        assert_eq!(average_present(vec![Some(10.0), None, Some(15.5)]), Some(12.75));
        assert_eq!(average_present(vec![None]), None);
        assert_eq!(round2(1.005_f64 + 0.001), 1.01);
    }

    #[test]
    fn floors_follow_digit_positions() {
        let mut a = unit("0001");
        let mut b = unit("0002");

        a.apt_num_1 = Some("305".into());
        b.apt_num_1 = Some("102".into());
        assert_eq!(infer_floors(&[a.clone(), b.clone()], None, None), Some(30));

        b.apt_num_1 = Some("1204".into());
        assert_eq!(infer_floors(&[a.clone(), b.clone()], None, None), Some(12));

        b.apt_num_1 = Some("10001".into());
        assert_eq!(infer_floors(&[a.clone(), b.clone()], None, None), Some(10));
        assert_eq!(
            infer_floors(&[a.clone(), b], Some(46.7174122671), Some(-71.2773427875)),
            Some(3)
        );

        a.apt_num_1 = Some("A".into());
        assert_eq!(infer_floors(&[a], None, None), None);
    }

    #[test]
    fn count_merger_sums_dwellings_and_rentals() {
        let mut a = unit("0001");
        let mut b = unit("0002");
        a.num_dwelling = Some(5);
        b.num_dwelling = Some(3);
        a.num_rental = Some(2);

        let mut target = a.clone();
        CountMerger.merge_into(&mut target, &[a, b]);
        assert_eq!(target.num_dwelling, Some(8));
        assert_eq!(target.num_rental, Some(2));
        assert_eq!(target.num_non_res, None);
    }

    #[test]
    fn building_merger_marks_detached_full_storey() {
        let a = unit("0001");
        let mut target = a.clone();
        BuildingMerger.merge_into(&mut target, &[a]);
        assert_eq!(target.phys_link.as_deref(), Some("Détaché"));
        assert_eq!(target.const_type.as_deref(), Some("Étagement entier"));
    }
}
