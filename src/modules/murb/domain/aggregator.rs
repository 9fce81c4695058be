use super::field_mergers::{
    BuildingMerger, CategoricalMerger, CountMerger, FieldMerger, MeasureMerger,
};
use crate::modules::roll::domain::aggregate_key;
use crate::modules::roll::EvalUnit;
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;

/// Builds the synthetic record standing in for a duplicate cluster.
pub struct MurbAggregator {
    mergers: Vec<Box<dyn FieldMerger + Send + Sync>>,
}

impl Default for MurbAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MurbAggregator {
    pub fn new() -> Self {
        Self {
            mergers: vec![
                Box::new(CategoricalMerger),
                Box::new(CountMerger),
                Box::new(MeasureMerger),
                Box::new(BuildingMerger),
            ],
        }
    }

    /// Shared location, address and lot fields come from the first
    /// member; apartment fields are dropped.
    pub fn aggregate(&self, members: &[EvalUnit]) -> AppResult<EvalUnit> {
        let first = members
            .first()
            .ok_or_else(|| AppError::InvalidInput("cannot aggregate an empty cluster".into()))?;

        let mut target = first.clone();
        target.id = aggregate_key(&first.id);
        target.mat18 = aggregate_key(&first.mat18);
        target.apt_num = None;
        target.apt_num_1 = None;
        target.apt_num_2 = None;
        target.associated = None;
        target.date_added = Utc::now();

        for merger in &self.mergers {
            merger.merge_into(&mut target, members);
        }

        Ok(target)
    }
}
