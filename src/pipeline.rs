//! Stage orchestration. Every stage reads the previous stages' committed
//! state from the database; nothing is handed over in memory.

use crate::modules::crossref::crossref_housing;
use crate::modules::datasets::{find_files, remove_stage_dir, stage_dir, DatasetDownloader};
use crate::modules::geo::{assign_coordinates, link_lots, CoordinateOptions};
use crate::modules::imagery::check_imagery;
use crate::modules::jobs::StageReport;
use crate::modules::murb::aggregate_murbs;
use crate::modules::roll::{ingest_roll, IngestOptions};
use crate::shared::config::PipelineConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::Database;
use crate::shared::tally::Tally;
use crate::{log_info, log_warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ROLL_DIR: &str = "roll";
const POINTS_DIR: &str = "points";
const HOUSING_DIR: &str = "hlm";

/// Options shared by every stage command.
#[derive(Debug, Clone)]
pub struct StageOptions {
    pub output_folder: PathBuf,
    pub download_data: bool,
    pub delete_data: bool,
    pub num_workers: usize,
    pub test: bool,
}

pub struct Pipeline {
    db: Database,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Connect and bring the schema up to date.
    pub fn new(config: PipelineConfig, cancel: CancellationToken) -> AppResult<Self> {
        let db = Database::new(&config.database_url)?;
        db.run_migrations()?;
        Ok(Self { db, config, cancel })
    }

    pub async fn ingest_roll(&self, options: &StageOptions) -> AppResult<StageReport> {
        let dir = self
            .prepare(ROLL_DIR, Some(&self.config.roll_xml_url), "xml", options)
            .await?;
        let municipalities = Arc::new(self.config.load_municipalities()?);
        let report = ingest_roll(
            &self.db,
            &dir,
            municipalities,
            IngestOptions {
                num_workers: options.num_workers,
                test: options.test,
            },
            self.cancel.clone(),
        )
        .await;
        self.cleanup(&dir, options)?;
        report
    }

    pub async fn assign_coordinates(&self, options: &StageOptions) -> AppResult<StageReport> {
        let dir = self
            .prepare(POINTS_DIR, self.config.roll_points_url.as_deref(), "csv", options)
            .await?;
        let points = first_file(&dir, "csv")?;
        let report = assign_coordinates(
            &self.db,
            &points,
            CoordinateOptions {
                num_workers: options.num_workers,
                test: options.test,
            },
            self.cancel.clone(),
        )
        .await;
        self.cleanup(&dir, options)?;
        report
    }

    pub async fn link_lots(&self, options: &StageOptions) -> AppResult<StageReport> {
        link_lots(&self.db, options.test, self.cancel.clone()).await
    }

    pub async fn aggregate_murbs(&self, options: &StageOptions) -> AppResult<StageReport> {
        aggregate_murbs(&self.db, options.num_workers, options.test, self.cancel.clone()).await
    }

    pub async fn crossref_housing(&self, options: &StageOptions) -> AppResult<StageReport> {
        let dir = self
            .prepare(HOUSING_DIR, Some(&self.config.housing_csv_url), "csv", options)
            .await?;
        let csv = first_file(&dir, "csv")?;
        let report = crossref_housing(
            &self.db,
            &self.config,
            &csv,
            options.num_workers,
            options.test,
            self.cancel.clone(),
        )
        .await;
        self.cleanup(&dir, options)?;
        report
    }

    pub async fn check_imagery(&self, options: &StageOptions) -> AppResult<StageReport> {
        check_imagery(
            &self.db,
            &self.config,
            options.num_workers,
            options.test,
            self.cancel.clone(),
        )
        .await
    }

    /// Every stage in dependency order. Stops early on a stage error or
    /// an interrupt; reports of completed stages are returned either way.
    pub async fn run_all(&self, options: &StageOptions) -> (Vec<StageReport>, Option<AppError>) {
        let mut reports = Vec::new();

        for stage in Stage::ALL {
            if self.cancel.is_cancelled() {
                log_warn!("Interrupted, skipping {} and later stages", stage.name());
                return (
                    reports,
                    Some(AppError::Cancelled(format!("stopped before {}", stage.name()))),
                );
            }
            log_info!("=== {} ===", stage.name());

            let result = match stage {
                Stage::Ingest => self.ingest_roll(options).await,
                Stage::Coordinates => self.assign_coordinates(options).await,
                Stage::Lots => self.link_lots(options).await,
                Stage::Murb => self.aggregate_murbs(options).await,
                Stage::Crossref => self.crossref_housing(options).await,
                Stage::Imagery => self.check_imagery(options).await,
            };

            match result {
                Ok(report) => {
                    log_info!("{}", report);
                    reports.push(report);
                }
                Err(e) => return (reports, Some(e)),
            }
        }

        (reports, None)
    }

    /// Stage data directory, downloaded when asked or when empty.
    async fn prepare(
        &self,
        name: &str,
        url: Option<&str>,
        extension: &str,
        options: &StageOptions,
    ) -> AppResult<PathBuf> {
        let dir = stage_dir(&options.output_folder, name)?;
        DatasetDownloader::new()?
            .ensure(url, &dir, extension, options.download_data)
            .await?;
        Ok(dir)
    }

    fn cleanup(&self, dir: &Path, options: &StageOptions) -> AppResult<()> {
        if options.delete_data {
            remove_stage_dir(dir)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Coordinates,
    Lots,
    Murb,
    Crossref,
    Imagery,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Ingest,
        Stage::Coordinates,
        Stage::Lots,
        Stage::Murb,
        Stage::Crossref,
        Stage::Imagery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Coordinates => "coords",
            Stage::Lots => "lots",
            Stage::Murb => "murb",
            Stage::Crossref => "crossref",
            Stage::Imagery => "imagery",
        }
    }
}

/// Counters of every report, summed.
pub fn merged_tally(reports: &[StageReport]) -> Tally {
    reports.iter().map(|r| &r.tally).collect()
}

fn first_file(dir: &Path, extension: &str) -> AppResult<PathBuf> {
    let files = find_files(dir, extension)?;
    if files.len() > 1 {
        log_warn!(
            "{} .{} files in {}, using the first",
            files.len(),
            extension,
            dir.display()
        );
    }
    files
        .into_iter()
        .next()
        .map(|(path, _)| path)
        .ok_or_else(|| AppError::NotFound(format!("No .{} file in {}", extension, dir.display())))
}
