use super::files::find_files;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::TimedOperation;
use crate::log_info;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub struct DatasetDownloader {
    client: reqwest::Client,
}

impl DatasetDownloader {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(6 * 3600))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Make sure `dir` holds at least one `extension` file. Downloads when
    /// `force` is set or nothing is there yet.
    pub async fn ensure(
        &self,
        url: Option<&str>,
        dir: &Path,
        extension: &str,
        force: bool,
    ) -> AppResult<()> {
        let present = !find_files(dir, extension)?.is_empty();
        if present && !force {
            return Ok(());
        }

        let url = url.ok_or_else(|| {
            AppError::ValidationError(format!(
                "No .{} file in {} and no download URL configured",
                extension,
                dir.display()
            ))
        })?;
        self.fetch(url, dir).await?;
        Ok(())
    }

    /// Stream `url` into `dir`, unzipping `.zip` archives in place.
    pub async fn fetch(&self, url: &str, dir: &Path) -> AppResult<PathBuf> {
        let target = dir.join(file_name_from_url(url)?);
        let timer = TimedOperation::new(&format!("download {}", url));
        tracing::info!(url, target = %target.display(), "downloading dataset");

        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let mut out = tokio::fs::File::create(&target).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        timer.finish_with_info(&format!("{} bytes", written));

        if target
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
        {
            let archive = target.clone();
            let dest = dir.to_path_buf();
            tokio::task::spawn_blocking(move || unzip(&archive, &dest)).await??;
        }

        Ok(target)
    }
}

pub fn unzip(archive: &Path, dest: &Path) -> AppResult<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    log_info!("Extracting {} entries from {}", zip.len(), archive.display());
    zip.extract(dest)?;
    Ok(())
}

fn file_name_from_url(url: &str) -> AppResult<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidInput(format!("Cannot derive a file name from {}", url)))
}
