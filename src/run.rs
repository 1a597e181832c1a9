//! The run driver: authenticate, resolve the run folder, fetch each keyword
//! in order, write CSVs locally, upload them. Strictly sequential; the first
//! error aborts everything that follows.

use crate::config::{OutputMode, Settings};
use crate::drive::{resolve_or_create, DriveStore};
use crate::error::{Error, Result};
use crate::table::TrendTable;
use crate::trends::TrendSource;
use chrono::{DateTime, Local};
use encoding_rs::SHIFT_JIS;
use std::path::Path;
use tracing::info;

const GEO: &str = "JP";

pub async fn run<T: TrendSource, D: DriveStore>(
    settings: &Settings,
    trends: &T,
    drive: &D,
    output_dir: &Path,
    started_at: DateTime<Local>,
) -> Result<()> {
    let timeframe = settings.timeframe(started_at.date_naive());
    let folder_name = started_at.format("%Y%m%d%H%M%S").to_string();

    tokio::fs::create_dir_all(output_dir).await?;

    let folder_id = resolve_or_create(drive, &settings.gd_folder_id, &folder_name).await?;
    info!(folder_id, timeframe, "run folder resolved");

    match settings.output_mode {
        OutputMode::Merged => {
            run_merged(settings, trends, drive, output_dir, &timeframe, &folder_id).await
        }
        OutputMode::PerKeyword => {
            run_per_keyword(settings, trends, drive, output_dir, &timeframe, &folder_id).await
        }
    }
}

/// One table with a column per keyword, written as UTF-8 and re-encoded to
/// CP932 for the uploaded copy.
async fn run_merged<T: TrendSource, D: DriveStore>(
    settings: &Settings,
    trends: &T,
    drive: &D,
    output_dir: &Path,
    timeframe: &str,
    folder_id: &str,
) -> Result<()> {
    let project = settings
        .project_name
        .as_deref()
        .ok_or_else(|| Error::Config("project_name is required for merged output".into()))?;

    let mut table = TrendTable::new();
    for keyword in &settings.keywords {
        info!(keyword, "fetching interest over time");
        let series = trends.interest_over_time(keyword, GEO, timeframe).await?;
        table.push_series(keyword, series)?;
    }

    let csv = table.to_csv();
    let utf8_name = format!("{project}_utf8.csv");
    let sjis_name = format!("{project}.csv");

    tokio::fs::write(output_dir.join(&utf8_name), csv.as_bytes()).await?;
    let (encoded, _, _) = SHIFT_JIS.encode(&csv);
    let encoded = encoded.into_owned();
    tokio::fs::write(output_dir.join(&sjis_name), &encoded).await?;
    info!(rows = table.num_rows(), columns = table.num_columns(), "wrote csv files");

    drive.upload_csv(folder_id, &sjis_name, encoded).await?;
    Ok(())
}

/// One single-column table per keyword, uploaded as UTF-8.
async fn run_per_keyword<T: TrendSource, D: DriveStore>(
    settings: &Settings,
    trends: &T,
    drive: &D,
    output_dir: &Path,
    timeframe: &str,
    folder_id: &str,
) -> Result<()> {
    for keyword in &settings.keywords {
        info!(keyword, "fetching interest over time");
        let series = trends.interest_over_time(keyword, GEO, timeframe).await?;

        let mut table = TrendTable::new();
        table.push_series(keyword, series)?;

        let file_name = format!("{}.csv", keyword.replace('/', "_"));
        let csv = table.to_csv();
        tokio::fs::write(output_dir.join(&file_name), csv.as_bytes()).await?;
        drive.upload_csv(folder_id, &file_name, csv.into_bytes()).await?;
    }
    Ok(())
}
