//! Export the sensors of a list of assets.

use crate::hyperview::{Hyperview, Sensor};
use anyhow::{Context, Error};
use chrono::NaiveDateTime;
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The column of the input file containing asset IDs.
pub const ASSET_ID_COLUMN: &str = "AssetId";

/// How many sensor requests to have in flight at once.
const CONCURRENT_REQUESTS: usize = 8;

/// Columns of the exported CSV file.
const HEADER: [&str; 6] = ["assetId", "sensorId", "name", "timestamp", "value", "unit"];

/// Read asset IDs from the `AssetId` column of a CSV file with a header row.
///
/// IDs are returned in file order. Rows with an empty ID are skipped.
pub fn read_asset_ids(path: impl AsRef<Path>) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("unable to open {}", path.display()))?;
    let column = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == ASSET_ID_COLUMN)
        .ok_or_else(|| {
            Error::msg(format!(
                "{} has no {ASSET_ID_COLUMN} column",
                path.display()
            ))
        })?;

    let mut ids = vec![];
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("malformed row {} in {}", i + 1, path.display()))?;
        match record.get(column).map(str::trim) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => tracing::warn!("row {} of {} has no asset ID, skipping", i + 1, path.display()),
        }
    }
    tracing::info!("read {} asset IDs from {}", ids.len(), path.display());
    Ok(ids)
}

/// Fetch the sensors of every asset in `ids`.
///
/// The result lists the sensors of each asset in turn, in the order of `ids`.
pub async fn collect_sensors<H: Hyperview>(
    hyperview: &H,
    ids: &[String],
) -> Result<Vec<Sensor>, Error> {
    let sensors: Vec<Vec<Sensor>> = stream::iter(ids)
        .map(|id| async move {
            tracing::info!("requesting sensors for asset {id}");
            hyperview.asset_sensors(id).await
        })
        .buffered(CONCURRENT_REQUESTS)
        .try_collect()
        .await?;
    Ok(sensors.into_iter().flatten().collect())
}

#[derive(Serialize)]
struct SensorRow<'a> {
    asset_id: Option<&'a str>,
    sensor_id: &'a str,
    name: Option<&'a str>,
    timestamp: Option<&'a str>,
    value: Option<String>,
    unit: Option<&'a str>,
}

impl<'a> From<&'a Sensor> for SensorRow<'a> {
    fn from(sensor: &'a Sensor) -> Self {
        Self {
            asset_id: sensor.asset_id.as_deref(),
            sensor_id: &sensor.id,
            name: sensor.name.as_deref(),
            timestamp: sensor.last_value_update.as_deref(),
            value: match &sensor.value {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(value) => Some(value.to_string()),
            },
            unit: sensor.unit_string.as_deref(),
        }
    }
}

/// The name of the export file written at `now`.
pub fn output_file_name(now: NaiveDateTime) -> String {
    now.format("output_%Y%m%d_%H%M%S.csv").to_string()
}

/// Write `sensors` to a timestamped CSV file in `dir`, returning the path of the file.
///
/// Missing values are written as empty cells.
pub fn write_sensor_csv(
    dir: impl AsRef<Path>,
    sensors: &[Sensor],
    now: NaiveDateTime,
) -> Result<PathBuf, Error> {
    let path = dir.as_ref().join(output_file_name(now));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .with_context(|| format!("unable to create {}", path.display()))?;
    writer.write_record(HEADER)?;
    for sensor in sensors {
        writer.serialize(SensorRow::from(sensor))?;
    }
    writer.flush()?;
    tracing::info!("wrote {} sensors to {}", sensors.len(), path.display());
    Ok(path)
}
