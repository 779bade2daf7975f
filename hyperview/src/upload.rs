//! Create assets from a CSV file.
//!
//! Each row of the input describes one asset:
//!
//! ```text
//! location,name,lifecycle_state,asset_type,model_id,serial_number,asset_tag,rack_u_location,rack_side,rack_position
//! Campus/Room 1/Rack 07,web-01,,server,4d6f...,SN123,,12,front,
//! ```
//!
//! `location` is the path of the asset's parent. Racks are placed in a location, and everything
//! else is placed in a rack. The last three columns only apply to rack-mounted assets and may be
//! omitted.

use crate::hyperview::{AssetProperty, Hyperview, LocationData, NewAsset};
use anyhow::{Context, Error};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// A row of the input file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub location: String,
    pub name: String,
    pub lifecycle_state: String,
    pub asset_type: String,
    pub model_id: String,
    pub serial_number: String,
    pub asset_tag: String,
    pub rack_u_location: Option<String>,
    pub rack_side: Option<String>,
    pub rack_position: Option<String>,
}

impl Record {
    /// The type of asset this record's parent must be.
    pub fn parent_type(&self) -> &'static str {
        if self.asset_type.eq_ignore_ascii_case("rack") {
            "Location"
        } else {
            "Rack"
        }
    }

    /// Build the creation payload for this record, placing it under `parent_id`.
    pub fn into_asset(self, parent_id: String) -> NewAsset {
        let mut properties = vec![AssetProperty::new("serialNumber", self.serial_number)];
        if !self.asset_tag.is_empty() {
            properties.push(AssetProperty::new("assetTag", self.asset_tag));
        }

        let lifecycle_state = if self.lifecycle_state.is_empty() {
            "0".to_string()
        } else {
            self.lifecycle_state
        };

        NewAsset {
            name: self.name,
            status: 0,
            asset_type_id: self.asset_type,
            parent_id: parent_id.clone(),
            asset_lifecycle_state: lifecycle_state,
            product_id: self.model_id,
            creatable_asset_properties: properties,
            location_data: LocationData {
                parent_id,
                rack_side: self.rack_side.map(|s| s.to_lowercase()),
                rack_u_location: self.rack_u_location.map(|s| s.to_lowercase()),
                rack_position: self.rack_position.map(|s| s.to_lowercase()),
            },
        }
    }
}

/// What happened to one row of the input.
#[derive(Debug)]
pub enum Outcome {
    /// The asset was created.
    Created { payload: NewAsset, response: Value },
    /// The asset would have been created, but this is a dry run.
    Planned { payload: NewAsset },
    /// The API rejected the asset.
    Failed { name: String, error: Error },
    /// The row could not be parsed.
    Skipped { row: usize, error: Error },
}

/// Counts of each [`Outcome`] in a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub planned: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created { .. } => self.created += 1,
            Outcome::Planned { .. } => self.planned += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Create an asset for each row of the CSV file at `path`.
///
/// Rows are processed in order. A row that fails doesn't stop the run; `report` is called with
/// the outcome of every row as it is processed. If `dry_run` is set, parents are still looked up
/// but no assets are created.
pub async fn upload<H, F>(
    hyperview: &H,
    path: impl AsRef<Path>,
    dry_run: bool,
    mut report: F,
) -> Result<Summary, Error>
where
    H: Hyperview,
    F: FnMut(&Outcome),
{
    let path = path.as_ref();
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("unable to open {}", path.display()))?;

    let mut summary = Summary::default();
    for (i, record) in reader.deserialize::<Record>().enumerate() {
        let outcome = match record {
            Ok(record) => process(hyperview, record, dry_run).await,
            Err(err) => {
                tracing::error!("row {} of {} is malformed: {err}", i + 1, path.display());
                Outcome::Skipped {
                    row: i + 1,
                    error: err.into(),
                }
            }
        };
        summary.record(&outcome);
        report(&outcome);
    }

    tracing::info!(?summary, "upload finished");
    Ok(summary)
}

async fn process<H: Hyperview>(hyperview: &H, record: Record, dry_run: bool) -> Outcome {
    let name = record.name.clone();
    let parent_type = record.parent_type();
    let parent_id = match hyperview.find_parent(parent_type, &record.location).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            tracing::warn!(
                "no {parent_type} found at {} for asset {name}",
                record.location
            );
            String::new()
        }
        Err(error) => {
            tracing::error!("unable to look up parent of {name}: {error}");
            return Outcome::Failed { name, error };
        }
    };

    let payload = record.into_asset(parent_id);
    if dry_run {
        return Outcome::Planned { payload };
    }
    match hyperview.create_asset(&payload).await {
        Ok(response) => Outcome::Created { payload, response },
        Err(error) => {
            tracing::error!("unable to create asset {name}: {error}");
            Outcome::Failed { name, error }
        }
    }
}
