//! Tables for printing API results to a terminal.

use crate::hyperview::{Asset, BusinessEntity, Sensor};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// A titled table of text cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I>(title: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            title: title.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: vec![],
        }
    }

    /// Append a row.
    ///
    /// Missing cells at the end of the row are left blank; extra cells are dropped.
    pub fn push<I>(&mut self, cells: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut row: Vec<String> = cells
            .into_iter()
            .map(Into::into)
            .take(self.headers.len())
            .collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| width(&row[i]))
                    .chain([width(header)])
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let widths = self.widths();
        // Each column is padded by one space on both sides, plus one border per column and one
        // at the end.
        let total: usize = widths.iter().map(|w| w + 3).sum::<usize>() + 1;
        let title_pad = total.saturating_sub(width(&self.title)) / 2;
        writeln!(f, "{:title_pad$}{}", "", self.title)?;

        border(f, &widths, '┌', '┬', '┐')?;
        line(f, &widths, &self.headers)?;
        border(f, &widths, '├', '┼', '┤')?;
        for row in &self.rows {
            line(f, &widths, row)?;
        }
        border(f, &widths, '└', '┴', '┘')
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn border(f: &mut Formatter, widths: &[usize], left: char, mid: char, right: char) -> fmt::Result {
    write!(f, "{left}")?;
    for (i, w) in widths.iter().enumerate() {
        if i > 0 {
            write!(f, "{mid}")?;
        }
        write!(f, "{}", "─".repeat(w + 2))?;
    }
    writeln!(f, "{right}")
}

fn line(f: &mut Formatter, widths: &[usize], cells: &[String]) -> fmt::Result {
    write!(f, "│")?;
    for (cell, w) in cells.iter().zip(widths) {
        let pad = w - width(cell);
        write!(f, " {cell}{:pad$} │", "")?;
    }
    writeln!(f)
}

/// Render an optional field the way the tables show it.
pub fn cell(value: Option<&str>) -> String {
    value.unwrap_or("None").to_string()
}

/// Render a sensor reading.
pub fn value_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".into(),
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
    }
}

/// The asset list table.
pub fn assets(assets: &[Asset]) -> Table {
    let mut table = Table::new("Asset List", ["ID", "Asset Name", "Parent Name"]);
    for asset in assets {
        table.push([
            asset.id.clone(),
            cell(asset.name.as_deref()),
            cell(asset.parent_name.as_deref()),
        ]);
    }
    table
}

/// The sensors of a single asset.
pub fn asset_sensors(asset_id: &str, sensors: &[Sensor]) -> Table {
    let mut table = Table::new(
        format!("Sensors for asset {asset_id}"),
        ["Sensor ID", "Name", "Timestamp", "Value", "Unit"],
    );
    for sensor in sensors {
        table.push([
            sensor.id.clone(),
            cell(sensor.name.as_deref()),
            cell(sensor.last_value_update.as_deref()),
            value_cell(sensor.value.as_ref()),
            cell(sensor.unit_string.as_deref()),
        ]);
    }
    table
}

/// Sensors from any number of assets.
pub fn sensors(sensors: &[Sensor]) -> Table {
    let mut table = Table::new(
        "Sensors",
        ["Asset ID", "Sensor ID", "Name", "Timestamp", "Value", "Unit"],
    );
    for sensor in sensors {
        table.push([
            cell(sensor.asset_id.as_deref()),
            sensor.id.clone(),
            cell(sensor.name.as_deref()),
            cell(sensor.last_value_update.as_deref()),
            value_cell(sensor.value.as_ref()),
            cell(sensor.unit_string.as_deref()),
        ]);
    }
    table
}

pub fn business_entities(entities: &[BusinessEntity]) -> Table {
    let mut table = Table::new("Business Entities", ["ID", "Name"]);
    for entity in entities {
        table.push([entity.id.clone(), entity.name.clone()]);
    }
    table
}
