//! Network × hemisphere summary of a group contrast, and its CSV export.
//!
//! Rows are sorted by network name, then hemisphere (`Left` before `Right`),
//! one row per (network, hemisphere) pair present in the region table.
use anyhow::Result;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ContrastError;
use crate::regions::{Hemisphere, RegionTable};

pub const CSV_HEADER: [&str; 3] = ["network", "hemi", "contrast"];

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub network: String,
    pub hemi: Hemisphere,
    /// Mean contrast over the member regions.
    pub contrast: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Group `contrast` (one value per region) by the labels in `regions`.
    pub fn from_contrast(contrast: &Array1<f64>, regions: &RegionTable) -> Result<Self> {
        if contrast.len() != regions.len() {
            return Err(ContrastError::ShapeMismatch {
                what: "contrast vector vs region table".into(),
                expected: regions.len(),
                got: contrast.len(),
            }
            .into());
        }

        let mut groups: BTreeMap<(&str, Hemisphere), (f64, usize)> = BTreeMap::new();
        for (label, &v) in regions.iter().zip(contrast.iter()) {
            let g = groups.entry((label.network.as_str(), label.hemisphere)).or_insert((0.0, 0));
            g.0 += v;
            g.1 += 1;
        }

        let rows = groups
            .into_iter()
            .map(|((network, hemi), (sum, n))| SummaryRow {
                network: network.to_string(),
                hemi,
                contrast: sum / n as f64,
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct networks in row order.
    pub fn networks(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if out.last() != Some(&row.network.as_str()) {
                out.push(&row.network);
            }
        }
        out
    }

    pub fn value(&self, network: &str, hemi: Hemisphere) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.network == network && r.hemi == hemi)
            .map(|r| r.contrast)
    }

    /// Write `network,hemi,contrast` rows to any writer.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for row in &self.rows {
            let value = row.contrast.to_string();
            wtr.write_record([row.network.as_str(), row.hemi.as_str(), value.as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Export to a CSV file.  Failures are reported as
    /// [`ContrastError::ExportError`]; `self` is untouched either way.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let export_err = |reason: String| ContrastError::ExportError { path: path.to_path_buf(), reason };
        let file = std::fs::File::create(path).map_err(|e| export_err(e.to_string()))?;
        self.write_csv(file).map_err(|e| export_err(format!("{e:#}")))?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "summary exported");
        Ok(())
    }

    /// Parse a CSV written by [`SummaryTable::write_csv`].
    pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("");
            rows.push(SummaryRow {
                network: field(0).to_string(),
                hemi: field(1).parse()?,
                contrast: field(2).parse()?,
            });
        }
        Ok(Self { rows })
    }
}
