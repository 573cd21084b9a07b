//! Region label table.
//!
//! `regions.npy` is a `[region, field]` string array; field 0 is the region
//! name and field 1 its network.  Hemisphere is positional: the first half of
//! the region axis belongs to `cfg.hemispheres[0]`, the second half to
//! `cfg.hemispheres[1]`.
use anyhow::Result;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::AnalysisConfig;
use crate::error::ContrastError;
use crate::npy;

pub const REGIONS_FILE: &str = "regions.npy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hemisphere::Left => "Left",
            Hemisphere::Right => "Right",
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Hemisphere {
    type Err = anyhow::Error;

    /// Accepts `left`/`right`/`l`/`r` in any case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Hemisphere::Left),
            "right" | "r" => Ok(Hemisphere::Right),
            _ => anyhow::bail!("unknown hemisphere '{s}' (expected Left or Right)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLabel {
    pub name: String,
    pub network: String,
    pub hemisphere: Hemisphere,
}

/// Per-region attributes in region-axis order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    labels: Vec<RegionLabel>,
}

impl RegionTable {
    /// Build from names and networks; hemispheres are assigned by position.
    pub fn from_columns(cfg: &AnalysisConfig, names: Vec<String>, networks: Vec<String>) -> Result<Self> {
        if names.len() != cfg.n_regions {
            return Err(ContrastError::ShapeMismatch {
                what: "region table".into(),
                expected: cfg.n_regions,
                got: names.len(),
            }
            .into());
        }
        if networks.len() != names.len() {
            return Err(ContrastError::ShapeMismatch {
                what: "region networks".into(),
                expected: names.len(),
                got: networks.len(),
            }
            .into());
        }
        let half = cfg.regions_per_hemisphere();
        let labels = names
            .into_iter()
            .zip(networks)
            .enumerate()
            .map(|(i, (name, network))| RegionLabel {
                name,
                network,
                hemisphere: if i < half { cfg.hemispheres[0] } else { cfg.hemispheres[1] },
            })
            .collect();
        Ok(Self { labels })
    }

    /// Load `<base_dir>/regions.npy`.
    pub fn load(cfg: &AnalysisConfig, base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(REGIONS_FILE);
        let table = npy::read_text_2d(&path)?;
        if table.ncols() < 2 {
            return Err(ContrastError::MalformedNpy {
                path,
                reason: format!("expected at least 2 fields per region, got {}", table.ncols()),
            }
            .into());
        }
        let names = table.column(0).to_vec();
        let networks = table.column(1).to_vec();
        tracing::debug!(path = %path.display(), n = names.len(), "loaded region table");
        Self::from_columns(cfg, names, networks)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionLabel> {
        self.labels.iter()
    }

    pub fn get(&self, i: usize) -> Option<&RegionLabel> {
        self.labels.get(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg() -> AnalysisConfig {
        AnalysisConfig { n_regions: 4, ..AnalysisConfig::default() }
    }

    #[test]
    fn first_half_is_right_hemisphere() {
        let names = ["R_a", "R_b", "L_a", "L_b"].map(String::from).to_vec();
        let nets = ["Visual1", "Auditory", "Visual1", "Auditory"].map(String::from).to_vec();
        let table = RegionTable::from_columns(&small_cfg(), names, nets).unwrap();
        let hemis: Vec<_> = table.iter().map(|l| l.hemisphere).collect();
        assert_eq!(hemis, vec![Hemisphere::Right, Hemisphere::Right, Hemisphere::Left, Hemisphere::Left]);
    }

    #[test]
    fn wrong_length_is_a_shape_mismatch() {
        let names = vec!["a".to_string(); 3];
        let err = RegionTable::from_columns(&small_cfg(), names.clone(), names).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContrastError>(),
            Some(ContrastError::ShapeMismatch { expected: 4, got: 3, .. })
        ));
    }

    #[test]
    fn hemisphere_parses_case_insensitively() {
        assert_eq!("LEFT".parse::<Hemisphere>().unwrap(), Hemisphere::Left);
        assert_eq!("r".parse::<Hemisphere>().unwrap(), Hemisphere::Right);
        assert!("both".parse::<Hemisphere>().is_err());
    }
}
