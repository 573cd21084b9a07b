//! Projection of region values onto a cortical surface mesh.
//!
//! The mapping archive holds, per hemisphere, an integer array with one entry
//! per mesh vertex: the index of the region that vertex belongs to.  Two
//! containers are accepted, told apart by their leading bytes:
//!
//! * NumPy `.npz` (a zip of `<key>.npy` members, stored or deflated), as
//!   written by `np.savez`;
//! * safetensors.
//!
//! The hemisphere of each array is read from its key: `labels_L`,
//! `map_left`, `LEFT` → left; `labels_R`, `right_idx` → right.
//!
//! Projected values are written back as a safetensors file for an external
//! surface viewer.
use anyhow::{Context, Result};
use ndarray::{Array1, ArrayD, Ix1};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::error::ContrastError;
use crate::io::{StWriter, TensorArchive};
use crate::npy;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
use crate::regions::Hemisphere;

/// Hemisphere a tensor name refers to, if any.
pub fn hemisphere_of_key(key: &str) -> Option<Hemisphere> {
    let k = key.to_ascii_lowercase();
    let tagged = |word: &str, letter: char| {
        k.contains(word)
            || k.ends_with(&format!("_{letter}"))
            || k.starts_with(&format!("{letter}_"))
    };
    match (tagged("left", 'l'), tagged("right", 'r')) {
        (true, false) => Some(Hemisphere::Left),
        (false, true) => Some(Hemisphere::Right),
        _ => None,
    }
}

/// Vertex → region index arrays for both hemispheres.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceMap {
    pub left: Option<Array1<i64>>,
    pub right: Option<Array1<i64>>,
}

impl SurfaceMap {
    fn insert(&mut self, key: &str, labels: ArrayD<i64>) -> Result<()> {
        let Some(hemi) = hemisphere_of_key(key) else {
            debug!(key, "ignoring array without hemisphere tag");
            return Ok(());
        };
        let labels = labels
            .into_dimensionality::<Ix1>()
            .with_context(|| format!("surface labels '{key}' must be a 1-D integer array"))?;
        match hemi {
            Hemisphere::Left => self.left = Some(labels),
            Hemisphere::Right => self.right = Some(labels),
        }
        Ok(())
    }

    pub fn from_archive(archive: &TensorArchive) -> Result<Self> {
        let mut map = SurfaceMap::default();
        for name in archive.names() {
            if hemisphere_of_key(name).is_none() {
                debug!(key = name, "ignoring tensor without hemisphere tag");
                continue;
            }
            let Some(tensor) = archive.get(name) else { continue };
            let labels = tensor
                .to_i64()
                .with_context(|| format!("surface labels '{name}' must be integers"))?;
            map.insert(name, labels)?;
        }
        Ok(map)
    }

    /// Parse an `.npz` archive held in memory.
    pub fn from_npz(bytes: &[u8]) -> Result<Self> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).context("opening npz archive")?;
        let mut map = SurfaceMap::default();
        for i in 0..zip.len() {
            let mut member = zip.by_index(i)?;
            if member.is_dir() {
                continue;
            }
            let name = member.name().to_string();
            let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();
            if hemisphere_of_key(&key).is_none() {
                debug!(key = %key, "ignoring npz member without hemisphere tag");
                continue;
            }
            let mut buf = Vec::with_capacity(member.size() as usize);
            member.read_to_end(&mut buf).with_context(|| format!("reading npz member '{name}'"))?;
            let labels = npy::from_bytes(&buf)
                .and_then(npy::NpyArray::into_int)
                .with_context(|| format!("surface labels '{key}' must be integers"))?;
            map.insert(&key, labels)?;
        }
        Ok(map)
    }

    /// Load an `.npz` or safetensors mapping archive.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ContrastError::DataNotFound { path: path.to_path_buf() }.into());
        }
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let map = if bytes.starts_with(ZIP_MAGIC) {
            Self::from_npz(&bytes)
        } else {
            TensorArchive::from_bytes(&bytes).and_then(|a| Self::from_archive(&a))
        };
        map.with_context(|| format!("reading surface map {}", path.display()))
    }

    pub fn labels(&self, hemi: Hemisphere) -> Result<&Array1<i64>> {
        let labels = match hemi {
            Hemisphere::Left => self.left.as_ref(),
            Hemisphere::Right => self.right.as_ref(),
        };
        labels.ok_or_else(|| ContrastError::MissingHemisphere(hemi.to_string()).into())
    }

    /// Value of the region each vertex of `hemi` belongs to.
    pub fn project(&self, values: &Array1<f64>, hemi: Hemisphere) -> Result<Array1<f64>> {
        let labels = self.labels(hemi)?;
        labels
            .iter()
            .enumerate()
            .map(|(vertex, &region)| {
                usize::try_from(region)
                    .ok()
                    .and_then(|r| values.get(r).copied())
                    .ok_or_else(|| {
                        anyhow::Error::from(ContrastError::SurfaceIndexOutOfRange {
                            vertex,
                            region,
                            n_regions: values.len(),
                        })
                    })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }
}

/// Store projected vertex values as `contrast_<left|right>`.
pub fn write_surface_values(path: &Path, values: &Array1<f64>, hemi: Hemisphere) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr1(&format!("contrast_{}", hemi.as_str().to_ascii_lowercase()), values);
    w.write(path)
}
