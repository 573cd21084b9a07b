//! Safetensors I/O.
//!
//! Reader: [`TensorArchive`] loads every tensor of a `.safetensors` file into
//! memory, keyed by name.  It backs the surface mapping archive
//! ([`crate::surface::SurfaceMap`]).
//!
//! Writer: [`StWriter`] dumps named arrays, used for per-vertex surface values
//! and by the `subject_steps` binary for intermediate results.
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ContrastError;

// ── Low-level safetensors parser (raw bytes → ndarray, no dependency on the
//    `safetensors` crate's tensor types). ──────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(serde_json::Map<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    if bytes.len() < 8 + n {
        bail!("safetensors header truncated");
    }
    let header: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..8 + n]).context("failed to parse safetensors header")?;
    Ok((header, 8 + n))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry has no shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer shape entry"))
        .collect()
}

fn offsets_of(entry: &serde_json::Value) -> Result<(usize, usize)> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry has no data_offsets")?;
    let get = |i: usize| {
        offsets
            .get(i)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .context("malformed data_offsets")
    };
    Ok((get(0)?, get(1)?))
}

/// One tensor as stored on disk.
#[derive(Debug, Clone)]
pub struct Tensor {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

impl Tensor {
    /// Integer tensor contents as `i64`.
    pub fn to_i64(&self) -> Result<ArrayD<i64>> {
        let vals: Vec<i64> = match self.dtype.as_str() {
            "I64" => self.data.chunks_exact(8)
                .map(|b| i64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
                .collect(),
            "I32" => self.data.chunks_exact(4)
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
                .collect(),
            "I16" => self.data.chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as i64)
                .collect(),
            "U16" => self.data.chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as i64)
                .collect(),
            "U8"  => self.data.iter().map(|&b| b as i64).collect(),
            "I8"  => self.data.iter().map(|&b| b as i8 as i64).collect(),
            other => bail!("expected an integer tensor, found {other}"),
        };
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), vals)?)
    }

    /// Floating-point tensor contents as `f64`.
    pub fn to_f64(&self) -> Result<ArrayD<f64>> {
        let vals: Vec<f64> = match self.dtype.as_str() {
            "F64" => self.data.chunks_exact(8)
                .map(|b| f64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
                .collect(),
            "F32" => self.data.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
            other => bail!("expected a float tensor, found {other}"),
        };
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), vals)?)
    }
}

/// All tensors of a safetensors file, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct TensorArchive {
    pub tensors: BTreeMap<String, Tensor>,
}

impl TensorArchive {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ContrastError::DataNotFound { path: path.to_path_buf() }.into());
        }
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, data_start) = parse_header(bytes)?;
        let mut tensors = BTreeMap::new();
        for (name, entry) in &header {
            if name == "__metadata__" {
                continue;
            }
            let dtype = entry["dtype"].as_str().context("tensor entry has no dtype")?.to_string();
            let shape = shape_of(entry)?;
            let (s, e) = offsets_of(entry)?;
            if s > e || data_start + e > bytes.len() {
                bail!("tensor '{name}' points outside the file");
            }
            let data = bytes[data_start + s..data_start + e].to_vec();
            tensors.insert(name.clone(), Tensor { dtype, shape, data });
        }
        Ok(Self { tensors })
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer that handles F64 and I64 tensors.
///
/// Usage:
/// ```rust,no_run
/// use hcp_contrast::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("contrast", &[0.1f64, -0.2, 0.3], &[3]);
/// w.add_i64("n_subjects", &[339], &[1]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr1(&mut self, name: &str, arr: &Array1<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.len()]);
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    /// Serialised file image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let mut out = Vec::with_capacity(8 + hdr_bytes.len() + pad + offset);
        out.extend_from_slice(&((hdr_bytes.len() + pad) as u64).to_le_bytes());
        out.extend_from_slice(&hdr_bytes);
        out.extend(std::iter::repeat(b' ').take(pad));
        for (_, data, _, _) in &self.entries {
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?).with_context(|| format!("writing {}", path.display()))
    }
}
