//! NumPy `.npy` reader and writer.
//!
//! The parcellated time series and the region table of the HCP release are
//! stored as `.npy` files.  Only what those files need is supported:
//!
//! * format versions 1.0, 2.0 and 3.0,
//! * little-, big- and native-endian floats (`f4`, `f8`), signed and unsigned
//!   integers (1–8 bytes), fixed-width unicode (`U<n>`) and byte strings
//!   (`S<n>`),
//! * C and Fortran memory order (Fortran arrays are returned in standard
//!   layout).
//!
//! Pickled object arrays (`|O`) are rejected.
use anyhow::{bail, Context, Result};
use ndarray::{Array2, ArrayD, ArrayViewD, Ix2, IxDyn};
use std::path::Path;
use tracing::debug;

use crate::error::ContrastError;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Parsed `.npy` header dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub descr: String,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

/// Decoded array, widened to one element type per kind.
#[derive(Debug, Clone)]
pub enum NpyArray {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
    Text(ArrayD<String>),
}

// ── Header ────────────────────────────────────────────────────────────────────

fn dict_value<'a>(dict: &'a str, key: &str) -> Result<&'a str> {
    let needle = format!("'{key}'");
    let at = dict
        .find(&needle)
        .with_context(|| format!("header has no '{key}' entry"))?;
    let rest = dict[at + needle.len()..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .with_context(|| format!("malformed '{key}' entry"))?;
    Ok(rest.trim_start())
}

fn parse_dict(dict: &str) -> Result<NpyHeader> {
    let descr = {
        let v = dict_value(dict, "descr")?;
        let v = v.strip_prefix('\'').context("descr is not a string")?;
        let end = v.find('\'').context("unterminated descr")?;
        v[..end].to_string()
    };

    let fortran_order = {
        let v = dict_value(dict, "fortran_order")?;
        if v.starts_with("True") {
            true
        } else if v.starts_with("False") {
            false
        } else {
            bail!("fortran_order is neither True nor False");
        }
    };

    let shape = {
        let v = dict_value(dict, "shape")?;
        let v = v.strip_prefix('(').context("shape is not a tuple")?;
        let end = v.find(')').context("unterminated shape tuple")?;
        v[..end]
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                // Older writers emit Python 2 longs, e.g. `360L`.
                s.trim_end_matches('L')
                    .parse::<usize>()
                    .with_context(|| format!("bad shape entry '{s}'"))
            })
            .collect::<Result<Vec<_>>>()?
    };

    Ok(NpyHeader { descr, fortran_order, shape })
}

/// Parse the preamble; returns the header and the offset of the data block.
pub fn parse_header(bytes: &[u8]) -> Result<(NpyHeader, usize)> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        bail!("not an npy file (bad magic)");
    }
    let major = bytes[6];
    let (len, start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                bail!("truncated npy preamble");
            }
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        v => bail!("unsupported npy format version {v}"),
    };
    if bytes.len() < start + len {
        bail!("truncated npy header");
    }
    let dict = std::str::from_utf8(&bytes[start..start + len]).context("npy header is not utf-8")?;
    Ok((parse_dict(dict)?, start + len))
}

// ── Data ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Endian {
    Little,
    Big,
}

fn chunks(raw: &[u8], width: usize, count: usize) -> Result<std::slice::ChunksExact<'_, u8>> {
    let need = width * count;
    if raw.len() < need {
        bail!("data block holds {} bytes, expected {need}", raw.len());
    }
    Ok(raw[..need].chunks_exact(width.max(1)))
}

fn uint(b: &[u8], endian: Endian) -> u64 {
    let mut buf = [0u8; 8];
    match endian {
        Endian::Little => {
            buf[..b.len()].copy_from_slice(b);
            u64::from_le_bytes(buf)
        }
        Endian::Big => {
            buf[8 - b.len()..].copy_from_slice(b);
            u64::from_be_bytes(buf)
        }
    }
}

fn sint(b: &[u8], endian: Endian) -> i64 {
    let bits = 8 * b.len() as u32;
    let u = uint(b, endian);
    // Sign-extend from `bits`.
    ((u << (64 - bits)) as i64) >> (64 - bits)
}

fn decode(header: &NpyHeader, raw: &[u8]) -> Result<NpyArray> {
    let d = header.descr.as_str();
    if d.len() < 2 {
        bail!("unsupported dtype '{d}'");
    }
    let endian = match &d[..1] {
        "<" | "|" | "=" => Endian::Little,
        ">" => Endian::Big,
        _ => bail!("unsupported byte order in dtype '{d}'"),
    };
    let kind = &d[1..2];
    let width: usize = d[2..]
        .parse()
        .with_context(|| format!("unsupported dtype '{d}'"))?;
    let count: usize = header.shape.iter().product();

    // Fortran order: the data is the transpose laid out in C order.
    let disk_shape: Vec<usize> = if header.fortran_order {
        header.shape.iter().rev().copied().collect()
    } else {
        header.shape.clone()
    };

    fn build<T: Clone>(shape: &[usize], fortran: bool, data: Vec<T>) -> Result<ArrayD<T>> {
        let arr = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(if fortran {
            arr.reversed_axes().as_standard_layout().into_owned()
        } else {
            arr
        })
    }
    let fortran = header.fortran_order;

    match kind {
        "f" => {
            let data: Vec<f64> = match width {
                4 => chunks(raw, 4, count)?
                    .map(|b| f32::from_bits(uint(b, endian) as u32) as f64)
                    .collect(),
                8 => chunks(raw, 8, count)?
                    .map(|b| f64::from_bits(uint(b, endian)))
                    .collect(),
                _ => bail!("unsupported float width {width}"),
            };
            Ok(NpyArray::Float(build(&disk_shape, fortran, data)?))
        }
        "i" | "u" => {
            if !matches!(width, 1 | 2 | 4 | 8) {
                bail!("unsupported integer width {width}");
            }
            let data: Vec<i64> = chunks(raw, width, count)?
                .map(|b| if kind == "i" { sint(b, endian) } else { uint(b, endian) as i64 })
                .collect();
            Ok(NpyArray::Int(build(&disk_shape, fortran, data)?))
        }
        "U" => {
            let data = chunks(raw, 4 * width, count)?
                .map(|b| {
                    b.chunks_exact(4)
                        .map(|c| uint(c, endian) as u32)
                        .take_while(|&c| c != 0)
                        .map(|c| char::from_u32(c).context("invalid code point in unicode array"))
                        .collect::<Result<String>>()
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(NpyArray::Text(build(&disk_shape, fortran, data)?))
        }
        "S" => {
            let data = chunks(raw, width, count)?
                .map(|b| {
                    let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
                    String::from_utf8_lossy(&b[..end]).into_owned()
                })
                .collect();
            Ok(NpyArray::Text(build(&disk_shape, fortran, data)?))
        }
        _ => bail!("unsupported dtype '{d}'"),
    }
}

/// Decode an in-memory `.npy` image.
pub fn from_bytes(bytes: &[u8]) -> Result<NpyArray> {
    let (header, data_start) = parse_header(bytes)?;
    decode(&header, &bytes[data_start..])
}

/// Read a `.npy` file.
///
/// A missing file is reported as [`ContrastError::DataNotFound`]; anything
/// wrong with its contents as [`ContrastError::MalformedNpy`].
pub fn read_npy(path: &Path) -> Result<NpyArray> {
    if !path.is_file() {
        return Err(ContrastError::DataNotFound { path: path.to_path_buf() }.into());
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read npy");
    from_bytes(&bytes).map_err(|e| {
        ContrastError::MalformedNpy {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        }
        .into()
    })
}

impl NpyArray {
    /// Numeric contents as `f64`; integers are converted.
    pub fn into_float(self) -> Result<ArrayD<f64>> {
        match self {
            NpyArray::Float(a) => Ok(a),
            NpyArray::Int(a) => Ok(a.mapv(|v| v as f64)),
            NpyArray::Text(_) => bail!("expected a numeric array, found text"),
        }
    }

    pub fn into_int(self) -> Result<ArrayD<i64>> {
        match self {
            NpyArray::Int(a) => Ok(a),
            _ => bail!("expected an integer array"),
        }
    }

    pub fn into_text(self) -> Result<ArrayD<String>> {
        match self {
            NpyArray::Text(a) => Ok(a),
            _ => bail!("expected a string array"),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            NpyArray::Float(a) => a.shape(),
            NpyArray::Int(a) => a.shape(),
            NpyArray::Text(a) => a.shape(),
        }
    }
}

/// Read a 2-D numeric `.npy` file as `f64`.
pub fn read_f64_2d(path: &Path) -> Result<Array2<f64>> {
    let arr = read_npy(path)?;
    let shape = arr.shape().to_vec();
    arr.into_float()
        .and_then(|a| Ok(a.into_dimensionality::<Ix2>()?))
        .map_err(|e| {
            ContrastError::MalformedNpy {
                path: path.to_path_buf(),
                reason: format!("expected a 2-D numeric array, got shape {shape:?}: {e}"),
            }
            .into()
        })
}

/// Read a 2-D string `.npy` file.
pub fn read_text_2d(path: &Path) -> Result<Array2<String>> {
    let arr = read_npy(path)?;
    let shape = arr.shape().to_vec();
    arr.into_text()
        .and_then(|a| Ok(a.into_dimensionality::<Ix2>()?))
        .map_err(|e| {
            ContrastError::MalformedNpy {
                path: path.to_path_buf(),
                reason: format!("expected a 2-D string array, got shape {shape:?}: {e}"),
            }
            .into()
        })
}

// ── Writer ────────────────────────────────────────────────────────────────────

fn preamble(descr: &str, shape: &[usize]) -> Vec<u8> {
    let shape_str = if shape.len() == 1 {
        format!("({},)", shape[0])
    } else {
        let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
        format!("({})", dims.join(", "))
    };
    let mut dict = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape_str}, }}");
    // Total preamble length is padded to a multiple of 64, newline-terminated.
    let unpadded = MAGIC.len() + 4 + dict.len() + 1;
    let pad = (64 - unpadded % 64) % 64;
    dict.extend(std::iter::repeat(' ').take(pad));
    dict.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + dict.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out
}

/// Encode an `f64` array as a version 1.0 `.npy` image (`<f8`, C order).
pub fn f64_to_bytes(arr: ArrayViewD<f64>) -> Vec<u8> {
    let mut out = preamble("<f8", arr.shape());
    out.extend(arr.iter().flat_map(|v| v.to_le_bytes()));
    out
}

/// Encode an `i64` array (`<i8`, C order).
pub fn i64_to_bytes(arr: ArrayViewD<i64>) -> Vec<u8> {
    let mut out = preamble("<i8", arr.shape());
    out.extend(arr.iter().flat_map(|v| v.to_le_bytes()));
    out
}

/// Encode a string array as fixed-width unicode (`<U<n>`, C order).
pub fn text_to_bytes(arr: ArrayViewD<String>) -> Vec<u8> {
    let width = arr.iter().map(|s| s.chars().count()).max().unwrap_or(0).max(1);
    let mut out = preamble(&format!("<U{width}"), arr.shape());
    for s in arr.iter() {
        let n = s.chars().count();
        out.extend(s.chars().flat_map(|c| (c as u32).to_le_bytes()));
        out.extend(std::iter::repeat(0u8).take(4 * (width - n)));
    }
    out
}

pub fn write_f64(path: &Path, arr: ArrayViewD<f64>) -> Result<()> {
    std::fs::write(path, f64_to_bytes(arr)).with_context(|| format!("writing {}", path.display()))
}

pub fn write_i64(path: &Path, arr: ArrayViewD<i64>) -> Result<()> {
    std::fs::write(path, i64_to_bytes(arr)).with_context(|| format!("writing {}", path.display()))
}

pub fn write_text(path: &Path, arr: ArrayViewD<String>) -> Result<()> {
    std::fs::write(path, text_to_bytes(arr)).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array1};

    #[test]
    fn header_is_64_byte_aligned() {
        let a = Array1::from(vec![1.0_f64, 2.0, 3.0]);
        let bytes = f64_to_bytes(a.view().into_dyn());
        let (header, start) = parse_header(&bytes).unwrap();
        assert_eq!(start % 64, 0);
        assert_eq!(bytes[start - 1], b'\n');
        assert_eq!(header.descr, "<f8");
        assert_eq!(header.shape, vec![3]);
        assert!(!header.fortran_order);
    }

    #[test]
    fn parses_numpy_written_header() {
        let dict = "{'descr': '<f4', 'fortran_order': True, 'shape': (360, 405), }";
        let h = parse_dict(dict).unwrap();
        assert_eq!(h.descr, "<f4");
        assert!(h.fortran_order);
        assert_eq!(h.shape, vec![360, 405]);
    }

    #[test]
    fn fortran_order_is_transposed_into_standard_layout() {
        // Logical [[1, 2, 3], [4, 5, 6]] stored column-major.
        let dict = "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 3), }";
        let header = parse_dict(dict).unwrap();
        let raw: Vec<u8> = [1.0_f64, 4.0, 2.0, 5.0, 3.0, 6.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let arr = decode(&header, &raw).unwrap().into_float().unwrap();
        let arr = arr.into_dimensionality::<Ix2>().unwrap();
        assert_eq!(arr, arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
    }

    #[test]
    fn float32_is_widened() {
        let dict = "{'descr': '<f4', 'fortran_order': False, 'shape': (2,), }";
        let header = parse_dict(dict).unwrap();
        let raw: Vec<u8> = [0.5_f32, -1.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        let arr = decode(&header, &raw).unwrap().into_float().unwrap();
        assert_eq!(arr.as_slice().unwrap(), &[0.5, -1.25]);
    }

    #[test]
    fn signed_integers_are_sign_extended() {
        let dict = "{'descr': '<i2', 'fortran_order': False, 'shape': (2,), }";
        let header = parse_dict(dict).unwrap();
        let raw: Vec<u8> = [-3_i16, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let arr = decode(&header, &raw).unwrap().into_int().unwrap();
        assert_eq!(arr.as_slice().unwrap(), &[-3, 7]);
    }

    #[test]
    fn unicode_strings_strip_padding() {
        let names = ndarray::arr1(&["R_V1_ROI".to_string(), "L_V1".to_string()]);
        let bytes = text_to_bytes(names.view().into_dyn());
        let back = from_bytes(&bytes).unwrap().into_text().unwrap();
        assert_eq!(back.as_slice().unwrap(), &["R_V1_ROI", "L_V1"]);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let a = Array1::from(vec![1.0_f64, 2.0]);
        let mut bytes = f64_to_bytes(a.view().into_dyn());
        bytes.truncate(bytes.len() - 3);
        assert!(from_bytes(&bytes).is_err());
    }

    #[test]
    fn object_arrays_are_rejected() {
        let dict = "{'descr': '|O', 'fortran_order': False, 'shape': (1,), }";
        let header = parse_dict(dict).unwrap();
        assert!(decode(&header, &[0u8; 8]).is_err());
    }
}
