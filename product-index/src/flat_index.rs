//! Exact inner-product index over row-major `f32` vectors.
//!
//! Every row carries its item id; an `id -> row` map is kept alongside so
//! callers never rely on positional alignment alone.
//!
//! File layout (little-endian):
//! ```text
//! [4B magic "FSIX"][4B version][4B dim][8B rows]
//! rows × ([4B id-len][id UTF-8][dim × 4B f32])
//! [4B CRC32 of everything above]
//! ```

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::errors::IndexError;

const MAGIC: &[u8; 4] = b"FSIX";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Flat (brute-force) inner-product index.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    ids: Vec<String>,
    data: Vec<f32>,
    rows_by_id: HashMap<String, usize>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            data: Vec::new(),
            rows_by_id: HashMap::new(),
        }
    }

    /// Appends a row and returns its position.
    ///
    /// # Errors
    /// `DimensionMismatch` for a wrong length, `NonFinite` for NaN or infinite
    /// components, `Config` for a duplicate id.
    pub fn add(&mut self, id: impl Into<String>, vector: &[f32]) -> Result<usize, IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                got: vector.len(),
                want: self.dim,
            });
        }
        let id = id.into();
        if !all_finite(vector) {
            return Err(IndexError::NonFinite(format!("row `{id}`")));
        }
        if self.rows_by_id.contains_key(&id) {
            return Err(IndexError::Config(format!("duplicate id `{id}` in index")));
        }
        let row = self.ids.len();
        self.rows_by_id.insert(id.clone(), row);
        self.ids.push(id);
        self.data.extend_from_slice(vector);
        Ok(row)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows_by_id.get(id).copied()
    }

    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Top-`k` rows by inner product, best first; ties keep the lower row.
    ///
    /// `k` is clamped to the row count. An empty index yields no hits.
    ///
    /// # Errors
    /// `DimensionMismatch` if `query` has the wrong length, `NonFinite` if it
    /// holds NaN or an infinity.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                got: query.len(),
                want: self.dim,
            });
        }
        if !all_finite(query) {
            return Err(IndexError::NonFinite("query".into()));
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim.max(1))
            .enumerate()
            .map(|(row, v)| (row, v.iter().zip(query).map(|(a, b)| a * b).sum()))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k.min(self.len()));
        Ok(scored)
    }

    /* ----------------------------- persistence ----------------------------- */

    /// Serializes the index (with trailing checksum).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(HEADER_LEN + self.data.len() * 4 + self.ids.len() * 16 + 4);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.dim as u32).to_le_bytes());
        buf.extend_from_slice(&(self.ids.len() as u64).to_le_bytes());
        for (row, id) in self.ids.iter().enumerate() {
            buf.extend_from_slice(&(id.len() as u32).to_le_bytes());
            buf.extend_from_slice(id.as_bytes());
            let start = row * self.dim;
            for x in &self.data[start..start + self.dim] {
                buf.extend_from_slice(&x.to_le_bytes());
            }
        }
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parses bytes produced by [`FlatIndex::to_bytes`].
    ///
    /// # Errors
    /// `Corrupt` for bad magic, version, checksum, truncation, invalid UTF-8
    /// or a row that [`FlatIndex::add`] would refuse (NaN included).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN + 4 {
            return Err(IndexError::Corrupt("file too short".into()));
        }
        let (body, tail) = bytes.split_at(bytes.len() - 4);
        let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        if crc32fast::hash(body) != stored {
            return Err(IndexError::Corrupt("checksum mismatch".into()));
        }

        let mut r = Reader { buf: body, pos: 0 };
        if r.take(4)? != MAGIC {
            return Err(IndexError::Corrupt("bad magic".into()));
        }
        let version = r.u32()?;
        if version != VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported version {version}"
            )));
        }
        let dim = r.u32()? as usize;
        let rows = usize::try_from(r.u64()?)
            .map_err(|_| IndexError::Corrupt("row count overflow".into()))?;

        let mut index = FlatIndex::new(dim);
        let mut vector = Vec::with_capacity(dim);
        for _ in 0..rows {
            let id_len = r.u32()? as usize;
            let id = std::str::from_utf8(r.take(id_len)?)
                .map_err(|e| IndexError::Corrupt(format!("id is not UTF-8: {e}")))?
                .to_string();
            vector.clear();
            for chunk in r.take(dim * 4)?.chunks_exact(4) {
                vector.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
            index
                .add(id, &vector)
                .map_err(|e| IndexError::Corrupt(e.to_string()))?;
        }
        if r.pos != body.len() {
            return Err(IndexError::Corrupt("trailing bytes after last row".into()));
        }
        Ok(index)
    }

    /// Writes to a temporary sibling, then renames into place.
    pub fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        write_atomic(path, &self.to_bytes())?;
        debug!(path = ?path, rows = self.len(), dim = self.dim, "index written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, IndexError> {
        Self::from_bytes(&fs::read(path)?)
    }
}

fn all_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], IndexError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| IndexError::Corrupt(format!("truncated at byte {}", self.pos)))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, IndexError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, IndexError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }
}

/// Writes `bytes` to `<path>.tmp` and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_sibling(path);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIndex {
        let mut idx = FlatIndex::new(2);
        idx.add("a", &[1.0, 0.0]).unwrap();
        idx.add("b", &[0.0, 1.0]).unwrap();
        idx.add("c", &[1.0, 0.0]).unwrap();
        idx
    }

    #[test]
    fn search_orders_by_score_then_row() {
        let idx = sample();
        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 2, 1]);
        assert_eq!(hits[0].1, 1.0);
    }

    #[test]
    fn k_is_clamped_and_empty_index_returns_nothing() {
        let idx = sample();
        assert_eq!(idx.search(&[0.0, 1.0], 50).unwrap().len(), 3);
        assert!(FlatIndex::new(2).search(&[1.0, 0.0], 5).unwrap().is_empty());
        assert!(matches!(
            idx.search(&[1.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_ids_and_wrong_dims_are_rejected() {
        let mut idx = sample();
        assert!(idx.add("a", &[0.5, 0.5]).is_err());
        assert!(idx.add("d", &[0.5]).is_err());
        assert_eq!(idx.row_of("c"), Some(2));
    }

    #[test]
    fn non_finite_rows_and_queries_are_rejected() {
        let mut idx = sample();
        assert!(matches!(
            idx.add("nan", &[f32::NAN, 1.0]),
            Err(IndexError::NonFinite(_))
        ));
        assert!(matches!(
            idx.add("inf", &[0.0, f32::INFINITY]),
            Err(IndexError::NonFinite(_))
        ));
        assert_eq!(idx.len(), 3);
        assert!(idx.row_of("nan").is_none());
        assert!(matches!(
            idx.search(&[f32::NAN, 0.0], 2),
            Err(IndexError::NonFinite(_))
        ));
    }

    #[test]
    fn artifact_with_nan_row_is_corrupt() {
        // Hand-built payload with a valid checksum so only the NaN is wrong.
        let mut body = Vec::new();
        body.extend_from_slice(MAGIC);
        body.extend_from_slice(&VERSION.to_le_bytes());
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&1u64.to_le_bytes());
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(b"a");
        body.extend_from_slice(&f32::NAN.to_le_bytes());
        body.extend_from_slice(&1.0f32.to_le_bytes());
        let crc = crc32fast::hash(&body);
        body.extend_from_slice(&crc.to_le_bytes());

        assert!(matches!(
            FlatIndex::from_bytes(&body),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn file_round_trip_and_corruption_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/products.index");
        let idx = sample();
        idx.write_to(&path).unwrap();
        assert!(!dir.path().join("nested/products.index.tmp").exists());
        assert_eq!(FlatIndex::read_from(&path).unwrap(), idx);

        let mut bytes = fs::read(&path).unwrap();
        bytes[HEADER_LEN + 5] ^= 0xFF;
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(IndexError::Corrupt(_))
        ));
        assert!(matches!(
            FlatIndex::from_bytes(&bytes[..10]),
            Err(IndexError::Corrupt(_))
        ));
    }
}
