//! MNIST IDX reader with an optional HTTP download into a local cache.
//!
//! The four IDX files are looked up in the cache directory either plain
//! (`train-images-idx3-ubyte`) or gzip-compressed (`…-ubyte.gz`). Training and
//! test files are concatenated; the split point is the number of training
//! images (60 000 for the official corpus).
//!
//! MNIST digits are already size-normalized and centered on a 28×28 canvas
//! with bright ink, so they are used as [`NormalizedSample`]s directly.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use tracing::info;

use crate::data::DatasetSource;
use crate::domain::{Dataset, Digit, LabeledSample, NormalizedSample, SIDE};
use crate::error::AppError;

pub const DEFAULT_MNIST_URL: &str = "https://ossci-datasets.s3.amazonaws.com/mnist";

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// MNIST corpus stored under `data_dir`.
#[derive(Debug, Clone)]
pub struct MnistSource {
    pub data_dir: PathBuf,
    /// Fetch missing files from `base_url` instead of failing.
    pub download: bool,
    pub base_url: String,
}

impl MnistSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            download: false,
            base_url: DEFAULT_MNIST_URL.to_string(),
        }
    }

    /// Path of an IDX file in the cache, downloading it when allowed.
    fn locate(&self, name: &str) -> Result<PathBuf, AppError> {
        let plain = self.data_dir.join(name);
        if plain.is_file() {
            return Ok(plain);
        }
        let gz = self.data_dir.join(format!("{name}.gz"));
        if gz.is_file() {
            return Ok(gz);
        }
        if !self.download {
            return Err(AppError::training_data(format!(
                "MNIST file '{name}' not found in '{}' (pass --download to fetch it).",
                self.data_dir.display()
            )));
        }
        self.fetch(name, &gz)?;
        Ok(gz)
    }

    fn fetch(&self, name: &str, dest: &Path) -> Result<(), AppError> {
        let url = format!("{}/{name}.gz", self.base_url.trim_end_matches('/'));
        info!(%url, "downloading MNIST file");

        let resp = Client::new()
            .get(&url)
            .send()
            .map_err(|e| AppError::training_data(format!("MNIST download failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::training_data(format!(
                "MNIST download of '{url}' failed with status {}.",
                resp.status()
            )));
        }
        let body = resp
            .bytes()
            .map_err(|e| AppError::training_data(format!("Failed to read MNIST download: {e}")))?;

        fs::create_dir_all(&self.data_dir).map_err(|e| {
            AppError::io(format!(
                "Failed to create data directory '{}': {e}",
                self.data_dir.display()
            ))
        })?;
        let mut file = File::create(dest)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dest.display())))?;
        file.write_all(&body)
            .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", dest.display())))?;
        Ok(())
    }

    fn load_pair(&self, images: &str, labels: &str) -> Result<Vec<LabeledSample>, AppError> {
        let images = parse_idx_images(&read_idx_file(&self.locate(images)?)?)?;
        let labels = parse_idx_labels(&read_idx_file(&self.locate(labels)?)?)?;
        if images.len() != labels.len() {
            return Err(AppError::training_data(format!(
                "MNIST image/label count mismatch: {} images, {} labels.",
                images.len(),
                labels.len()
            )));
        }
        Ok(images
            .into_iter()
            .zip(labels)
            .map(|(sample, label)| LabeledSample { sample, label })
            .collect())
    }
}

impl DatasetSource for MnistSource {
    fn name(&self) -> &str {
        "mnist"
    }

    fn load_dataset(&self) -> Result<Dataset, AppError> {
        let mut samples = self.load_pair(TRAIN_IMAGES, TRAIN_LABELS)?;
        let split_point = samples.len();
        samples.extend(self.load_pair(TEST_IMAGES, TEST_LABELS)?);
        info!(
            train = split_point,
            test = samples.len() - split_point,
            dir = %self.data_dir.display(),
            "loaded MNIST"
        );
        Ok(Dataset {
            samples,
            split_point,
        })
    }
}

/// Read an IDX file, transparently gunzipping it.
pub fn read_idx_file(path: &Path) -> Result<Vec<u8>, AppError> {
    let raw = fs::read(path)
        .map_err(|e| AppError::training_data(format!("Failed to read '{}': {e}", path.display())))?;
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }
    let mut out = Vec::new();
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| AppError::training_data(format!("Failed to decompress '{}': {e}", path.display())))?;
    Ok(out)
}

/// Parse an IDX3 image file of 28×28 unsigned bytes.
pub fn parse_idx_images(bytes: &[u8]) -> Result<Vec<NormalizedSample>, AppError> {
    let mut header = Header::new(bytes);
    header.expect_magic(IMAGES_MAGIC, "image")?;
    let count = header.next_u32()? as usize;
    let rows = header.next_u32()? as usize;
    let cols = header.next_u32()? as usize;
    if rows != SIDE || cols != SIDE {
        return Err(AppError::training_data(format!(
            "IDX images are {rows}x{cols}, expected {SIDE}x{SIDE}."
        )));
    }

    let body = header.rest();
    let size = rows * cols;
    if body.len() != count * size {
        return Err(AppError::training_data(format!(
            "IDX image file truncated: {} bytes for {count} images.",
            body.len()
        )));
    }
    body.chunks_exact(size)
        .map(|chunk| NormalizedSample::from_vec(chunk.to_vec()))
        .collect()
}

/// Parse an IDX1 label file.
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<Digit>, AppError> {
    let mut header = Header::new(bytes);
    header.expect_magic(LABELS_MAGIC, "label")?;
    let count = header.next_u32()? as usize;
    let body = header.rest();
    if body.len() != count {
        return Err(AppError::training_data(format!(
            "IDX label file truncated: {} bytes for {count} labels.",
            body.len()
        )));
    }
    body.iter().map(|&v| Digit::new(v)).collect()
}

/// Big-endian header cursor.
struct Header<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Header<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next_u32(&mut self) -> Result<u32, AppError> {
        let end = self.pos + 4;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| AppError::training_data("IDX header truncated."))?;
        self.pos = end;
        Ok(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn expect_magic(&mut self, magic: u32, what: &str) -> Result<(), AppError> {
        let found = self.next_u32()?;
        if found != magic {
            return Err(AppError::training_data(format!(
                "Not an IDX {what} file (magic {found:#010x}, expected {magic:#010x})."
            )));
        }
        Ok(())
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn idx_images(images: &[[u8; 784]]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in [IMAGES_MAGIC, images.len() as u32, 28, 28] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        for img in images {
            out.extend_from_slice(img);
        }
        out
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        out.extend_from_slice(labels);
        out
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn parses_images_and_labels() {
        let mut a = [0u8; 784];
        a[0] = 9;
        let b = [200u8; 784];
        let images = parse_idx_images(&idx_images(&[a, b])).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].get(0, 0), 9);
        assert_eq!(images[1].get(27, 27), 200);

        let labels = parse_idx_labels(&idx_labels(&[3, 7])).unwrap();
        assert_eq!(labels.iter().map(|d| d.value()).collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn rejects_bad_magic_truncation_and_labels() {
        assert!(parse_idx_images(&idx_labels(&[1])).is_err());
        let mut truncated = idx_images(&[[0u8; 784]]);
        truncated.pop();
        assert!(parse_idx_images(&truncated).is_err());
        assert!(parse_idx_labels(&idx_labels(&[10])).is_err());
        assert!(parse_idx_labels(&[0, 0]).is_err());
    }

    #[test]
    fn loads_gzipped_cache_and_concatenates_splits() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, bytes: Vec<u8>| fs::write(dir.path().join(name), bytes).unwrap();
        write("train-images-idx3-ubyte.gz", gzip(&idx_images(&[[1; 784], [2; 784], [3; 784]])));
        write("train-labels-idx1-ubyte.gz", gzip(&idx_labels(&[1, 2, 3])));
        write("t10k-images-idx3-ubyte", idx_images(&[[4; 784]]));
        write("t10k-labels-idx1-ubyte", idx_labels(&[4]));

        let ds = MnistSource::new(dir.path()).load_dataset().unwrap();
        assert_eq!(ds.samples.len(), 4);
        assert_eq!(ds.split_point, 3);
        assert_eq!(ds.samples[3].label.value(), 4);
        assert_eq!(ds.samples[1].sample.get(5, 5), 2);
    }

    #[test]
    fn missing_files_without_download_fail() {
        let dir = tempfile::tempdir().unwrap();
        let err = MnistSource::new(dir.path()).load_dataset().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TrainingData);
    }
}
