//! Local persistence for captured images.
//!
//! Each capture lives in its own directory under the storage root:
//!
//! ```text
//! <root>/<uuid>/
//!   capture.json    # CaptureRecord sidecar
//!   image.iiq       # Raw passthrough
//!   image.tiff      # Encoded outputs, when configured
//! ```
//!
//! A capture is written into `<root>/.partial-<uuid>/` and renamed into
//! place once its sidecar is on disk, so a capture directory always has one.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::warn;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::model::{CaptureRecord, ImageFile, ImageFormat};

const SIDECAR: &str = "capture.json";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("capture not found: {0}")]
    CaptureNotFound(Uuid),

    #[error("capture already exists: {0}")]
    CaptureAlreadyExists(Uuid),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Local file-based storage for captures.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a capture's images and its sidecar.
    ///
    /// `record.files` is replaced by what was actually written.
    pub fn save_capture(
        &self,
        record: CaptureRecord,
        images: &[(ImageFormat, Vec<u8>)],
    ) -> Result<CaptureRecord> {
        let dir = self.capture_dir(record.id);
        if dir.exists() {
            return Err(StorageError::CaptureAlreadyExists(record.id));
        }

        // Left over from an interrupted save of the same id.
        let staging = self.root.join(format!(".partial-{}", record.id));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let written = write_capture(&staging, record, images).and_then(|record| {
            fs::rename(&staging, &dir)?;
            Ok(record)
        });
        if written.is_err()
            && let Err(e) = fs::remove_dir_all(&staging)
        {
            warn!("could not remove {}: {e}", staging.display());
        }
        written
    }

    /// Loads a single capture's sidecar.
    pub fn load_capture(&self, id: Uuid) -> Result<CaptureRecord> {
        let path = self.capture_dir(id).join(SIDECAR);
        if !path.exists() {
            return Err(StorageError::CaptureNotFound(id));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Lists all captures, oldest first.
    ///
    /// A sidecar that cannot be read or parsed is logged and skipped.
    pub fn list_captures(&self) -> Result<Vec<CaptureRecord>> {
        let mut captures = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(captures),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path().join(SIDECAR);
            if !path.is_file() {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(StorageError::from)
                .and_then(|json| Ok(serde_json::from_str::<CaptureRecord>(&json)?));
            match parsed {
                Ok(record) => captures.push(record),
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }
        captures.sort_by(|a: &CaptureRecord, b: &CaptureRecord| {
            a.captured_at.cmp(&b.captured_at)
        });
        Ok(captures)
    }

    pub fn capture_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }
}

/// Writes the images, then the sidecar describing them, into `dir`.
fn write_capture(
    dir: &Path,
    mut record: CaptureRecord,
    images: &[(ImageFormat, Vec<u8>)],
) -> Result<CaptureRecord> {
    record.files = images
        .iter()
        .map(|(format, bytes)| -> Result<ImageFile> {
            let file_name = format!("image.{}", format.extension());
            fs::write(dir.join(&file_name), bytes)?;
            Ok(ImageFile {
                format: *format,
                file_name,
                size_bytes: bytes.len() as u64,
                sha256: hex::encode(Sha256::digest(bytes)),
            })
        })
        .collect::<Result<_>>()?;

    let json = serde_json::to_string_pretty(&record)?;
    fs::write(dir.join(SIDECAR), json)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use tempfile::TempDir;

    use crate::model::{PositionState, ProfileName};

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("captures")).unwrap();
        (dir, storage)
    }

    fn sample_record() -> CaptureRecord {
        CaptureRecord {
            id: Uuid::new_v4(),
            captured_at: Timestamp::now(),
            position: PositionState {
                theta: 300,
                phi: -1000,
                h: 0,
                focus: 2,
            },
            profile: ProfileName::Serial,
            files: Vec::new(),
        }
    }

    #[test]
    fn save_and_load_capture() {
        let (_dir, storage) = test_storage();
        let record = sample_record();

        let saved = storage
            .save_capture(record.clone(), &[(ImageFormat::Iiq, b"raw".to_vec())])
            .unwrap();
        let loaded = storage.load_capture(record.id).unwrap();

        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.position, record.position);
        assert_eq!(loaded.files, saved.files);
        assert_eq!(
            fs::read(storage.capture_dir(record.id).join("image.iiq")).unwrap(),
            b"raw"
        );
    }

    #[test]
    fn sidecar_records_size_and_checksum() {
        let (_dir, storage) = test_storage();
        let saved = storage
            .save_capture(
                sample_record(),
                &[
                    (ImageFormat::Iiq, b"abc".to_vec()),
                    (ImageFormat::Tiff, b"tiff!".to_vec()),
                ],
            )
            .unwrap();

        assert_eq!(saved.files.len(), 2);
        assert_eq!(saved.files[0].size_bytes, 3);
        assert_eq!(
            saved.files[0].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(saved.files[1].file_name, "image.tiff");
    }

    #[test]
    fn duplicate_capture_fails() {
        let (_dir, storage) = test_storage();
        let record = sample_record();

        storage.save_capture(record.clone(), &[]).unwrap();
        let err = storage.save_capture(record, &[]).unwrap_err();

        assert!(matches!(err, StorageError::CaptureAlreadyExists(_)));
    }

    #[test]
    fn load_nonexistent_capture_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.load_capture(Uuid::new_v4()).unwrap_err();

        assert!(matches!(err, StorageError::CaptureNotFound(_)));
    }

    #[test]
    fn list_captures_empty() {
        let (_dir, storage) = test_storage();
        assert!(storage.list_captures().unwrap().is_empty());
    }

    #[test]
    fn list_captures_sorted_by_captured_at() {
        let (_dir, storage) = test_storage();

        let mut first = sample_record();
        first.captured_at = Timestamp::new(1_000_000_000, 0).unwrap();
        let mut second = sample_record();
        second.captured_at = Timestamp::new(2_000_000_000, 0).unwrap();

        // Save in reverse order to verify sorting.
        storage.save_capture(second.clone(), &[]).unwrap();
        storage.save_capture(first.clone(), &[]).unwrap();

        let captures = storage.list_captures().unwrap();
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].id, first.id);
        assert_eq!(captures[1].id, second.id);
    }

    #[test]
    fn stray_directories_are_ignored() {
        let (_dir, storage) = test_storage();
        fs::create_dir_all(storage.root().join("not-a-capture")).unwrap();
        assert!(storage.list_captures().unwrap().is_empty());
    }

    #[test]
    fn corrupt_sidecar_is_skipped_in_listing() {
        let (_dir, storage) = test_storage();
        let good = sample_record();
        storage.save_capture(good.clone(), &[]).unwrap();

        let broken = storage.root().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(SIDECAR), "{ not json").unwrap();

        let captures = storage.list_captures().unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].id, good.id);
    }

    #[test]
    fn interrupted_save_does_not_block_the_same_id() {
        let (_dir, storage) = test_storage();
        let record = sample_record();
        let leftover = storage.root().join(format!(".partial-{}", record.id));
        fs::create_dir_all(&leftover).unwrap();
        fs::write(leftover.join("image.iiq"), b"half").unwrap();
        fs::write(leftover.join(SIDECAR), serde_json::to_string(&record).unwrap()).unwrap();

        assert!(storage.list_captures().unwrap().is_empty());
        storage
            .save_capture(record.clone(), &[(ImageFormat::Iiq, b"raw".to_vec())])
            .unwrap();

        assert!(!leftover.exists());
        let mut names: Vec<String> = fs::read_dir(storage.capture_dir(record.id))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["capture.json", "image.iiq"]);
        assert_eq!(storage.list_captures().unwrap().len(), 1);
    }

    #[test]
    fn failed_save_leaves_no_capture_directory() {
        let (_dir, storage) = test_storage();
        let record = sample_record();
        // A plain file where the staging directory goes.
        let blocker = storage.root().join(format!(".partial-{}", record.id));
        fs::write(&blocker, b"").unwrap();

        let result = storage.save_capture(record.clone(), &[(ImageFormat::Iiq, b"raw".to_vec())]);

        assert!(result.is_err());
        assert!(!storage.capture_dir(record.id).exists());
        assert!(storage.list_captures().unwrap().is_empty());
    }
}
