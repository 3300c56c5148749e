//! Gridded dataset discovery.
//!
//! Finds the `.nc` files to process, either a single file or every NetCDF
//! file directly inside a directory, numbered from 1 in file-name order.

use crate::constants::{DATASET_DIR_PREFIX, GRIDDED_FILE_PATTERN};
use crate::error::{ExtractError, Result};
use crate::models::DataCategory;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One discovered dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetFile {
    /// 1-based position in the sorted batch
    pub index: usize,
    pub name: String,
    pub path: PathBuf,
    pub size_mb: f64,
    pub category: DataCategory,
}

impl DatasetFile {
    pub fn new(index: usize, path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let size_mb = fs::metadata(&path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);
        let category = DataCategory::from_file_name(&name, index);

        Self {
            index,
            name,
            path,
            size_mb,
            category,
        }
    }

    /// File name without the `.nc` extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Per-dataset output directory: `<base>/File_<index>_<stem>`
    pub fn output_dir(&self, base: &Path) -> PathBuf {
        base.join(format!("{}{}_{}", DATASET_DIR_PREFIX, self.index, self.stem()))
    }
}

/// Discovers NetCDF datasets under an input path
#[derive(Debug)]
pub struct DatasetDiscovery {
    input: PathBuf,
}

impl DatasetDiscovery {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// List datasets in file-name order; a file input yields exactly one
    pub fn discover(&self) -> Result<Vec<DatasetFile>> {
        if !self.input.exists() {
            return Err(ExtractError::DatasetNotFound {
                path: self.input.clone(),
            });
        }

        if self.input.is_file() {
            return Ok(vec![DatasetFile::new(1, self.input.clone())]);
        }

        let directory = Pattern::escape(&self.input.to_string_lossy());
        let pattern = Path::new(&directory).join(GRIDDED_FILE_PATTERN);
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };

        debug!("Searching for datasets matching {}", pattern.display());
        let entries = glob::glob_with(&pattern.to_string_lossy(), options).map_err(|e| {
            ExtractError::configuration(format!("invalid dataset pattern: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let files: Vec<DatasetFile> = paths
            .into_iter()
            .enumerate()
            .map(|(k, path)| DatasetFile::new(k + 1, path))
            .collect();

        debug!("Found {} datasets in {}", files.len(), self.input.display());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_listing_is_sorted_and_numbered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["tmax_2001.nc", "Rainfall_IMD.NC", "notes.txt", "other.nc"] {
            fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(temp_dir.path().join("nested.nc")).unwrap();

        let files = DatasetDiscovery::new(temp_dir.path()).discover().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Rainfall_IMD.NC", "other.nc", "tmax_2001.nc"]);

        assert_eq!(files[0].index, 1);
        assert_eq!(files[0].category, DataCategory::Rainfall);
        assert_eq!(files[1].category, DataCategory::Other(2));
        assert_eq!(files[2].category, DataCategory::Temperature);
    }

    #[test]
    fn test_single_file_input() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("precip.nc");
        fs::write(&path, vec![0u8; 2048]).unwrap();

        let files = DatasetDiscovery::new(&path).discover().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].index, 1);
        assert!(files[0].size_mb > 0.0);
    }

    #[test]
    fn test_output_dir_naming() {
        let file = DatasetFile {
            index: 3,
            name: "tmin_1990.nc".to_string(),
            path: PathBuf::from("/data/tmin_1990.nc"),
            size_mb: 0.0,
            category: DataCategory::Temperature,
        };
        assert_eq!(
            file.output_dir(Path::new("/out")),
            PathBuf::from("/out/File_3_tmin_1990")
        );
    }

    #[test]
    fn test_missing_input() {
        let err = DatasetDiscovery::new("/nonexistent/input").discover().unwrap_err();
        assert!(matches!(err, ExtractError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files = DatasetDiscovery::new(temp_dir.path()).discover().unwrap();
        assert!(files.is_empty());
    }
}
