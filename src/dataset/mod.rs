//! Gridded dataset access.
//!
//! The extraction pipeline reads gridded data through [`GriddedSource`], a
//! lazily readable (time, lat, lon) array with retrievable coordinate vectors.
//! [`MemoryGrid`] keeps everything in memory; [`NetCdfSource`] (cargo feature
//! `netcdf`) reads windows from a NetCDF file on demand.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod packing;
pub mod time;

pub use memory::MemoryGrid;
#[cfg(feature = "netcdf")]
pub use self::netcdf::NetCdfSource;

use crate::config::ChunkShape;
use crate::error::{ExtractError, Result};
use chrono::NaiveDateTime;
use ndarray::Array3;
use std::ops::Range;
use std::path::Path;

/// Data variables of a dataset, in declaration order.
///
/// Only the first variable is ever extracted. Multi-variable files silently
/// ignore everything after it; there is no name-based preference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableList {
    names: Vec<String>,
}

impl VariableList {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The variable that will be extracted
    pub fn primary(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// Variables present in the dataset but not extracted
    pub fn ignored(&self) -> &[String] {
        self.names.get(1..).unwrap_or(&[])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Half-open index ranges along (time, lat, lon)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWindow {
    pub time: Range<usize>,
    pub lat: Range<usize>,
    pub lon: Range<usize>,
}

impl IndexWindow {
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.time.len(), self.lat.len(), self.lon.len())
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty() || self.lat.is_empty() || self.lon.is_empty()
    }

    /// Number of grid cells in the spatial part of the window
    pub fn cell_count(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    /// Size of the window in bytes for `f64` values
    pub fn byte_size(&self) -> usize {
        let (t, y, x) = self.shape();
        t * y * x * std::mem::size_of::<f64>()
    }

    /// Split the window into blocks of at most `chunk` along each axis.
    ///
    /// Blocks are ordered time-major and together cover the window exactly;
    /// the last block on an axis may be shorter than the chunk size.
    pub fn chunks(&self, chunk: ChunkShape) -> Vec<IndexWindow> {
        let mut blocks = Vec::new();
        for time in split_range(&self.time, chunk.time) {
            for lat in split_range(&self.lat, chunk.lat) {
                for lon in split_range(&self.lon, chunk.lon) {
                    blocks.push(IndexWindow {
                        time: time.clone(),
                        lat: lat.clone(),
                        lon: lon.clone(),
                    });
                }
            }
        }
        blocks
    }

    /// Position of this block inside `outer`, for writing into an array of
    /// `outer`'s shape
    pub fn relative_to(&self, outer: &IndexWindow) -> IndexWindow {
        let shift = |r: &Range<usize>, origin: usize| {
            r.start.saturating_sub(origin)..r.end.saturating_sub(origin)
        };
        IndexWindow {
            time: shift(&self.time, outer.time.start),
            lat: shift(&self.lat, outer.lat.start),
            lon: shift(&self.lon, outer.lon.start),
        }
    }
}

fn split_range(range: &Range<usize>, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    range
        .clone()
        .step_by(size)
        .map(|start| start..(start + size).min(range.end))
        .collect()
}

/// A lazily readable 3-axis (time, lat, lon) array
pub trait GriddedSource {
    /// Human-readable name for logs
    fn name(&self) -> String;

    /// Data variables in declaration order
    fn variables(&self) -> Result<VariableList>;

    fn latitudes(&self) -> Result<Vec<f64>>;

    fn longitudes(&self) -> Result<Vec<f64>>;

    /// Decoded time axis
    fn times(&self) -> Result<Vec<NaiveDateTime>>;

    /// Read a window of `variable`; only the window is materialised
    fn read_window(&self, variable: &str, window: &IndexWindow) -> Result<Array3<f64>>;
}

/// Open a gridded dataset file
pub fn open(path: &Path, chunk: ChunkShape) -> Result<Box<dyn GriddedSource>> {
    if !path.exists() {
        return Err(ExtractError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }

    open_netcdf(path, chunk)
}

#[cfg(feature = "netcdf")]
fn open_netcdf(path: &Path, chunk: ChunkShape) -> Result<Box<dyn GriddedSource>> {
    Ok(Box::new(NetCdfSource::open(path, chunk)?))
}

#[cfg(not(feature = "netcdf"))]
fn open_netcdf(path: &Path, _chunk: ChunkShape) -> Result<Box<dyn GriddedSource>> {
    Err(ExtractError::unreadable(
        path,
        "built without NetCDF support; rebuild with `--features netcdf`",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_list_first_pick() {
        let vars = VariableList::new(vec!["pr".into(), "tas".into(), "time_bnds".into()]);
        assert_eq!(vars.primary(), Some("pr"));
        assert_eq!(vars.ignored(), &["tas".to_string(), "time_bnds".to_string()]);

        let empty = VariableList::default();
        assert_eq!(empty.primary(), None);
        assert!(empty.ignored().is_empty());
    }

    #[test]
    fn test_index_window_shape() {
        let window = IndexWindow {
            time: 2..5,
            lat: 0..4,
            lon: 1..3,
        };
        assert_eq!(window.shape(), (3, 4, 2));
        assert_eq!(window.cell_count(), 8);
        assert_eq!(window.byte_size(), 3 * 4 * 2 * 4);
        assert!(!window.is_empty());

        let empty = IndexWindow {
            time: 3..3,
            lat: 0..4,
            lon: 0..4,
        };
        assert!(empty.is_empty());
    }

    #[test]
    fn test_chunks_cover_window_with_partial_tail() {
        let window = IndexWindow {
            time: 3..13,
            lat: 0..5,
            lon: 2..4,
        };
        let blocks = window.chunks(ChunkShape {
            time: 4,
            lat: 2,
            lon: 50,
        });

        // time 3..7, 7..11, 11..13 x lat 0..2, 2..4, 4..5 x lon 2..4
        assert_eq!(blocks.len(), 9);
        assert_eq!(blocks[0].time, 3..7);
        assert_eq!(blocks[2].lat, 4..5);
        assert_eq!(blocks[8].time, 11..13);
        assert!(blocks.iter().all(|b| b.lon == (2..4)));

        let covered: usize = blocks.iter().map(|b| b.shape().0 * b.shape().1 * b.shape().2).sum();
        assert_eq!(covered, 10 * 5 * 2);
    }

    #[test]
    fn test_chunks_of_empty_window() {
        let window = IndexWindow {
            time: 4..4,
            lat: 0..3,
            lon: 0..3,
        };
        assert!(window.chunks(ChunkShape::default()).is_empty());
    }

    #[test]
    fn test_relative_to() {
        let outer = IndexWindow {
            time: 10..20,
            lat: 5..9,
            lon: 0..3,
        };
        let block = IndexWindow {
            time: 14..18,
            lat: 7..9,
            lon: 0..3,
        };
        assert_eq!(
            block.relative_to(&outer),
            IndexWindow {
                time: 4..8,
                lat: 2..4,
                lon: 0..3,
            }
        );
    }

    #[test]
    fn test_open_missing_file() {
        let result = open(Path::new("/nonexistent/file.nc"), ChunkShape::default());
        assert!(matches!(
            result.err(),
            Some(ExtractError::DatasetNotFound { .. })
        ));
    }
}
