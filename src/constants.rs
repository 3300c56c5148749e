//! Application constants for the SWAT weather builder
//!
//! File naming, coordinate names, category keywords and processing defaults
//! shared by the library and the CLI.

// =============================================================================
// Output Naming
// =============================================================================

/// Header row of the station registry file
pub const REGISTRY_COLUMNS: [&str; 4] = ["ID", "station_names", "Lat", "Lon"];

/// Suffix appended to the uppercased label to form the registry file name
pub const REGISTRY_FILE_SUFFIX: &str = "_station.csv";

/// Extension of per-station record files
pub const RECORD_FILE_EXTENSION: &str = "csv";

/// Compact date format written on the first line of every record file
pub const RECORD_DATE_FORMAT: &str = "%Y%m%d";

/// Per-dataset output directory: `File_{index}_{stem}`
pub const DATASET_DIR_PREFIX: &str = "File_";

// =============================================================================
// Input Discovery
// =============================================================================

/// Glob pattern for gridded inputs inside an input directory
pub const GRIDDED_FILE_PATTERN: &str = "*.nc";

/// File-name keywords that mark a rainfall dataset
pub const RAINFALL_KEYWORDS: &[&str] = &["rain", "precip", "pcp", "rf"];

/// File-name keywords that mark a temperature dataset
pub const TEMPERATURE_KEYWORDS: &[&str] = &["temp", "tmax", "tmin"];

// =============================================================================
// Coordinate Variables
// =============================================================================

pub const LATITUDE_NAMES: &[&str] = &["lat", "latitude"];
pub const LONGITUDE_NAMES: &[&str] = &["lon", "longitude"];
pub const TIME_NAMES: &[&str] = &["time"];

/// Calendars whose dates map directly onto the proleptic Gregorian calendar
pub const SUPPORTED_CALENDARS: &[&str] = &["standard", "gregorian", "proleptic_gregorian"];

// =============================================================================
// Processing Defaults
// =============================================================================

/// Bounding box buffer, in grid cells, added on every side of the boundary
pub const DEFAULT_BUFFER_CELLS: f64 = 2.0;

/// Smallest buffer that keeps every cell overlapping the boundary box
pub const MIN_BUFFER_CELLS: f64 = 0.5;

/// Read chunk sizes along (time, lat, lon)
pub const DEFAULT_CHUNK_TIME: usize = 365;
pub const DEFAULT_CHUNK_LAT: usize = 50;
pub const DEFAULT_CHUNK_LON: usize = 50;

/// Datasets processed at the same time by the batch orchestrator
pub const DEFAULT_MAX_CONCURRENT_DATASETS: usize = 1;

/// Warn when the cropped window would use more than this share of system memory
pub const WINDOW_MEMORY_WARN_FRACTION: f64 = 0.5;
