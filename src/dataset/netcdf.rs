//! NetCDF-backed gridded source.
//!
//! Reads coordinate vectors eagerly (they are small) and data windows lazily in
//! (time, lat, lon) blocks, as `f64` whatever the stored type. CF packing
//! (`scale_factor`, `add_offset`) is applied and `_FillValue` /
//! `missing_value` cells are masked to NaN.

use super::packing::CfPacking;
use super::time::CfTimeUnits;
use super::{GriddedSource, IndexWindow, VariableList};
use crate::config::ChunkShape;
use crate::constants::{LATITUDE_NAMES, LONGITUDE_NAMES, TIME_NAMES};
use crate::error::{ExtractError, Result};
use chrono::NaiveDateTime;
use ndarray::{Array3, Ix3, s};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A NetCDF file opened for windowed reads
pub struct NetCdfSource {
    path: PathBuf,
    file: netcdf::File,
    chunk: ChunkShape,
}

impl NetCdfSource {
    pub fn open(path: &Path, chunk: ChunkShape) -> Result<Self> {
        let file = netcdf::open(path)
            .map_err(|e| ExtractError::unreadable(path, format!("cannot open: {}", e)))?;
        debug!("Opened NetCDF file {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file,
            chunk,
        })
    }

    fn coordinate(&self, names: &[&str]) -> Result<Vec<f64>> {
        for name in names {
            if let Some(var) = self.file.variable(name) {
                let values: Vec<f64> = var.get_values(..)?;
                return Ok(values);
            }
        }
        Err(ExtractError::unreadable(
            &self.path,
            format!("missing coordinate variable {}", names.join(" or ")),
        ))
    }

    fn check_layout(&self, var: &netcdf::Variable<'_>) -> Result<()> {
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let matches = dims.len() == 3
            && TIME_NAMES.contains(&dims[0].as_str())
            && LATITUDE_NAMES.contains(&dims[1].as_str())
            && LONGITUDE_NAMES.contains(&dims[2].as_str());

        if !matches {
            return Err(ExtractError::unreadable(
                &self.path,
                format!(
                    "variable '{}' has dimensions {:?}, expected (time, lat, lon)",
                    var.name(),
                    dims
                ),
            ));
        }
        Ok(())
    }
}

fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Double(v) => Some(v),
        netcdf::AttributeValue::Float(v) => Some(v as f64),
        netcdf::AttributeValue::Int(v) => Some(v as f64),
        netcdf::AttributeValue::Short(v) => Some(v as f64),
        netcdf::AttributeValue::Longlong(v) => Some(v as f64),
        _ => None,
    }
}

fn string_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

impl GriddedSource for NetCdfSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn variables(&self) -> Result<VariableList> {
        let dimension_names: HashSet<String> = self.file.dimensions().map(|d| d.name()).collect();
        let names = self
            .file
            .variables()
            .map(|v| v.name())
            .filter(|name| !dimension_names.contains(name))
            .collect();
        Ok(VariableList::new(names))
    }

    fn latitudes(&self) -> Result<Vec<f64>> {
        self.coordinate(LATITUDE_NAMES)
    }

    fn longitudes(&self) -> Result<Vec<f64>> {
        self.coordinate(LONGITUDE_NAMES)
    }

    fn times(&self) -> Result<Vec<NaiveDateTime>> {
        let var = TIME_NAMES
            .iter()
            .find_map(|name| self.file.variable(name))
            .ok_or_else(|| ExtractError::unreadable(&self.path, "missing time coordinate"))?;

        let units = string_attribute(&var, "units")
            .ok_or_else(|| ExtractError::unreadable(&self.path, "time coordinate has no units"))?;
        let calendar = string_attribute(&var, "calendar");
        let units = CfTimeUnits::parse(&units, calendar.as_deref())?;

        let raw: Vec<f64> = var.get_values(..)?;
        units.decode_axis(&raw)
    }

    fn read_window(&self, variable: &str, window: &IndexWindow) -> Result<Array3<f64>> {
        let var = self.file.variable(variable).ok_or_else(|| {
            ExtractError::unreadable(&self.path, format!("no variable named '{}'", variable))
        })?;
        self.check_layout(&var)?;

        let mut values = Array3::<f64>::zeros(window.shape());
        for block in window.chunks(self.chunk) {
            let chunk = var
                .get::<f64, _>((block.time.clone(), block.lat.clone(), block.lon.clone()))?
                .into_dimensionality::<Ix3>()
                .map_err(|e| ExtractError::unreadable(&self.path, e.to_string()))?;

            let target = block.relative_to(window);
            values
                .slice_mut(s![target.time, target.lat, target.lon])
                .assign(&chunk);
            debug!(
                "Read block {:?} x {:?} x {:?} of '{}'",
                block.time, block.lat, block.lon, variable
            );
        }

        let packing = CfPacking::new(
            numeric_attribute(&var, "_FillValue"),
            numeric_attribute(&var, "missing_value"),
            numeric_attribute(&var, "scale_factor"),
            numeric_attribute(&var, "add_offset"),
        );
        packing.unpack(&mut values);

        Ok(values)
    }
}
