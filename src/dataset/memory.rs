//! In-memory gridded source backed by `ndarray`.

use super::{GriddedSource, IndexWindow, VariableList};
use crate::error::{ExtractError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{Array3, s};

/// Gridded dataset held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryGrid {
    label: String,
    times: Vec<NaiveDateTime>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    variables: Vec<(String, Array3<f64>)>,
}

impl MemoryGrid {
    /// Create an empty grid with the given axes
    pub fn new(
        label: impl Into<String>,
        times: Vec<NaiveDateTime>,
        lats: Vec<f64>,
        lons: Vec<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            times,
            lats,
            lons,
            variables: Vec::new(),
        }
    }

    /// Create an empty grid with one timestep per day starting at `start`
    pub fn daily(
        label: impl Into<String>,
        start: NaiveDate,
        days: usize,
        lats: Vec<f64>,
        lons: Vec<f64>,
    ) -> Self {
        let times = start
            .iter_days()
            .take(days)
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
            .collect();
        Self::new(label, times, lats, lons)
    }

    /// Append a data variable; its shape must match (time, lat, lon)
    pub fn with_variable(mut self, name: impl Into<String>, values: Array3<f64>) -> Result<Self> {
        let name = name.into();
        let expected = (self.times.len(), self.lats.len(), self.lons.len());
        if values.dim() != expected {
            return Err(ExtractError::unreadable(
                &self.label,
                format!(
                    "variable '{}' has shape {:?}, expected {:?}",
                    name,
                    values.dim(),
                    expected
                ),
            ));
        }
        self.variables.push((name, values));
        Ok(self)
    }
}

impl GriddedSource for MemoryGrid {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn variables(&self) -> Result<VariableList> {
        Ok(VariableList::new(
            self.variables.iter().map(|(name, _)| name.clone()).collect(),
        ))
    }

    fn latitudes(&self) -> Result<Vec<f64>> {
        Ok(self.lats.clone())
    }

    fn longitudes(&self) -> Result<Vec<f64>> {
        Ok(self.lons.clone())
    }

    fn times(&self) -> Result<Vec<NaiveDateTime>> {
        Ok(self.times.clone())
    }

    fn read_window(&self, variable: &str, window: &IndexWindow) -> Result<Array3<f64>> {
        let (_, values) = self
            .variables
            .iter()
            .find(|(name, _)| name == variable)
            .ok_or_else(|| {
                ExtractError::unreadable(&self.label, format!("no variable named '{}'", variable))
            })?;

        let (t, y, x) = values.dim();
        if window.time.end > t || window.lat.end > y || window.lon.end > x {
            return Err(ExtractError::unreadable(
                &self.label,
                format!("window {:?} exceeds array shape {:?}", window, (t, y, x)),
            ));
        }

        Ok(values
            .slice(s![
                window.time.clone(),
                window.lat.clone(),
                window.lon.clone()
            ])
            .to_owned())
    }
}
