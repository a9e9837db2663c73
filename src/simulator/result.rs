use std::io::Write;

use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;

use crate::error::Warnings;
use crate::models::{ModelKind, OutputKind};
use crate::PbtkError;

/// Time course of one simulation: a `time` column followed by the model outputs,
/// one row per output time, already in the requested units
#[derive(Debug, Clone)]
pub struct SimulationResult {
    model: ModelKind,
    columns: Vec<String>,
    kinds: Vec<Option<OutputKind>>,
    units: Vec<String>,
    data: Array2<f64>,
    plasma_column: String,
    warnings: Warnings,
}

/// Summary statistics of the plasma concentration curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TkStats {
    /// Highest plasma concentration
    pub peak: f64,
    /// Time of the peak (h)
    pub tmax: f64,
    /// AUC at the last output time
    pub auc: f64,
    /// Time-averaged plasma concentration
    pub mean: f64,
}

impl SimulationResult {
    pub(crate) fn new(
        model: ModelKind,
        columns: Vec<String>,
        kinds: Vec<Option<OutputKind>>,
        units: Vec<String>,
        data: Array2<f64>,
        plasma_column: &str,
        warnings: Warnings,
    ) -> Self {
        Self {
            model,
            columns,
            kinds,
            units,
            data,
            plasma_column: plasma_column.to_string(),
            warnings,
        }
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Unit of every column, in column order
    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.index(name).map(|i| self.data.index_axis(Axis(1), i))
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        self.index(name).map(|i| self.units[i].as_str())
    }

    pub fn kind(&self, name: &str) -> Option<OutputKind> {
        self.index(name).and_then(|i| self.kinds[i])
    }

    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(1), 0)
    }

    /// The plasma concentration column of this model
    pub fn plasma(&self) -> Option<ArrayView1<'_, f64>> {
        self.column(&self.plasma_column)
    }

    /// Peak, time of peak, final AUC and mean of the plasma concentration
    pub fn tk_stats(&self) -> Result<TkStats, PbtkError> {
        let plasma = self.plasma().ok_or_else(|| {
            PbtkError::missing(self.plasma_column.clone(), "simulation output")
        })?;
        let auc = self
            .column("AUC")
            .ok_or_else(|| PbtkError::missing("AUC", "simulation output"))?;
        let times = self.times();
        let n = times.len();
        if n == 0 {
            return Err(PbtkError::domain("simulation has no output times"));
        }

        let (tmax, peak) = times.iter().zip(plasma.iter()).fold(
            (times[0], f64::NEG_INFINITY),
            |(tmax, peak), (&t, &c)| if c > peak { (t, c) } else { (tmax, peak) },
        );
        let final_auc = auc[n - 1];
        let duration = times[n - 1] - times[0];
        let mean = if duration > 0.0 {
            final_auc / duration
        } else {
            plasma[0]
        };
        Ok(TkStats {
            peak,
            tmax,
            auc: final_auc,
            mean,
        })
    }

    /// Write the table as CSV, with units in the header
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PbtkError> {
        let mut writer = csv::Writer::from_writer(writer);
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&self.units)
            .map(|(name, unit)| format!("{} ({})", name, unit))
            .collect();
        writer
            .write_record(&header)
            .map_err(std::io::Error::from)?;
        for row in self.data.rows() {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(std::io::Error::from)?;
        }
        writer.flush()?;
        Ok(())
    }
}
