//! Per-antenna voltage computation over a whole shower.

use crate::antenna::{Antenna, TabulatedAntennaModel, Voltage};
use crate::coordinates::{LocalFrame, LtpPoint, Orientation};
use crate::geomagnet::GeomagneticField;
use crate::prelude::{GrandError, GrandResult};
use crate::shower::ShowerEvent;
use crate::telemetry::{LogManager, Metrics, MetricsRecorder};
use rayon::prelude::*;
use std::sync::Arc;

/// Outcome of a batch: one result per antenna, keyed by antenna index.
#[derive(Debug)]
pub struct BatchReport {
    pub voltages: Vec<(usize, GrandResult<Voltage>)>,
    pub metrics: Metrics,
}

impl BatchReport {
    pub fn successes(&self) -> impl Iterator<Item = (usize, &Voltage)> {
        self.voltages
            .iter()
            .filter_map(|(index, result)| result.as_ref().ok().map(|voltage| (*index, voltage)))
    }
}

/// Computes the voltage of every antenna of a shower in parallel.
///
/// Each antenna gets its own ENU frame at its realized location, aligned on
/// magnetic north when a geomagnetic field is configured. A failing antenna
/// only affects its own entry in the report.
pub struct BatchProcessor {
    model: Arc<TabulatedAntennaModel>,
    geomagnet: Option<Arc<dyn GeomagneticField>>,
    logger: LogManager,
}

impl BatchProcessor {
    pub fn new(
        model: Arc<TabulatedAntennaModel>,
        geomagnet: Option<Arc<dyn GeomagneticField>>,
    ) -> Self {
        Self {
            model,
            geomagnet,
            logger: LogManager::new("batch"),
        }
    }

    /// Antenna frame at `position`, with the shower frame's observation time.
    pub fn antenna_frame(
        &self,
        event: &ShowerEvent,
        position: &LtpPoint,
    ) -> GrandResult<Arc<LocalFrame>> {
        let location = event.realize_frame(position)?;
        let obstime = event.frame.obstime();
        let frame = match &self.geomagnet {
            Some(field) => LocalFrame::magnetic(location, Orientation::ENU, obstime, field.as_ref())?,
            None => LocalFrame::new(location, Orientation::ENU, obstime)?,
        };
        Ok(Arc::new(frame))
    }

    pub fn process_antenna(&self, event: &ShowerEvent, index: usize) -> GrandResult<Voltage> {
        let field = event.fields.get(&index).ok_or_else(|| {
            GrandError::MissingData(format!("no field for antenna {}", index))
        })?;
        let frame = self.antenna_frame(event, &field.position)?;
        let antenna = Antenna::new(self.model.clone(), frame)?;
        let direction = event.arrival_direction(&field.position);
        antenna.compute_voltage(direction.to_array(), field, &event.frame)
    }

    pub fn run(&self, event: &ShowerEvent) -> BatchReport {
        let metrics = MetricsRecorder::new();
        let indices: Vec<usize> = event.fields.keys().copied().collect();
        self.logger
            .detail(&format!("computing voltages for {} antennas", indices.len()));

        let voltages: Vec<(usize, GrandResult<Voltage>)> = indices
            .par_iter()
            .map(|&index| {
                let result = self.process_antenna(event, index);
                match &result {
                    Ok(_) => metrics.record_processed(),
                    Err(err) => {
                        metrics.record_error();
                        self.logger
                            .caution(&format!("antenna {} skipped: {}", index, err));
                    }
                }
                (index, result)
            })
            .collect();

        let metrics = metrics.snapshot();
        self.logger.record(&format!(
            "batch complete: {} processed, {} failed",
            metrics.processed, metrics.errors
        ));
        BatchReport { voltages, metrics }
    }
}
