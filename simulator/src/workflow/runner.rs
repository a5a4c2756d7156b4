use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use grandcore::antenna::{TabulatedAntennaModel, Voltage};
use grandcore::geomagnet::GeomagneticField;
use grandcore::processing::BatchProcessor;
use grandcore::shower::ShowerEvent;
use grandcore::telemetry::Metrics;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct AntennaOutput {
    pub antenna: usize,
    pub peak: f64,
    pub rms: f64,
    pub voltage: Voltage,
}

#[derive(Debug, Serialize)]
pub struct AntennaFailure {
    pub antenna: usize,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct WorkflowResult {
    pub energy: f64,
    pub zenith: f64,
    pub azimuth: f64,
    pub antennas: Vec<AntennaOutput>,
    pub failures: Vec<AntennaFailure>,
}

impl WorkflowResult {
    pub fn summary(&self) -> String {
        let peak = self
            .antennas
            .iter()
            .map(|output| output.peak)
            .fold(0.0, f64::max);
        format!(
            "energy={:.3e}GeV zenith={:.2} azimuth={:.2} antennas={} failures={} peak={:.3}uV",
            self.energy,
            self.zenith,
            self.azimuth,
            self.antennas.len(),
            self.failures.len(),
            peak
        )
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("serializing voltages")?;
        fs::write(path, contents).with_context(|| format!("writing voltages {}", path.display()))?;
        Ok(())
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            processed: self.antennas.len(),
            errors: self.failures.len(),
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    model: Arc<TabulatedAntennaModel>,
    geomagnet: Option<Arc<dyn GeomagneticField>>,
}

impl Runner {
    pub fn new(
        config: WorkflowConfig,
        model: Arc<TabulatedAntennaModel>,
        geomagnet: Option<Arc<dyn GeomagneticField>>,
    ) -> Self {
        Self {
            config,
            model,
            geomagnet,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn execute(&self, event: &ShowerEvent) -> anyhow::Result<WorkflowResult> {
        if event.fields.is_empty() {
            anyhow::bail!("shower event carries no electric fields");
        }

        let processor = BatchProcessor::new(self.model.clone(), self.geomagnet.clone());
        let report = processor.run(event);

        let mut antennas = Vec::new();
        let mut failures = Vec::new();
        for (antenna, result) in report.voltages {
            match result {
                Ok(voltage) => antennas.push(AntennaOutput {
                    antenna,
                    peak: voltage.peak(),
                    rms: voltage.rms(),
                    voltage,
                }),
                Err(err) => failures.push(AntennaFailure {
                    antenna,
                    reason: err.to_string(),
                }),
            }
        }

        if antennas.is_empty() {
            let reason = failures
                .first()
                .map(|failure| failure.reason.clone())
                .unwrap_or_default();
            anyhow::bail!("all {} antennas failed, first: {}", failures.len(), reason);
        }

        let geometry = &event.geometry;
        Ok(WorkflowResult {
            energy: geometry.energy,
            zenith: geometry.zenith,
            azimuth: geometry.azimuth,
            antennas,
            failures,
        })
    }
}
