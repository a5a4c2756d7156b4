use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use chrono::NaiveDate;
use grandcore::coordinates::{GeodeticPosition, LocalFrame, Orientation};
use grandcore::geomagnet::{GeomagneticField, MagneticModel, UniformField};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Array site, geodetic degrees and metres above the ellipsoid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub site: SiteConfig,
    #[serde(default)]
    pub obstime: Option<NaiveDate>,
    /// Simulation directory. A synthetic shower is generated when absent.
    #[serde(default)]
    pub shower: Option<PathBuf>,
    /// JSON effective length table. The synthetic dipole is used when absent.
    #[serde(default)]
    pub antenna_model: Option<PathBuf>,
    /// WMM coefficient file.
    #[serde(default)]
    pub geomagnet: Option<PathBuf>,
    /// Fixed magnetic declination in degrees, used without a coefficient file.
    #[serde(default)]
    pub declination: Option<f64>,
    pub output: PathBuf,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_args(
        site: SiteConfig,
        obstime: Option<NaiveDate>,
        shower: Option<PathBuf>,
        antenna_model: Option<PathBuf>,
        geomagnet: Option<PathBuf>,
        declination: Option<f64>,
        output: PathBuf,
        seed: u64,
    ) -> Self {
        Self {
            site,
            obstime,
            shower,
            antenna_model,
            geomagnet,
            declination,
            output,
            generator: GeneratorConfig {
                seed,
                ..Default::default()
            },
        }
    }

    pub fn site_position(&self) -> GeodeticPosition {
        GeodeticPosition::ellipsoid(self.site.latitude, self.site.longitude, self.site.height)
    }

    /// Geographic NWU frame at the site, in which shower quantities are
    /// expressed.
    pub fn shower_frame(&self) -> anyhow::Result<Arc<LocalFrame>> {
        let frame = LocalFrame::new(self.site_position(), Orientation::NWU, self.obstime)
            .context("building shower frame at the configured site")?;
        Ok(Arc::new(frame))
    }

    /// Field used to align antenna frames on magnetic north, if any.
    pub fn geomagnetic_field(&self) -> anyhow::Result<Option<Arc<dyn GeomagneticField>>> {
        if let Some(path) = &self.geomagnet {
            let model = MagneticModel::load(path)
                .with_context(|| format!("loading geomagnetic model {}", path.display()))?;
            return Ok(Some(Arc::new(model)));
        }
        Ok(self
            .declination
            .map(|declination| Arc::new(UniformField::from_declination(declination)) as Arc<dyn GeomagneticField>))
    }
}
