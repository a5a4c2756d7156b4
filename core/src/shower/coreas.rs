//! Reader for CoREAS simulation directories.
//!
//! A run is identified by its `SIMxxxxxx.reas` steering file. Antenna
//! positions come from `SIMxxxxxx_coreas.bins`, `SIMxxxxxx.list` or
//! `SIMxxxxxx.info`, in that order, and traces from `SIMxxxxxx_coreas/*.dat`.
//! CoREAS works in CGS units with the x axis north, y west and z up.

use crate::antenna::ElectricField;
use crate::coordinates::{LocalFrame, LtpPoint, LtpVector};
use crate::prelude::{GrandError, GrandResult};
use crate::shower::{ShowerEvent, ShowerGeometry};
use crate::telemetry::LogManager;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// statV/cm to µV/m.
const CGS_TO_UV_PER_M: f64 = 29979245800.0;
const CM: f64 = 1e-2;
const EV_TO_GEV: f64 = 1e-9;
const GAUSS_TO_NT: f64 = 1e5;
const S_TO_NS: f64 = 1e9;

lazy_static! {
    static ref REAS_NAME: Regex = Regex::new(r"^SIM(\d+)\.reas$").unwrap();
    static ref REAS_ENTRY: Regex =
        Regex::new(r"([^=# \n\t]+)[ \t]*=[ \t]*([^ ;\t\n]*)[ \t]*;").unwrap();
    static ref TRACE_NAME: Regex = Regex::new(r"(\d+)\.dat$").unwrap();
    static ref TRAILING_DIGITS: Regex = Regex::new(r"(\d+)$").unwrap();
    static ref INFO_ANTENNA: Regex =
        Regex::new(r"ANTENNA[ \t]+([^ \t\n]+)[ \t]+([^ \t\n]+)[ \t]+([^ \t\n]+)[ \t]+([^ \t\n]+)")
            .unwrap();
}

pub fn is_coreas_dir(path: &Path) -> bool {
    reas_files(path).map(|files| !files.is_empty()).unwrap_or(false)
}

pub fn load(path: &Path, frame: Arc<LocalFrame>) -> GrandResult<ShowerEvent> {
    let logger = LogManager::new("coreas");
    let reas_files = reas_files(path)?;
    let (index, reas_path) = reas_files.first().cloned().ok_or_else(|| {
        GrandError::MissingData(format!("no .reas file in {}", path.display()))
    })?;
    if reas_files.len() > 1 {
        logger.caution(&format!(
            "multiple shower simulations in {}, loading only SIM{:06}",
            path.display(),
            index
        ));
    }

    let reas = parse_reas(&read(&reas_path)?);
    let value = |key: &str| -> GrandResult<f64> {
        reas.get(key).copied().ok_or_else(|| {
            GrandError::MissingData(format!("{} missing from {}", key, reas_path.display()))
        })
    };

    let zenith = 180.0 - value("ShowerZenithAngle")?;
    let azimuth = value("ShowerAzimuthAngle")?;
    let core = [
        value("CoreCoordinateNorth")? * CM,
        value("CoreCoordinateWest")? * CM,
        value("CoreCoordinateVertical")? * CM,
    ];

    let (sin_i, cos_i) = value("MagneticFieldInclinationAngle")?.to_radians().sin_cos();
    let strength = value("MagneticFieldStrength")? * GAUSS_TO_NT;
    let geomagnet = [strength * cos_i, 0.0, -strength * sin_i];

    let distance = value("DistanceOfShowerMaximum")? * CM;
    let (sin_t, cos_t) = zenith.to_radians().sin_cos();
    let (sin_p, cos_p) = azimuth.to_radians().sin_cos();
    let axis = [sin_t * cos_p, sin_t * sin_p, cos_t];
    let maximum = [
        core[0] - distance * axis[0],
        core[1] - distance * axis[1],
        core[2] - distance * axis[2],
    ];

    let geometry = ShowerGeometry {
        energy: value("PrimaryParticleEnergy")? * EV_TO_GEV,
        zenith,
        azimuth,
        primary: value("PrimaryParticleType")? as i64,
        core: LtpPoint::from_array(core, frame.clone()),
        geomagnet: LtpVector::from_array(geomagnet, frame.clone()),
        maximum: LtpPoint::from_array(maximum, frame.clone()),
    };

    let positions = antenna_positions(path, index)?;
    let fields = load_traces(path, index, &positions, &frame, &logger)?;
    logger.record(&format!(
        "loaded SIM{:06} with {} antennas from {}",
        index,
        fields.len(),
        path.display()
    ));

    Ok(ShowerEvent {
        frame,
        geometry,
        fields,
    })
}

/// Sorted `(index, path)` of the steering files in `path`.
fn reas_files(path: &Path) -> GrandResult<Vec<(usize, PathBuf)>> {
    let entries = fs::read_dir(path).map_err(|err| {
        GrandError::MissingData(format!("shower directory {}: {}", path.display(), err))
    })?;
    let mut files: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = REAS_NAME.captures(&name)?.get(1)?.as_str().parse().ok()?;
            Some((index, entry.path()))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn read(path: &Path) -> GrandResult<String> {
    fs::read_to_string(path)
        .map_err(|err| GrandError::MissingData(format!("{}: {}", path.display(), err)))
}

/// `key = value ;` pairs of a steering file. Non-numeric values are dropped.
fn parse_reas(text: &str) -> HashMap<String, f64> {
    REAS_ENTRY
        .captures_iter(text)
        .filter_map(|caps| {
            let value = caps[2].parse::<f64>().ok()?;
            Some((caps[1].to_string(), value))
        })
        .collect()
}

fn antenna_positions(path: &Path, index: usize) -> GrandResult<HashMap<usize, [f64; 3]>> {
    let bins = path.join(format!("SIM{:06}_coreas.bins", index));
    if bins.exists() {
        return parse_positions(&read(&bins)?, &bins, |fields| {
            let antenna = TRACE_NAME.captures(fields.first()?)?[1].parse().ok()?;
            Some((antenna, cm_position(fields.get(1..4)?)?))
        });
    }

    let list = path.join(format!("SIM{:06}.list", index));
    if list.exists() {
        return parse_positions(&read(&list)?, &list, |fields| {
            let antenna = TRAILING_DIGITS.captures(fields.get(5)?)?[1].parse().ok()?;
            Some((antenna, cm_position(fields.get(2..5)?)?))
        });
    }

    let info = path.join(format!("SIM{:06}.info", index));
    if info.exists() {
        let text = read(&info)?;
        let mut positions = HashMap::new();
        for caps in INFO_ANTENNA.captures_iter(&text) {
            let malformed = || {
                GrandError::Configuration(format!(
                    "malformed antenna entry '{}' in {}",
                    &caps[0],
                    info.display()
                ))
            };
            let antenna: usize = caps[1].parse().map_err(|_| malformed())?;
            let mut position = [0.0; 3];
            for (slot, value) in position.iter_mut().zip(2..5) {
                *slot = caps[value].parse().map_err(|_| malformed())?;
            }
            positions.insert(antenna, position);
        }
        return Ok(positions);
    }

    Ok(HashMap::new())
}

fn parse_positions<F>(text: &str, path: &Path, parse: F) -> GrandResult<HashMap<usize, [f64; 3]>>
where
    F: Fn(&[&str]) -> Option<(usize, [f64; 3])>,
{
    let mut positions = HashMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let (antenna, position) = parse(&fields).ok_or_else(|| {
            GrandError::Configuration(format!(
                "malformed antenna line '{}' in {}",
                line.trim(),
                path.display()
            ))
        })?;
        positions.insert(antenna, position);
    }
    Ok(positions)
}

fn cm_position(values: &[&str]) -> Option<[f64; 3]> {
    let mut position = [0.0; 3];
    for (slot, value) in position.iter_mut().zip(values) {
        *slot = value.parse::<f64>().ok()? * CM;
    }
    Some(position)
}

fn load_traces(
    path: &Path,
    index: usize,
    positions: &HashMap<usize, [f64; 3]>,
    frame: &Arc<LocalFrame>,
    logger: &LogManager,
) -> GrandResult<BTreeMap<usize, ElectricField>> {
    let mut fields = BTreeMap::new();
    let traces = path.join(format!("SIM{:06}_coreas", index));
    if !traces.is_dir() {
        logger.caution(&format!("no traces directory {}", traces.display()));
        return Ok(fields);
    }

    let entries = fs::read_dir(&traces).map_err(|err| {
        GrandError::MissingData(format!("{}: {}", traces.display(), err))
    })?;
    for entry in entries.filter_map(|entry| entry.ok()) {
        let trace_path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let antenna: usize = match TRACE_NAME
            .captures(&name)
            .and_then(|caps| caps[1].parse().ok())
        {
            Some(antenna) => antenna,
            None => continue,
        };
        logger.detail(&format!("loading trace for antenna {}", antenna));

        let position = positions.get(&antenna).ok_or_else(|| {
            GrandError::MissingData(format!("no position for antenna {}", antenna))
        })?;
        let (times, samples) = parse_trace(&read(&trace_path)?, &trace_path)?;
        let field = ElectricField::new(
            times,
            samples,
            LtpPoint::from_array(*position, frame.clone()),
        )?;
        fields.insert(antenna, field);
    }
    Ok(fields)
}

/// Columns `t Ex Ey Ez` in seconds and statV/cm.
fn parse_trace(text: &str, path: &Path) -> GrandResult<(Vec<f64>, Vec<[f64; 3]>)> {
    let mut times = Vec::new();
    let mut samples = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let values: Option<Vec<f64>> = trimmed
            .split_whitespace()
            .take(4)
            .map(|value| value.parse().ok())
            .collect();
        match values {
            Some(values) if values.len() == 4 => {
                times.push(values[0] * S_TO_NS);
                samples.push([
                    values[1] * CGS_TO_UV_PER_M,
                    values[2] * CGS_TO_UV_PER_M,
                    values[3] * CGS_TO_UV_PER_M,
                ]);
            }
            _ => {
                return Err(GrandError::Configuration(format!(
                    "malformed trace line '{}' in {}",
                    trimmed,
                    path.display()
                )))
            }
        }
    }
    Ok((times, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::{GeodeticPosition, Orientation};
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    const REAS: &str = "\
# CoREAS V1.4
CoreCoordinateNorth = 100.0 ; [cm]
CoreCoordinateWest = -200.0 ; [cm]
CoreCoordinateVertical = 0 ; [cm]
ShowerZenithAngle = 30 ; [deg]
ShowerAzimuthAngle = 0 ; [deg]
PrimaryParticleEnergy = 1e+17 ; [eV]
PrimaryParticleType = 14 ; [CORSIKA id]
DistanceOfShowerMaximum = 500000 ; [cm]
MagneticFieldStrength = 0.5 ; [Gauss]
MagneticFieldInclinationAngle = 60 ; [deg]
";

    fn frame() -> Arc<LocalFrame> {
        let site = GeodeticPosition::ellipsoid(42.9, 86.7, 1200.0);
        Arc::new(LocalFrame::new(site, Orientation::NWU, None).unwrap())
    }

    fn write(dir: &TempDir, name: &str, contents: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn trace() -> String {
        (0..8)
            .map(|i| format!("{:e} {:e} 0 0\n", i as f64 * 1e-10, i as f64 * 1e-9))
            .collect()
    }

    fn simulation() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "SIM000007.reas", REAS);
        write(
            &dir,
            "SIM000007.list",
            "AntennaPosition = 1000 0 0 ant_3\nAntennaPosition = 0 2000 150 ant_12\n",
        );
        write(&dir, "SIM000007_coreas/raw_3.dat", &trace());
        write(&dir, "SIM000007_coreas/raw_12.dat", &trace());
        dir
    }

    #[test]
    fn loads_geometry_in_shower_frame() {
        let dir = simulation();
        let event = ShowerEvent::load(dir.path(), frame()).unwrap();
        let geometry = &event.geometry;
        assert_abs_diff_eq!(geometry.energy, 1e8, epsilon = 1e-3);
        assert_abs_diff_eq!(geometry.zenith, 150.0);
        assert_eq!(geometry.primary, 14);
        assert_eq!(geometry.core.to_array(), [1.0, -2.0, 0.0]);
        assert_abs_diff_eq!(geometry.geomagnet.x, 25000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(geometry.geomagnet.z, -50000.0 * 60f64.to_radians().sin(), epsilon = 1e-6);
        // The maximum sits 5 km up the axis, above the core.
        assert_abs_diff_eq!(geometry.maximum.z, 5000.0 * 30f64.to_radians().cos(), epsilon = 1e-6);
        assert_abs_diff_eq!(geometry.maximum.x, 1.0 - 2500.0, epsilon = 1e-6);
    }

    #[test]
    fn loads_traces_with_positions() {
        let dir = simulation();
        let event = ShowerEvent::load(dir.path(), frame()).unwrap();
        assert_eq!(event.fields.keys().copied().collect::<Vec<_>>(), vec![3, 12]);

        let field = &event.fields[&12];
        assert_eq!(field.position.to_array(), [0.0, 20.0, 1.5]);
        assert_eq!(field.len(), 8);
        assert_abs_diff_eq!(field.sample_spacing().unwrap(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(field.field[2][0], 2e-9 * CGS_TO_UV_PER_M, epsilon = 1e-9);
    }

    #[test]
    fn bins_file_takes_precedence() {
        let dir = simulation();
        write(
            &dir,
            "SIM000007_coreas.bins",
            "raw_3.dat 500 500 0 0\nraw_12.dat 0 0 0 0\n",
        );
        let event = ShowerEvent::load(dir.path(), frame()).unwrap();
        assert_eq!(event.fields[&3].position.to_array(), [5.0, 5.0, 0.0]);
    }

    #[test]
    fn info_file_is_the_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "SIM000001.reas", REAS);
        write(&dir, "SIM000001.info", "ANTENNA 4 10.0 -5.0 2.0\n");
        write(&dir, "SIM000001_coreas/raw_4.dat", &trace());
        let event = ShowerEvent::load(dir.path(), frame()).unwrap();
        assert_eq!(event.fields[&4].position.to_array(), [10.0, -5.0, 2.0]);
    }

    #[test]
    fn first_run_is_used_when_several_exist() {
        let dir = simulation();
        write(&dir, "SIM000009.reas", REAS);
        let event = ShowerEvent::load(dir.path(), frame()).unwrap();
        assert_eq!(event.fields.len(), 2);
    }

    #[test]
    fn missing_position_or_key_is_reported() {
        let dir = simulation();
        write(&dir, "SIM000007_coreas/raw_99.dat", &trace());
        assert!(matches!(
            ShowerEvent::load(dir.path(), frame()),
            Err(GrandError::MissingData(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        write(&dir, "SIM000002.reas", "ShowerZenithAngle = 10 ;\n");
        assert!(matches!(
            ShowerEvent::load(dir.path(), frame()),
            Err(GrandError::MissingData(_))
        ));
    }

    #[test]
    fn steering_file_parsing() {
        let entries = parse_reas(REAS);
        assert_eq!(entries["CoreCoordinateWest"], -200.0);
        assert_eq!(entries["PrimaryParticleEnergy"], 1e17);
        assert!(!entries.contains_key("CoREAS"));
    }
}
