use crate::coordinates::ecef::EcefPosition;
use crate::coordinates::geodetic::GeodeticPosition;
use crate::geomagnet::GeomagneticField;
use crate::math::matrix::{add, scale, MatrixHelper};
use crate::prelude::{GrandError, GrandResult};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView2};
use std::fmt;
use std::str::FromStr;

/// Cardinal or vertical direction a local axis points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    West,
    North,
    South,
    Up,
    Down,
}

impl Direction {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'E' => Some(Direction::East),
            'W' => Some(Direction::West),
            'N' => Some(Direction::North),
            'S' => Some(Direction::South),
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Direction::East => 'E',
            Direction::West => 'W',
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::Up => 'U',
            Direction::Down => 'D',
        }
    }

    /// Index into (East, North, Up) and the sign along it.
    fn axis(self) -> (usize, f64) {
        match self {
            Direction::East => (0, 1.0),
            Direction::West => (0, -1.0),
            Direction::North => (1, 1.0),
            Direction::South => (1, -1.0),
            Direction::Up => (2, 1.0),
            Direction::Down => (2, -1.0),
        }
    }
}

/// Signed permutation of (East, North, Up) naming the local x, y and z axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation {
    axes: [Direction; 3],
}

impl Orientation {
    pub const ENU: Orientation = Orientation {
        axes: [Direction::East, Direction::North, Direction::Up],
    };
    pub const NED: Orientation = Orientation {
        axes: [Direction::North, Direction::East, Direction::Down],
    };
    pub const NWU: Orientation = Orientation {
        axes: [Direction::North, Direction::West, Direction::Up],
    };

    pub fn axes(&self) -> [Direction; 3] {
        self.axes
    }
}

impl FromStr for Orientation {
    type Err = GrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GrandError::Configuration(format!("invalid frame orientation '{}'", s));

        let letters: Vec<char> = s.trim().to_ascii_uppercase().chars().collect();
        if letters.len() != 3 {
            return Err(invalid());
        }

        let mut axes = [Direction::East; 3];
        let mut seen = [false; 3];
        for (slot, &letter) in letters.iter().enumerate() {
            let direction = Direction::from_letter(letter).ok_or_else(invalid)?;
            let (index, _) = direction.axis();
            if seen[index] {
                return Err(invalid());
            }
            seen[index] = true;
            axes[slot] = direction;
        }

        Ok(Orientation { axes })
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: String = self.axes.iter().map(|d| d.letter()).collect();
        write!(f, "{}", name)
    }
}

/// Local tangent plane frame anchored at a geodetic location.
///
/// The basis columns are the local x, y and z axes in ECEF. It is computed
/// once here and never changes afterwards.
#[derive(Debug, Clone)]
pub struct LocalFrame {
    origin: GeodeticPosition,
    orientation: Orientation,
    magnetic: bool,
    obstime: Option<NaiveDate>,
    declination: Option<f64>,
    origin_ecef: EcefPosition,
    basis: Array2<f64>,
}

impl LocalFrame {
    /// Frame aligned on geographic north.
    pub fn new(
        origin: GeodeticPosition,
        orientation: Orientation,
        obstime: Option<NaiveDate>,
    ) -> GrandResult<Self> {
        Self::build(origin, orientation, false, obstime, None)
    }

    /// Frame aligned on magnetic north, using the declination of `field` at
    /// `origin` and `obstime`.
    pub fn magnetic(
        origin: GeodeticPosition,
        orientation: Orientation,
        obstime: Option<NaiveDate>,
        field: &dyn GeomagneticField,
    ) -> GrandResult<Self> {
        let date = obstime.ok_or_else(|| {
            GrandError::Configuration(
                "a magnetic frame requires an observation time".to_string(),
            )
        })?;
        let declination = field.declination(&origin, date)?;
        Self::build(origin, orientation, true, obstime, Some(declination))
    }

    /// Magnetic frame with an independently known declination (degrees, east
    /// of true north).
    pub fn with_declination(
        origin: GeodeticPosition,
        orientation: Orientation,
        obstime: Option<NaiveDate>,
        declination: f64,
    ) -> GrandResult<Self> {
        if !declination.is_finite() {
            return Err(GrandError::Configuration(format!(
                "invalid declination {}",
                declination
            )));
        }
        Self::build(origin, orientation, true, obstime, Some(declination))
    }

    fn build(
        origin: GeodeticPosition,
        orientation: Orientation,
        magnetic: bool,
        obstime: Option<NaiveDate>,
        declination: Option<f64>,
    ) -> GrandResult<Self> {
        let origin_ecef = origin.to_ecef()?;

        let (sin_lat, cos_lat) = origin.latitude.to_radians().sin_cos();
        let (sin_lon, cos_lon) = origin.longitude.to_radians().sin_cos();
        let mut east = [-sin_lon, cos_lon, 0.0];
        let mut north = [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat];
        let up = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];

        if let Some(declination) = declination {
            let (sin_d, cos_d) = declination.to_radians().sin_cos();
            let magnetic_north = add(scale(north, cos_d), scale(east, sin_d));
            let magnetic_east = add(scale(east, cos_d), scale(north, -sin_d));
            north = magnetic_north;
            east = magnetic_east;
        }

        let enu = [east, north, up];
        let mut columns = [[0.0; 3]; 3];
        for (column, direction) in columns.iter_mut().zip(orientation.axes.iter()) {
            let (index, sign) = direction.axis();
            *column = scale(enu[index], sign);
        }

        Ok(Self {
            origin,
            orientation,
            magnetic,
            obstime,
            declination,
            origin_ecef,
            basis: MatrixHelper::from_columns(columns),
        })
    }

    pub fn origin(&self) -> &GeodeticPosition {
        &self.origin
    }

    pub fn origin_ecef(&self) -> &EcefPosition {
        &self.origin_ecef
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_magnetic(&self) -> bool {
        self.magnetic
    }

    pub fn obstime(&self) -> Option<NaiveDate> {
        self.obstime
    }

    /// Declination applied to the horizontal axes, in degrees.
    pub fn declination(&self) -> Option<f64> {
        self.declination
    }

    pub fn basis(&self) -> ArrayView2<'_, f64> {
        self.basis.view()
    }
}

impl PartialEq for LocalFrame {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.orientation == other.orientation
            && self.magnetic == other.magnetic
            && self.obstime == other.obstime
            && self.declination == other.declination
    }
}
