mod datum;
mod ellipsoid;
mod projection;
mod transform;

pub use datum::{Datum, DatumShift};
pub use ellipsoid::Ellipsoid;
pub use projection::{Geographic, Mercator, Projection};
pub use transform::{Transform, build_transform};

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, bail};

/// An immutable coordinate reference system descriptor: datum, axis order,
/// unit scale, prime meridian and the projection pair bound to it. Cheap to
/// clone and reused across any number of transforms.
#[derive(Clone)]
pub struct Crs {
    /// Projection identifier; `"longlat"` marks a geographic system.
    pub name: String,
    pub datum_code: String,
    pub datum: Datum,
    pub axis: String,
    pub to_meter: f64,
    /// Prime meridian offset from Greenwich, radians.
    pub from_greenwich: f64,
    projection: Arc<dyn Projection>,
}

impl Crs {
    pub fn geographic(datum_code: &str, datum: Datum) -> Crs {
        Crs {
            name: "longlat".to_string(),
            datum_code: datum_code.to_string(),
            datum,
            axis: "enu".to_string(),
            to_meter: 1.0,
            from_greenwich: 0.0,
            projection: Arc::new(Geographic),
        }
    }

    pub fn projected(
        name: &str,
        datum_code: &str,
        datum: Datum,
        projection: Arc<dyn Projection>,
    ) -> Crs {
        Crs {
            name: name.to_string(),
            datum_code: datum_code.to_string(),
            datum,
            axis: "enu".to_string(),
            to_meter: 1.0,
            from_greenwich: 0.0,
            projection,
        }
    }

    pub fn with_axis(mut self, axis: &str) -> Crs {
        self.axis = axis.to_string();
        self
    }

    pub fn with_to_meter(mut self, to_meter: f64) -> Crs {
        self.to_meter = to_meter;
        self
    }

    pub fn with_prime_meridian(mut self, radians: f64) -> Crs {
        self.from_greenwich = radians;
        self
    }

    pub fn is_geographic(&self) -> bool {
        self.name == "longlat"
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    /// Resolves a named coordinate reference system.
    pub fn named(code: &str) -> Result<Crs> {
        match code {
            "WGS84" | "EPSG:4326" => Ok(Crs::geographic("WGS84", Datum::wgs84())),
            "EPSG:3857" | "EPSG:900913" => Ok(Crs::projected(
                "merc",
                "WGS84",
                Datum::wgs84(),
                Arc::new(Mercator::spherical(6378137.0)),
            )),
            "ED50" | "EPSG:4230" => Ok(Crs::geographic(
                "ED50",
                Datum {
                    ellipsoid: Ellipsoid::international(),
                    shift: DatumShift::ThreeParam([-87.0, -98.0, -121.0]),
                },
            )),
            "OSGB36" | "EPSG:4277" => Ok(Crs::geographic(
                "OSGB36",
                Datum {
                    ellipsoid: Ellipsoid::airy(),
                    shift: DatumShift::seven_param(
                        446.448, -125.157, 542.06, 0.1502, 0.247, 0.8421, -20.4894,
                    ),
                },
            )),
            "NAD83" | "EPSG:4269" => Ok(Crs::geographic(
                "NAD83",
                Datum {
                    ellipsoid: Ellipsoid::grs80(),
                    shift: DatumShift::ThreeParam([0.0, 0.0, 0.0]),
                },
            )),
            _ => bail!("unrecognized coordinate reference system {code:?}"),
        }
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crs")
            .field("name", &self.name)
            .field("datum_code", &self.datum_code)
            .field("axis", &self.axis)
            .field("to_meter", &self.to_meter)
            .finish_non_exhaustive()
    }
}
