use std::f64::consts::FRAC_PI_2;

use anyhow::{Result, bail};

use crate::ellipsoid::Ellipsoid;

const SEC_TO_RAD: f64 = 4.848136811095359935899141e-6;

/// How a datum relates to the WGS84 reference frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DatumShift {
    /// No shift information; datum conversion is skipped.
    None,
    /// The reference frame itself.
    Wgs84,
    /// Geocentric translation in meters.
    ThreeParam([f64; 3]),
    /// Translation, rotation and scale: meters, radians, plain factor.
    SevenParam([f64; 7]),
    /// Shift defined by a named correction grid.
    Grid(String),
}

impl DatumShift {
    /// Builds a seven-parameter shift from the conventional towgs84 form:
    /// translations in meters, rotations in arc-seconds, scale in ppm.
    pub fn seven_param(
        dx: f64,
        dy: f64,
        dz: f64,
        rx: f64,
        ry: f64,
        rz: f64,
        scale_ppm: f64,
    ) -> DatumShift {
        DatumShift::SevenParam([
            dx,
            dy,
            dz,
            rx * SEC_TO_RAD,
            ry * SEC_TO_RAD,
            rz * SEC_TO_RAD,
            1.0 + scale_ppm * 1e-6,
        ])
    }

    pub fn is_parametric(&self) -> bool {
        matches!(self, DatumShift::ThreeParam(_) | DatumShift::SevenParam(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub ellipsoid: Ellipsoid,
    pub shift: DatumShift,
}

impl Datum {
    pub fn wgs84() -> Datum {
        Datum {
            ellipsoid: Ellipsoid::wgs84(),
            shift: DatumShift::Wgs84,
        }
    }
}

/// Moves a geographic point (radians, meters of elevation) from one datum to
/// another through geocentric coordinates, shifting to and from the WGS84
/// frame as the shift parameters require.
pub(crate) fn datum_transform(
    src: &Datum,
    dst: &Datum,
    lon: f64,
    lat: f64,
    z: f64,
) -> Result<(f64, f64, f64)> {
    if src == dst {
        return Ok((lon, lat, z));
    }
    if src.shift == DatumShift::None || dst.shift == DatumShift::None {
        return Ok((lon, lat, z));
    }
    if let DatumShift::Grid(grid) = &src.shift {
        bail!("source datum needs shift grid {grid:?}, which is not available");
    }
    if let DatumShift::Grid(grid) = &dst.shift {
        bail!("destination datum needs shift grid {grid:?}, which is not available");
    }

    let (x, y, z) = geodetic_to_geocentric(lon, lat, z, &src.ellipsoid)?;
    let (x, y, z) = shift_to_wgs84(x, y, z, &src.shift);
    let (x, y, z) = shift_from_wgs84(x, y, z, &dst.shift);
    geocentric_to_geodetic(x, y, z, &dst.ellipsoid)
}

fn geodetic_to_geocentric(
    lon: f64,
    lat: f64,
    height: f64,
    e: &Ellipsoid,
) -> Result<(f64, f64, f64)> {
    if lat.abs() > FRAC_PI_2 + 1e-10 {
        bail!("latitude {lat} rad is outside [-pi/2, pi/2]");
    }
    let lat = lat.clamp(-FRAC_PI_2, FRAC_PI_2);
    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let rn = e.a / (1.0 - e.es * sin_lat * sin_lat).sqrt();
    Ok((
        (rn + height) * cos_lat * lon.cos(),
        (rn + height) * cos_lat * lon.sin(),
        (rn * (1.0 - e.es) + height) * sin_lat,
    ))
}

fn geocentric_to_geodetic(x: f64, y: f64, z: f64, e: &Ellipsoid) -> Result<(f64, f64, f64)> {
    let p = x.hypot(y);
    if p < 1e-12 {
        let lat = if z >= 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
        return Ok((0.0, lat, z.abs() - e.b));
    }

    let lon = y.atan2(x);
    let mut lat = (z / (p * (1.0 - e.es))).atan();
    let mut height = 0.0;
    for _ in 0..30 {
        let sin_lat = lat.sin();
        let rn = e.a / (1.0 - e.es * sin_lat * sin_lat).sqrt();
        height = p / lat.cos() - rn;
        let next = (z / (p * (1.0 - e.es * rn / (rn + height)))).atan();
        let done = (next - lat).abs() < 1e-12;
        lat = next;
        if done {
            break;
        }
    }
    Ok((lon, lat, height))
}

fn shift_to_wgs84(x: f64, y: f64, z: f64, shift: &DatumShift) -> (f64, f64, f64) {
    match shift {
        DatumShift::ThreeParam([dx, dy, dz]) => (x + dx, y + dy, z + dz),
        DatumShift::SevenParam([dx, dy, dz, rx, ry, rz, m]) => (
            m * (x - rz * y + ry * z) + dx,
            m * (rz * x + y - rx * z) + dy,
            m * (-ry * x + rx * y + z) + dz,
        ),
        _ => (x, y, z),
    }
}

fn shift_from_wgs84(x: f64, y: f64, z: f64, shift: &DatumShift) -> (f64, f64, f64) {
    match shift {
        DatumShift::ThreeParam([dx, dy, dz]) => (x - dx, y - dy, z - dz),
        DatumShift::SevenParam([dx, dy, dz, rx, ry, rz, m]) => {
            let x = (x - dx) / m;
            let y = (y - dy) / m;
            let z = (z - dz) / m;
            (
                x + rz * y - ry * z,
                -rz * x + y + rx * z,
                ry * x - rx * y + z,
            )
        }
        _ => (x, y, z),
    }
}
