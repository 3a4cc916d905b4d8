use std::f64::consts::FRAC_PI_2;

use anyhow::{Result, bail};

/// Forward/inverse projection pair bound to one coordinate reference
/// system. Geographic coordinates are radians, planar coordinates meters.
pub trait Projection: Send + Sync {
    /// Geographic to planar.
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)>;
    /// Planar to geographic.
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)>;
}

/// Passthrough for geographic systems. The transform pipeline recognizes
/// those before projecting, but every descriptor carries a pair.
pub struct Geographic;

impl Projection for Geographic {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        Ok((lon, lat))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok((x, y))
    }
}

const POLE_EPS: f64 = 1e-10;

/// Mercator in its ellipsoidal form; spherical when the eccentricity is
/// zero, which is what the web variant uses.
pub struct Mercator {
    pub a: f64,
    pub e: f64,
    pub k0: f64,
    pub lon0: f64,
}

impl Mercator {
    pub fn spherical(radius: f64) -> Mercator {
        Mercator {
            a: radius,
            e: 0.0,
            k0: 1.0,
            lon0: 0.0,
        }
    }
}

impl Projection for Mercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if lat.abs() >= FRAC_PI_2 - POLE_EPS {
            bail!("mercator is undefined at latitude {lat} rad");
        }
        let x = self.a * self.k0 * (lon - self.lon0);
        let y = -self.a * self.k0 * tsfn(self.e, lat).ln();
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let ts = (-y / (self.a * self.k0)).exp();
        let lat = phi2(self.e, ts)?;
        let lon = self.lon0 + x / (self.a * self.k0);
        Ok((lon, lat))
    }
}

fn tsfn(e: f64, phi: f64) -> f64 {
    let sin_phi = phi.sin();
    (0.5 * (FRAC_PI_2 - phi)).tan() / ((1.0 - e * sin_phi) / (1.0 + e * sin_phi)).powf(0.5 * e)
}

fn phi2(e: f64, ts: f64) -> Result<f64> {
    let half_e = 0.5 * e;
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..15 {
        let con = e * phi.sin();
        let dphi =
            FRAC_PI_2 - 2.0 * (ts * ((1.0 - con) / (1.0 + con)).powf(half_e)).atan() - phi;
        phi += dphi;
        if dphi.abs() < 1e-12 {
            return Ok(phi);
        }
    }
    bail!("inverse projection did not converge for ts = {ts}")
}
