use anyhow::{Context, Result, bail};

use crate::Crs;
use crate::datum::datum_transform;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Axis convention every point is normalized to before projecting.
const STANDARD_AXIS: &str = "enu";

/// A reprojection fixed at construction time. Datum pairs without direct
/// shift parameters are routed through WGS84, expressed as two chained
/// sub-transforms rather than per-point rewriting of the source descriptor.
#[derive(Debug)]
pub enum Transform {
    Direct { source: Crs, dest: Crs },
    Pivoted { to_pivot: Box<Transform>, onward: Box<Transform> },
}

/// Builds the transform taking (x, y) pairs in `source` to `dest`. The
/// result is pure and safe to share across threads.
pub fn build_transform(source: &Crs, dest: &Crs) -> Result<Transform> {
    if needs_pivot(source, dest) || needs_pivot(dest, source) {
        let pivot = Crs::named("WGS84").context("resolving the WGS84 pivot")?;
        log::debug!(
            "datum shift {} -> {} routed through WGS84",
            source.datum_code,
            dest.datum_code
        );
        return Ok(Transform::Pivoted {
            to_pivot: Box::new(build_transform(source, &pivot)?),
            onward: Box::new(build_transform(&pivot, dest)?),
        });
    }
    Ok(Transform::Direct {
        source: source.clone(),
        dest: dest.clone(),
    })
}

/// Direct parametric shifts only exist relative to WGS84, so any other
/// endpoint forces the pivot.
fn needs_pivot(from: &Crs, to: &Crs) -> bool {
    from.datum.shift.is_parametric() && to.datum_code != "WGS84"
}

impl Transform {
    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            Transform::Pivoted { to_pivot, onward } => {
                let (x, y) = to_pivot.apply(x, y)?;
                onward.apply(x, y)
            }
            Transform::Direct { source, dest } => direct(source, dest, x, y),
        }
    }
}

fn direct(source: &Crs, dest: &Crs, x: f64, y: f64) -> Result<(f64, f64)> {
    let (mut x, mut y, mut z) = (x, y, 0.0);

    if source.axis != STANDARD_AXIS {
        (x, y, z) = adjust_axis(&source.axis, x, y, z)?;
    }

    if source.is_geographic() {
        x *= DEG_TO_RAD;
        y *= DEG_TO_RAD;
    } else {
        x *= source.to_meter;
        y *= source.to_meter;
        (x, y) = source
            .projection()
            .inverse(x, y)
            .with_context(|| format!("inverse {} projection", source.name))?;
    }

    x += source.from_greenwich;
    (x, y, z) = datum_transform(&source.datum, &dest.datum, x, y, z)
        .with_context(|| format!("datum shift {} -> {}", source.datum_code, dest.datum_code))?;
    x -= dest.from_greenwich;

    if dest.is_geographic() {
        x *= RAD_TO_DEG;
        y *= RAD_TO_DEG;
    } else {
        (x, y) = dest
            .projection()
            .forward(x, y)
            .with_context(|| format!("forward {} projection", dest.name))?;
        x /= dest.to_meter;
        y /= dest.to_meter;
    }

    if dest.axis != STANDARD_AXIS {
        (x, y, _) = adjust_axis(&dest.axis, x, y, z)?;
    }
    Ok((x, y))
}

/// Permutes and flips a coordinate triple between the given axis convention
/// and east-north-up. The mapping is its own inverse for the swap/flip
/// conventions in use, so both pipeline ends share it.
fn adjust_axis(axis: &str, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64)> {
    let input = [x, y, z];
    let (mut ox, mut oy, mut oz) = (x, y, z);
    for (i, direction) in axis.chars().take(3).enumerate() {
        let v = input[i];
        match direction {
            'e' => ox = v,
            'w' => ox = -v,
            'n' => oy = v,
            's' => oy = -v,
            'u' => oz = v,
            'd' => oz = -v,
            _ => bail!("unsupported axis direction {direction:?} in {axis:?}"),
        }
    }
    Ok((ox, oy, oz))
}
