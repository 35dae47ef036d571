//! Module containing miscellaneous utility functions.

use crate::imports::*;

/// Returns true if `val1` and `val2` are within a relative/absolute `epsilon` of each other
pub fn almost_eq(val1: f64, val2: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    ((val2 - val1) / (val1 + val2)).abs() < epsilon || (val2 - val1).abs() < epsilon
}

/// Returns true if `vals` never decreases
pub fn is_sorted(vals: &[f64]) -> bool {
    vals.windows(2).all(|w| w[0] <= w[1])
}

/// Linear interpolation of `y_data` at `x`; repeated x values after the first are
/// ignored and lookups outside the data are held at the end values unless
/// `extrapolate` is set.  `x_data` is assumed sorted and of the same length as
/// `y_data`.
pub fn interpolate(x: f64, x_data: &Array1<f64>, y_data: &Array1<f64>, extrapolate: bool) -> f64 {
    debug_assert!(x_data.len() == y_data.len());
    let mut xs: Vec<f64> = Vec::with_capacity(x_data.len());
    let mut ys: Vec<f64> = Vec::with_capacity(y_data.len());
    for (&xi, &yi) in x_data.iter().zip(y_data.iter()) {
        if xs.last().map_or(true, |&last| xi > last) {
            xs.push(xi);
            ys.push(yi);
        }
    }
    match xs.len() {
        0 => return f64::NAN,
        1 => return ys[0],
        _ => {}
    }
    let size = xs.len();

    let mut i = 0;
    if x >= xs[size - 2] {
        i = size - 2;
    } else {
        while x > xs[i + 1] {
            i += 1;
        }
    }
    let (xl, xr) = (xs[i], xs[i + 1]);
    let (mut yl, mut yr) = (ys[i], ys[i + 1]);
    if !extrapolate {
        if x < xl {
            yr = yl;
        }
        if x > xr {
            yl = yr;
        }
    }
    let dydx = (yr - yl) / (xr - xl);
    yl + dydx * (x - xl)
}

/// (De)serializes a [`Duration`] as floating point seconds
pub mod serde_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(dur: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_f64(dur.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(de)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// (De)serializes an `f64` that may be NaN, which JSON cannot represent, as
/// an optional number
pub mod serde_nan {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(val: &f64, ser: S) -> Result<S::Ok, S::Error> {
        (!val.is_nan()).then_some(*val).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(de)?.unwrap_or(f64::NAN))
    }
}
