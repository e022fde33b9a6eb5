//! Unit conversions and physical constants.
//!
//! Powers are handled in linear units (W) inside the crate. The conversions
//! here are used at the boundary, where link and component parameters are
//! given in dB or dBm.

/// Planck constant (J·s).
pub const PLANCK: f64 = 6.626_070_15e-34;

/// Converts a value in dB to linear units.
///
/// # Examples
/// ```
/// # use mmse_penalty::units::db2lin;
/// assert!((db2lin(20.0) - 100.0).abs() < 1e-12);
/// ```
pub fn db2lin(db: f64) -> f64 {
    10.0_f64.powf(0.1 * db)
}

/// Converts a linear value to dB.
pub fn lin2db(lin: f64) -> f64 {
    10.0 * lin.log10()
}

/// Converts a power in dBm to W.
pub fn dbm2watt(dbm: f64) -> f64 {
    1e-3 * db2lin(dbm)
}

/// Converts a power in W to dBm.
pub fn watt2dbm(watt: f64) -> f64 {
    lin2db(1e3 * watt)
}

/// Converts a power ratio in dB to the natural-log (neper-like) domain.
///
/// A ratio of `x` dB corresponds to `exp(db2natural(x))` in linear units.
pub fn db2natural(db: f64) -> f64 {
    db * std::f64::consts::LN_10 / 10.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn db_roundtrip() {
        for &x in &[-30.0, -3.0, 0.0, 4.5, 17.0] {
            assert!((lin2db(db2lin(x)) - x).abs() < 1e-12);
        }
    }

    #[test]
    fn dbm() {
        assert!((dbm2watt(0.0) - 1e-3).abs() < 1e-18);
        assert!((dbm2watt(30.0) - 1.0).abs() < 1e-12);
        assert!((watt2dbm(2e-3) - 3.0103).abs() < 1e-4);
    }

    #[test]
    fn natural_domain() {
        let db = 2.5;
        assert!((db2natural(db).exp() - db2lin(db)).abs() < 1e-12);
    }
}
