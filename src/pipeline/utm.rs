//! UTM → WGS84 geographic conversion.
//!
//! Implements the inverse transverse Mercator projection with Krüger's
//! series to sixth order in the third flattening `n`, followed by a Newton
//! iteration from conformal to geodetic latitude. This is the algorithm PROJ
//! uses for `+proj=utm` (its `etmerc` path); it is accurate to well under a
//! millimetre anywhere inside a zone.
//!
//! The transform is pure arithmetic: no I/O, no allocation, deterministic
//! for identical inputs.

use crate::error::AlertError;
use crate::record::GeoPoint;

/// WGS84 semi-major axis (m).
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central scale factor.
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A parsed zone label such as `18N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    /// 1–60.
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    /// Parse `"<number><band>"`.
    ///
    /// The hemisphere is decided lexically: any band letter at or after `N`
    /// (case-insensitive) is northern. Latitude bands `N`–`X` are northern
    /// and `C`–`M` southern, so this also covers labels that use the
    /// hemisphere letters `N`/`S` directly.
    pub fn parse(label: &str) -> Result<Self, AlertError> {
        let invalid = |reason: &str| AlertError::InvalidZone {
            label: label.to_string(),
            reason: reason.to_string(),
        };

        let band = label.chars().last().ok_or_else(|| invalid("label is empty"))?;
        if !band.is_ascii_alphabetic() {
            return Err(invalid("last character must be a band letter"));
        }
        let digits = &label[..label.len() - band.len_utf8()];
        let number: u8 = digits
            .parse()
            .map_err(|_| invalid("zone number is not numeric"))?;
        if !(1..=60).contains(&number) {
            return Err(invalid("zone number must be 1–60"));
        }

        Ok(Self {
            number,
            north: band.to_ascii_uppercase() >= 'N',
        })
    }

    /// Longitude of the zone's central meridian, in degrees.
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }
}

/// Convert a UTM position to WGS84 latitude/longitude in degrees.
pub fn to_geographic(zone_label: &str, easting: f64, northing: f64) -> Result<GeoPoint, AlertError> {
    let zone = UtmZone::parse(zone_label)?;
    Ok(inverse(zone, easting, northing))
}

/// Inverse transverse Mercator for an already-validated zone.
pub fn inverse(zone: UtmZone, easting: f64, northing: f64) -> GeoPoint {
    let f = WGS84_F;
    let n = f / (2.0 - f);
    let e = (f * (2.0 - f)).sqrt();

    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;
    let n5 = n4 * n;
    let n6 = n5 * n;

    // Rectifying radius.
    let a_rect = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

    // Krüger β coefficients (inverse series).
    let beta = [
        n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
            + 96199.0 * n6 / 604800.0,
        n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
            - 1118711.0 * n6 / 3870720.0,
        17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
        4397.0 * n4 / 161280.0 - 11.0 * n5 / 504.0 - 830251.0 * n6 / 7257600.0,
        4583.0 * n5 / 161280.0 - 108847.0 * n6 / 3991680.0,
        20648693.0 * n6 / 638668800.0,
    ];

    let false_northing = if zone.north { 0.0 } else { FALSE_NORTHING_SOUTH };
    let xi = (northing - false_northing) / (K0 * a_rect);
    let eta = (easting - FALSE_EASTING) / (K0 * a_rect);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, b) in beta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi_p -= b * (k * xi).sin() * (k * eta).cosh();
        eta_p -= b * (k * xi).cos() * (k * eta).sinh();
    }

    // Conformal latitude (as tangent) and longitude offset.
    let tau_p = xi_p.sin() / (eta_p.sinh().powi(2) + xi_p.cos().powi(2)).sqrt();
    let lambda = eta_p.sinh().atan2(xi_p.cos());

    let tau = conformal_to_geodetic(tau_p, e);

    GeoPoint {
        latitude: tau.atan().to_degrees(),
        longitude: zone.central_meridian() + lambda.to_degrees(),
    }
}

/// Solve τ' = τ·√(1+σ²) − σ·√(1+τ²) for τ (tangent of geodetic latitude).
fn conformal_to_geodetic(tau_p: f64, e: f64) -> f64 {
    let e2 = e * e;
    let mut tau = tau_p;
    for _ in 0..8 {
        let sigma = (e * (e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
        let tau_i = tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt();
        let delta = (tau_p - tau_i) / (1.0 + tau_i * tau_i).sqrt() * (1.0 + (1.0 - e2) * tau * tau)
            / ((1.0 - e2) * (1.0 + tau * tau).sqrt());
        tau += delta;
        if delta.abs() < 1e-14 {
            break;
        }
    }
    tau
}
