use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// Number of fractional digits kept in a cache key (~110 m of latitude).
pub const KEY_PRECISION: u32 = 3;

/// A raw latitude/longitude pair, as reported by a location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Normalize into the key used for caching and request URLs.
    pub fn normalize(&self) -> CacheKey {
        normalize(*self)
    }
}

/// A coordinate rounded to [`KEY_PRECISION`] decimals, stored as integer
/// thousandths so it can be hashed and compared exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    lat_milli: i64,
    lon_milli: i64,
}

impl CacheKey {
    pub fn latitude(&self) -> f64 {
        self.lat_milli as f64 / 1000.0
    }

    pub fn longitude(&self) -> f64 {
        self.lon_milli as f64 / 1000.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3},{:.3}", self.latitude(), self.longitude())
    }
}

impl From<CacheKey> for Coordinate {
    fn from(key: CacheKey) -> Self {
        Coordinate::new(key.latitude(), key.longitude())
    }
}

/// Round both axes half-up (ties away from zero) to three decimals.
///
/// Rounding happens on the shortest decimal form of each value, so `1.0005`
/// is treated as the tie it looks like rather than as its binary approximation.
pub fn normalize(coordinate: Coordinate) -> CacheKey {
    CacheKey {
        lat_milli: round_thousandths(coordinate.latitude),
        lon_milli: round_thousandths(coordinate.longitude),
    }
}

fn round_thousandths(value: f64) -> i64 {
    Decimal::from_str(&value.to_string())
        .ok()
        .and_then(|d| {
            d.round_dp_with_strategy(KEY_PRECISION, RoundingStrategy::MidpointAwayFromZero)
                .checked_mul(Decimal::new(1000, 0))
        })
        .and_then(|d| d.to_i64())
        // NaN, infinities and magnitudes beyond Decimal's range.
        .unwrap_or_else(|| (value * 1000.0).round() as i64)
}
