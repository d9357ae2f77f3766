//! Real Las Vegas / Henderson locations for haversine-based scenarios.
//!
//! Coordinates sourced from OpenStreetMap.

use ride_pool_dispatch::stop::Location;

pub const WYNN: (f64, f64) = (36.1263781, -115.1658180);
pub const MGM_GRAND: (f64, f64) = (36.1023654, -115.1688720);
pub const BELLAGIO: (f64, f64) = (36.1126, -115.1767);
pub const CAESARS_PALACE: (f64, f64) = (36.1162, -115.1745);
pub const HARD_ROCK_CAFE: (f64, f64) = (36.1041592, -115.1722166);
pub const BROOKLYN_BOWL: (f64, f64) = (36.1175388, -115.1695094);
pub const LONGHORN_CASINO: (f64, f64) = (36.1070664, -115.0591256);

/// Strip locations with ids starting at 100.
pub fn strip() -> Vec<Location> {
    [
        WYNN,
        MGM_GRAND,
        BELLAGIO,
        CAESARS_PALACE,
        HARD_ROCK_CAFE,
        BROOKLYN_BOWL,
    ]
    .iter()
    .enumerate()
    .map(|(index, (lat, lng))| Location::new(100 + index as u64, *lat, *lng))
    .collect()
}

pub fn longhorn_casino() -> Location {
    Location::new(200, LONGHORN_CASINO.0, LONGHORN_CASINO.1)
}
