//! Geographic helpers: haversine distance and nearest-warehouse lookup.

use rand::Rng;
use sim_core::Warehouse;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Multiplier from straight-line to road distance.
pub const ROAD_FACTOR: f64 = 1.3;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // clamp guards asin against rounding just above 1.0
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Closest warehouse to a location; ties resolve to the earlier table entry.
/// Returns `None` only for an empty slice.
pub fn nearest_warehouse(warehouses: &[Warehouse], lat: f64, lon: f64) -> Option<&Warehouse> {
    let mut best: Option<(&Warehouse, f64)> = None;
    for w in warehouses {
        let d = haversine_km(lat, lon, w.latitude, w.longitude);
        match best {
            Some((_, bd)) if bd <= d => {}
            _ => best = Some((w, d)),
        }
    }
    best.map(|(w, _)| w)
}

/// Road distance from a warehouse to a customer, rounded to 2 dp.
pub fn road_distance_km(warehouse: &Warehouse, lat: f64, lon: f64) -> f64 {
    let straight = haversine_km(warehouse.latitude, warehouse.longitude, lat, lon);
    crate::round2(straight * ROAD_FACTOR)
}

/// A point within ±`max_offset_deg` of `(lat, lon)`, clamped to the
/// continental US bounding box and rounded to 6 dp.
pub fn jitter_location<R: Rng + ?Sized>(
    rng: &mut R,
    lat: f64,
    lon: f64,
    max_offset_deg: f64,
) -> (f64, f64) {
    let dlat: f64 = rng.gen_range(-max_offset_deg..max_offset_deg);
    let dlon: f64 = rng.gen_range(-max_offset_deg..max_offset_deg);
    let round6 = |x: f64| (x * 1e6).round() / 1e6;
    (
        round6(lat + dlat).clamp(24.5, 49.0),
        round6(lon + dlon).clamp(-125.0, -66.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal::Decimal;
    use sim_core::WarehouseId;

    fn wh(id: &str, lat: f64, lon: f64) -> Warehouse {
        Warehouse {
            warehouse_id: WarehouseId::from(id),
            warehouse_name: id.into(),
            region: "R".into(),
            city: "C".into(),
            state: "S".into(),
            latitude: lat,
            longitude: lon,
            capacity_units: 1000,
            operating_cost_per_day: Decimal::ZERO,
        }
    }

    #[test]
    fn haversine_known_distance() {
        // Newark → Los Angeles is roughly 3,950 km.
        let d = haversine_km(40.735657, -74.172367, 33.942791, -118.267586);
        assert!((3900.0..4000.0).contains(&d), "got {d}");
        assert_eq!(haversine_km(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn nearest_picks_closest() {
        let whs = vec![wh("WH-001", 40.7, -74.2), wh("WH-002", 33.9, -118.3)];
        let n = nearest_warehouse(&whs, 34.0, -118.0).unwrap();
        assert_eq!(n.warehouse_id.as_str(), "WH-002");
        assert!(nearest_warehouse(&[], 0.0, 0.0).is_none());
    }

    #[test]
    fn nearest_tie_keeps_first() {
        let whs = vec![wh("A", 10.0, 10.0), wh("B", 10.0, 10.0)];
        assert_eq!(nearest_warehouse(&whs, 11.0, 11.0).unwrap().warehouse_id.as_str(), "A");
    }

    #[test]
    fn road_distance_applies_factor() {
        let w = wh("WH-001", 40.0, -74.0);
        let straight = haversine_km(40.0, -74.0, 40.5, -74.5);
        assert_eq!(road_distance_km(&w, 40.5, -74.5), crate::round2(straight * ROAD_FACTOR));
    }

    #[test]
    fn jitter_stays_in_box() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            let (lat, lon) = jitter_location(&mut rng, 47.6, -122.3, 1.2);
            assert!((24.5..=49.0).contains(&lat));
            assert!((-125.0..=-66.0).contains(&lon));
        }
    }
}
