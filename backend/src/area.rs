/// Grid resolution of the cache key: 2 decimals, roughly 1.1 km of latitude.
const AREA_PRECISION: f64 = 100.0;

/// Coarse grid cell key used to find routes already generated near a point.
///
/// Both parts always carry two decimals (`48.90,2.30`) and halves round away
/// from zero (`-0.125` → `-0.13`). Stored rows are keyed by this exact text,
/// so changing the format orphans every cached area.
pub fn area_hash(lat: f64, lng: f64) -> String {
    format!("{:.2},{:.2}", snap(lat), snap(lng))
}

fn snap(value: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so both sides of the equator/meridian agree.
    (value * AREA_PRECISION).round() / AREA_PRECISION + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_cell_same_key() {
        assert_eq!(area_hash(48.8566, 2.3522), area_hash(48.8566001, 2.35221));
        assert_eq!(area_hash(48.8566, 2.3522), "48.86,2.35");
    }

    #[test]
    fn different_cells_differ() {
        assert_ne!(area_hash(48.8566, 2.3522), area_hash(48.87, 2.37));
    }

    #[test]
    fn keeps_two_decimals_and_rounds_halves_away_from_zero() {
        assert_eq!(area_hash(48.9, 2.3), "48.90,2.30");
        assert_eq!(area_hash(-0.125, 0.125), "-0.13,0.13");
    }

    #[test]
    fn negative_zero_is_normalized() {
        assert_eq!(area_hash(-0.001, -0.004), "0.00,0.00");
        assert_eq!(area_hash(-33.8688, 151.2093), "-33.87,151.21");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_area_hash_is_deterministic(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
                prop_assert_eq!(area_hash(lat, lng), area_hash(lat, lng));
            }

            #[test]
            fn prop_area_hash_is_stable_within_a_cell(
                lat_cell in -8_999i32..8_999,
                lng_cell in -17_999i32..17_999,
                dlat in -0.004f64..0.004,
                dlng in -0.004f64..0.004
            ) {
                let lat = lat_cell as f64 / 100.0;
                let lng = lng_cell as f64 / 100.0;
                prop_assert_eq!(area_hash(lat, lng), area_hash(lat + dlat, lng + dlng));
            }
        }
    }
}
