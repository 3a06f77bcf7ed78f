use crate::models::{Tags, TerrainType};

/// Map a way's tags to a terrain category. Rules are checked in order and
/// the first match wins.
pub fn classify(tags: &Tags) -> TerrainType {
    let get = |key: &str| tags.get(key).map(String::as_str);

    if matches!(get("leisure"), Some("park" | "garden")) || get("natural").is_some_and(|v| !v.is_empty()) {
        return TerrainType::Nature;
    }
    if matches!(get("highway"), Some("path" | "track")) {
        return TerrainType::Nature;
    }
    if get("highway") == Some("footway") && matches!(get("surface"), Some("grass" | "ground" | "earth")) {
        return TerrainType::Nature;
    }
    if matches!(get("highway"), Some("pedestrian" | "living_street")) {
        return TerrainType::Urban;
    }
    TerrainType::Mixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_tags_are_mixed() {
        assert_eq!(classify(&Tags::new()), TerrainType::Mixed);
    }

    #[test]
    fn parks_gardens_and_natural_features_are_nature() {
        assert_eq!(classify(&tags(&[("leisure", "park")])), TerrainType::Nature);
        assert_eq!(classify(&tags(&[("leisure", "garden")])), TerrainType::Nature);
        assert_eq!(classify(&tags(&[("natural", "wood")])), TerrainType::Nature);
        assert_eq!(classify(&tags(&[("leisure", "pitch")])), TerrainType::Mixed);
    }

    #[test]
    fn empty_natural_tag_is_ignored() {
        assert_eq!(classify(&tags(&[("natural", "")])), TerrainType::Mixed);
        assert_eq!(
            classify(&tags(&[("natural", ""), ("highway", "pedestrian")])),
            TerrainType::Urban
        );
    }

    #[test]
    fn paths_and_tracks_are_nature() {
        assert_eq!(classify(&tags(&[("highway", "path")])), TerrainType::Nature);
        assert_eq!(classify(&tags(&[("highway", "track")])), TerrainType::Nature);
    }

    #[test]
    fn footway_depends_on_surface() {
        assert_eq!(classify(&tags(&[("highway", "footway")])), TerrainType::Mixed);
        assert_eq!(
            classify(&tags(&[("highway", "footway"), ("surface", "asphalt")])),
            TerrainType::Mixed
        );
        for surface in ["grass", "ground", "earth"] {
            assert_eq!(
                classify(&tags(&[("highway", "footway"), ("surface", surface)])),
                TerrainType::Nature
            );
        }
    }

    #[test]
    fn pedestrian_streets_are_urban() {
        assert_eq!(classify(&tags(&[("highway", "pedestrian")])), TerrainType::Urban);
        assert_eq!(classify(&tags(&[("highway", "living_street")])), TerrainType::Urban);
    }

    #[test]
    fn earlier_rules_win() {
        // A pedestrian street inside a park is still nature.
        assert_eq!(
            classify(&tags(&[("highway", "pedestrian"), ("leisure", "park")])),
            TerrainType::Nature
        );
        assert_eq!(
            classify(&tags(&[("highway", "living_street"), ("natural", "water")])),
            TerrainType::Nature
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn tag_map() -> impl Strategy<Value = Tags> {
            let keys = prop::sample::select(vec!["highway", "leisure", "natural", "surface", "name", "foo"]);
            let values = prop::sample::select(vec![
                "path", "track", "footway", "pedestrian", "living_street", "park", "garden",
                "grass", "ground", "earth", "asphalt", "wood", "",
            ]);
            prop::collection::btree_map(keys.prop_map(String::from), values.prop_map(String::from), 0..5)
        }

        proptest! {
            #[test]
            fn prop_classify_is_pure(tags in tag_map()) {
                prop_assert_eq!(classify(&tags), classify(&tags.clone()));
            }

            #[test]
            fn prop_natural_key_always_wins(mut tags in tag_map(), value in "[a-z]{1,8}") {
                tags.insert("natural".into(), value);
                prop_assert_eq!(classify(&tags), TerrainType::Nature);
            }
        }
    }
}
