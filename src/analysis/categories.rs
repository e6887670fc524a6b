//! Debris categories and their blockage weights.

/// Relative tendency of each category to obstruct flow.
const WEIGHTS: &[(&str, f64)] = &[
    ("plastic_bag", 1.8),
    ("garbage_bag", 1.8),
    ("plastic_film", 1.7),
    ("cloth", 1.6),
    ("tissue", 1.5),
    ("paper_bag", 1.4),
    ("food_waste", 1.4),
    ("paper", 1.2),
    ("cardboard", 1.1),
    ("plastic_container", 1.0),
    ("foam", 1.0),
    ("plastic_bottle", 0.8),
    ("glass_bottle", 0.7),
    ("metal_can", 0.6),
    ("glass", 0.5),
    ("other", 1.0),
];

/// Fallback families for names missing from [`WEIGHTS`], in lookup order.
const FAMILIES: &[&[&str]] = &[
    &["plastic_bag", "plastic_film", "plastic_container", "plastic_bottle"],
    &["paper", "paper_bag", "cardboard", "tissue"],
    &["food_waste", "organic"],
    &["metal_can", "aluminium"],
    &["glass", "glass_bottle"],
    &["cloth", "garbage_bag", "foam"],
];

/// Categories counted by the assessor as especially blockage-prone.
const BLOCKAGE_PRONE: &[&str] = &["plastic_bag", "cloth", "paper", "organic"];

const DEFAULT_WEIGHT: f64 = 1.0;

/// Lower-case, spaces to underscores.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn exact(name: &str) -> Option<f64> {
    WEIGHTS.iter().find(|(n, _)| *n == name).map(|&(_, w)| w)
}

/// Blockage weight for a reported category name.
///
/// Unknown names take the mean weight of the first family with a member
/// contained in the name, else 1.0.
pub fn weight(name: &str) -> f64 {
    let name = normalize(name);
    if let Some(w) = exact(&name) {
        return w;
    }
    FAMILIES
        .iter()
        .find(|family| family.iter().any(|m| name.contains(m)))
        .and_then(|family| super::mean(family.iter().filter_map(|m| exact(m))))
        .unwrap_or(DEFAULT_WEIGHT)
}

pub fn is_blockage_prone(name: &str) -> bool {
    BLOCKAGE_PRONE.contains(&normalize(name).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories() {
        assert_eq!(weight("plastic_bag"), 1.8);
        assert_eq!(weight("Plastic Bag"), 1.8);
        assert_eq!(weight("glass"), 0.5);
    }

    #[test]
    fn family_fallback() {
        // plastic family: (1.8 + 1.7 + 1.0 + 0.8) / 4
        assert!((weight("large_plastic_bottle") - 1.325).abs() < 1e-9);
        // food family: only food_waste carries a weight
        assert_eq!(weight("organic_matter"), 1.4);
        assert_eq!(weight("crushed_metal_can"), 0.6);
    }

    #[test]
    fn unknown_defaults_to_one() {
        assert_eq!(weight("leaf"), 1.0);
    }

    #[test]
    fn blockage_prone() {
        assert!(is_blockage_prone("Plastic Bag"));
        assert!(is_blockage_prone("organic"));
        assert!(!is_blockage_prone("glass_bottle"));
    }
}
