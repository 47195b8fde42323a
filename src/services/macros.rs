use crate::models::FoodItem;

/// Approximate macros per 100 g.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroEntry {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroEntry {
    const fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    /// Builds an item for `grams` of this food, rounding each macro to whole units.
    pub fn portion(&self, name: impl Into<String>, grams: f64) -> FoodItem {
        let scale = grams / 100.0;
        FoodItem {
            name: name.into(),
            grams,
            calories: (self.calories * scale).round(),
            protein: (self.protein * scale).round(),
            carbs: (self.carbs * scale).round(),
            fat: (self.fat * scale).round(),
        }
    }
}

/// Food-101 label fragments with rough reference values.
const TABLE: &[(&str, MacroEntry)] = &[
    ("pizza", MacroEntry::new(266.0, 11.0, 33.0, 10.0)),
    ("hamburger", MacroEntry::new(295.0, 17.0, 24.0, 14.0)),
    ("sushi", MacroEntry::new(140.0, 5.0, 28.0, 1.0)),
    ("salad", MacroEntry::new(30.0, 1.0, 4.0, 0.0)),
    ("steak", MacroEntry::new(271.0, 26.0, 0.0, 19.0)),
    ("chicken_wings", MacroEntry::new(203.0, 30.0, 0.0, 8.0)),
    ("spaghetti_bolognese", MacroEntry::new(150.0, 7.0, 20.0, 5.0)),
    ("chocolate_cake", MacroEntry::new(371.0, 5.0, 53.0, 15.0)),
];

pub const DEFAULT_ENTRY: MacroEntry = MacroEntry::new(150.0, 10.0, 15.0, 5.0);

/// Looks up the entry whose key occurs in `label`. The longest matching key wins,
/// so a specific key is never shadowed by a shorter one it contains.
pub fn lookup(label: &str) -> &'static MacroEntry {
    let label = label.to_lowercase();
    TABLE
        .iter()
        .filter(|(key, _)| label.contains(key))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, entry)| entry)
        .unwrap_or(&DEFAULT_ENTRY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pizza_at_100g_matches_reference() {
        let item = lookup("pizza").portion("pizza", 100.0);
        assert_eq!(item.calories, 266.0);
        assert_eq!(item.protein, 11.0);
        assert_eq!(item.carbs, 33.0);
        assert_eq!(item.fat, 10.0);
        assert_eq!(item.grams, 100.0);
    }

    #[test]
    fn test_unknown_label_uses_default() {
        assert_eq!(lookup("pho"), &DEFAULT_ENTRY);
    }

    #[test]
    fn test_substring_and_case_insensitive_match() {
        assert_eq!(lookup("Caesar_Salad").calories, 30.0);
        assert_eq!(lookup("beef_steak_tartare").protein, 26.0);
    }

    #[test]
    fn test_longest_key_wins() {
        // "salad" and "chicken_wings" both occur; the longer key is chosen.
        assert_eq!(lookup("chicken_wings_salad").calories, 203.0);
    }

    #[test]
    fn test_portion_scales_linearly() {
        let item = lookup("steak").portion("steak", 250.0);
        assert_eq!(item.calories, 678.0);
        assert_eq!(item.fat, 48.0);
    }
}
