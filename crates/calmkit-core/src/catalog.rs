//! Built-in exercise catalog.
//!
//! User-defined exercises from the config file are merged on top of the
//! built-ins; a custom entry with an existing id replaces the built-in one.

use serde::Serialize;

use crate::error::CatalogError;
use crate::session::{BreathingDefinition, GroundingDefinition};
use crate::storage::Config;

/// Exercise started by the emergency button.
pub const PANIC_EXERCISE_ID: &str = "box-breathing";

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub breathing: Vec<BreathingDefinition>,
    pub grounding: Vec<GroundingDefinition>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            breathing: builtin_breathing(),
            grounding: builtin_grounding(),
        }
    }

    /// Built-ins plus the custom exercises declared in `config`.
    pub fn with_custom(config: &Config) -> Self {
        let mut catalog = Self::builtin();
        for custom in &config.custom_breathing {
            upsert(&mut catalog.breathing, custom.clone(), |d| &d.id);
        }
        for custom in &config.custom_grounding {
            upsert(&mut catalog.grounding, custom.clone(), |d| &d.id);
        }
        catalog
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ExerciseNotFound` for an unknown id.
    pub fn breathing(&self, id: &str) -> Result<&BreathingDefinition, CatalogError> {
        self.breathing
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::ExerciseNotFound {
                kind: "breathing",
                id: id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ExerciseNotFound` for an unknown id.
    pub fn grounding(&self, id: &str) -> Result<&GroundingDefinition, CatalogError> {
        self.grounding
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::ExerciseNotFound {
                kind: "grounding",
                id: id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Fails only if a custom catalog removed the panic exercise, which
    /// cannot happen since customs can replace but not delete entries.
    pub fn panic_exercise(&self) -> Result<&BreathingDefinition, CatalogError> {
        self.breathing(PANIC_EXERCISE_ID)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn upsert<T>(list: &mut Vec<T>, item: T, id: impl Fn(&T) -> &String) {
    match list.iter().position(|existing| id(existing) == id(&item)) {
        Some(i) => list[i] = item,
        None => list.push(item),
    }
}

fn builtin_breathing() -> Vec<BreathingDefinition> {
    vec![
        BreathingDefinition::with_pattern("box-breathing", "Box Breathing", "#6366f1", (4, 4, 4), 5)
            .describe("Military technique to calm anxiety quickly"),
        BreathingDefinition::with_pattern("4-7-8", "4-7-8 Breathing", "#10b981", (4, 7, 8), 4)
            .describe("Dr. Weil's method for inducing relaxation"),
        BreathingDefinition::with_pattern(
            "triangle-breathing",
            "Triangle Breathing",
            "#f59e0b",
            (3, 3, 3),
            6,
        )
        .describe("Balanced breathing to center yourself"),
        BreathingDefinition::with_pattern(
            "extended-exhale",
            "Extended Exhale",
            "#ec4899",
            (4, 0, 8),
            5,
        )
        .describe("Breathing that activates the parasympathetic system"),
    ]
}

fn builtin_grounding() -> Vec<GroundingDefinition> {
    vec![
        GroundingDefinition::new(
            "5-4-3-2-1",
            "5-4-3-2-1 Technique",
            "👁️",
            "#8b5cf6",
            [
                "5 things you can SEE",
                "4 things you can TOUCH",
                "3 things you can HEAR",
                "2 things you can SMELL",
                "1 thing you can TASTE",
            ],
        )
        .describe("Use your senses to connect with the present"),
        GroundingDefinition::new(
            "body-scan",
            "Body Scan",
            "🧘",
            "#06b6d4",
            [
                "Toes",
                "Feet and ankles",
                "Calves",
                "Thighs",
                "Hips",
                "Abdomen",
                "Chest",
                "Shoulders",
                "Arms",
                "Hands",
                "Neck",
                "Face",
            ],
        )
        .describe("Connect with each part of your body"),
        GroundingDefinition::new(
            "temperature",
            "Temperature and Texture",
            "🌡️",
            "#f97316",
            [
                "Touch something cold (ice, metal)",
                "Touch something warm (a cup of tea)",
                "Touch something soft (fabric, a plush toy)",
                "Touch something rough (sandpaper)",
                "Touch something smooth (glass, plastic)",
            ],
        )
        .describe("Focus on physical sensations"),
        GroundingDefinition::new(
            "counting",
            "Countdown",
            "🔢",
            "#ef4444",
            [
                "Count from 100 to 0 in threes",
                "Count from 50 to 0 in twos",
                "Count from 20 to 0 one by one",
                "Count from 10 to 0 very slowly",
            ],
        )
        .describe("Count backwards to distract your mind"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_valid() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.breathing.len(), 4);
        assert_eq!(catalog.grounding.len(), 4);
        for def in &catalog.breathing {
            assert!(def.filtered_phases().is_ok(), "{} invalid", def.id);
        }
        for def in &catalog.grounding {
            assert!(def.validate().is_ok(), "{} invalid", def.id);
        }
    }

    #[test]
    fn panic_exercise_is_box_breathing() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.panic_exercise().unwrap().id, "box-breathing");
    }

    #[test]
    fn unknown_id_is_an_error() {
        let catalog = Catalog::builtin();
        let err = catalog.grounding("nope").unwrap_err();
        assert_eq!(err.to_string(), "No grounding exercise with id 'nope'");
    }

    #[test]
    fn custom_entries_shadow_builtins() {
        let mut config = Config::default();
        config.custom_breathing.push(BreathingDefinition::with_pattern(
            "box-breathing",
            "Quick Box",
            "#000000",
            (2, 2, 2),
            1,
        ));
        config.custom_grounding.push(GroundingDefinition::new(
            "desk",
            "Desk Check",
            "🪑",
            "#123456",
            ["Feel the chair", "Feel the desk"],
        ));

        let catalog = Catalog::with_custom(&config);
        assert_eq!(catalog.breathing.len(), 4);
        assert_eq!(catalog.breathing("box-breathing").unwrap().name, "Quick Box");
        assert_eq!(catalog.grounding("desk").unwrap().steps.len(), 2);
    }
}
