use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inhale,
    Hold,
    Exhale,
}

impl Phase {
    /// Short instruction shown while the phase is active.
    pub fn instruction(self) -> &'static str {
        match self {
            Phase::Inhale => "INHALE",
            Phase::Hold => "HOLD",
            Phase::Exhale => "EXHALE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub phase: Phase,
    /// Duration in seconds. Zero is allowed for `Hold` only.
    pub duration_secs: u32,
}

impl PhaseSpec {
    pub fn new(phase: Phase, duration_secs: u32) -> Self {
        Self {
            phase,
            duration_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
    pub phases: Vec<PhaseSpec>,
    /// Total repetitions of the full phase sequence.
    pub cycles: u32,
}

impl BreathingDefinition {
    /// Build the common inhale/hold/exhale pattern.
    pub fn with_pattern(
        id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        (inhale, hold, exhale): (u32, u32, u32),
        cycles: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            color: color.into(),
            phases: vec![
                PhaseSpec::new(Phase::Inhale, inhale),
                PhaseSpec::new(Phase::Hold, hold),
                PhaseSpec::new(Phase::Exhale, exhale),
            ],
            cycles,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the definition and return its phase sequence with zero-duration
    /// phases removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDefinition` if `cycles` is zero, an
    /// inhale or exhale has no duration, or the sequence lacks an inhale or
    /// an exhale.
    pub fn filtered_phases(&self) -> Result<Vec<PhaseSpec>, SessionError> {
        if self.cycles == 0 {
            return Err(SessionError::invalid(&self.id, "cycles must be at least 1"));
        }
        for spec in &self.phases {
            if spec.phase != Phase::Hold && spec.duration_secs == 0 {
                return Err(SessionError::invalid(
                    &self.id,
                    format!("{:?} duration must be greater than zero", spec.phase),
                ));
            }
        }
        for required in [Phase::Inhale, Phase::Exhale] {
            if !self.phases.iter().any(|s| s.phase == required) {
                return Err(SessionError::invalid(
                    &self.id,
                    format!("sequence has no {required:?} phase"),
                ));
            }
        }
        Ok(self
            .phases
            .iter()
            .copied()
            .filter(|s| s.duration_secs > 0)
            .collect())
    }

    /// Seconds of one full cycle (zero-duration phases contribute nothing).
    pub fn cycle_secs(&self) -> u64 {
        self.phases.iter().map(|s| s.duration_secs as u64).sum()
    }

    pub fn total_secs(&self) -> u64 {
        self.cycle_secs().saturating_mul(self.cycles as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub icon: String,
    pub color: String,
    pub steps: Vec<String>,
}

impl GroundingDefinition {
    pub fn new<S: Into<String>>(
        id: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        color: impl Into<String>,
        steps: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: icon.into(),
            color: color.into(),
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidDefinition` if there are no steps.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.steps.is_empty() {
            return Err(SessionError::invalid(&self.id, "step sequence is empty"));
        }
        Ok(())
    }

    pub fn total_secs(&self, step_interval: Duration) -> u64 {
        step_interval
            .as_secs()
            .saturating_mul(self.steps.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extended_exhale() -> BreathingDefinition {
        BreathingDefinition::with_pattern(
            "extended-exhale",
            "Extended Exhale",
            "#ec4899",
            (4, 0, 8),
            5,
        )
    }

    #[test]
    fn zero_hold_is_filtered_out() {
        let phases = extended_exhale().filtered_phases().unwrap();
        assert_eq!(
            phases,
            vec![
                PhaseSpec::new(Phase::Inhale, 4),
                PhaseSpec::new(Phase::Exhale, 8)
            ]
        );
    }

    #[test]
    fn zero_cycles_rejected() {
        let mut def = extended_exhale();
        def.cycles = 0;
        assert!(matches!(
            def.filtered_phases(),
            Err(SessionError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn zero_inhale_rejected() {
        let def = BreathingDefinition::with_pattern("bad", "Bad", "#000", (0, 4, 4), 1);
        assert!(def.filtered_phases().is_err());
    }

    #[test]
    fn missing_exhale_rejected() {
        let mut def = extended_exhale();
        def.phases.retain(|s| s.phase != Phase::Exhale);
        let err = def.filtered_phases().unwrap_err();
        assert!(err.to_string().contains("Exhale"));
    }

    #[test]
    fn total_duration() {
        assert_eq!(extended_exhale().cycle_secs(), 12);
        assert_eq!(extended_exhale().total_secs(), 60);
    }

    #[test]
    fn empty_grounding_rejected() {
        let def = GroundingDefinition::new("empty", "Empty", "-", "#000", Vec::<String>::new());
        assert!(def.validate().is_err());
    }

    #[test]
    fn grounding_total_uses_step_interval() {
        let def = GroundingDefinition::new("g", "G", "-", "#000", ["a", "b", "c"]);
        assert_eq!(def.total_secs(Duration::from_secs(3)), 9);
    }

    #[test]
    fn definition_deserializes_without_description() {
        let json = r##"{
            "id": "x",
            "name": "X",
            "color": "#fff",
            "phases": [
                {"phase": "inhale", "duration_secs": 2},
                {"phase": "exhale", "duration_secs": 2}
            ],
            "cycles": 1
        }"##;
        let def: BreathingDefinition = serde_json::from_str(json).unwrap();
        assert!(def.description.is_empty());
        assert_eq!(def.filtered_phases().unwrap().len(), 2);
    }
}
