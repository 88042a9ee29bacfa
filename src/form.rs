use crate::workout::{Workout, WorkoutKind};

/// Raw text typed into the workout form.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutForm {
    pub kind: WorkoutKind,
    pub distance: String,
    pub duration: String,
    pub cadence: String,
    pub elevation: String,
}

impl Default for WorkoutForm {
    fn default() -> Self {
        Self {
            kind: WorkoutKind::Running,
            distance: String::new(),
            duration: String::new(),
            cadence: String::new(),
            elevation: String::new(),
        }
    }
}

/// Numbers parsed from the form, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormInputs {
    pub kind: WorkoutKind,
    pub distance_km: f64,
    pub duration_min: f64,
    pub extra: f64,
}

/// Empty input reads as zero and anything unparseable as NaN, so both fail
/// validation where a positive number is required.
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    text.parse().unwrap_or(f64::NAN)
}

impl WorkoutForm {
    /// Form prefilled with a workout's current values, for editing.
    pub fn for_workout(workout: &Workout) -> Self {
        let mut form = Self {
            kind: workout.kind(),
            distance: workout.distance_km().to_string(),
            duration: workout.duration_min().to_string(),
            ..Self::default()
        };
        match workout.kind() {
            WorkoutKind::Running => form.cadence = workout.extra().to_string(),
            WorkoutKind::Cycling => form.elevation = workout.extra().to_string(),
        }
        form
    }

    pub fn shows_cadence(&self) -> bool {
        self.kind == WorkoutKind::Running
    }

    pub fn shows_elevation(&self) -> bool {
        self.kind == WorkoutKind::Cycling
    }

    pub fn inputs(&self) -> FormInputs {
        let extra = match self.kind {
            WorkoutKind::Running => &self.cadence,
            WorkoutKind::Cycling => &self.elevation,
        };
        FormInputs {
            kind: self.kind,
            distance_km: parse_number(&self.distance),
            duration_min: parse_number(&self.duration),
            extra: parse_number(extra),
        }
    }

    /// Empty every input, keeping the selected kind.
    pub fn clear(&mut self) {
        *self = Self {
            kind: self.kind,
            ..Self::default()
        };
    }
}
