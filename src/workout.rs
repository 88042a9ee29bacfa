//! Workout records and the metrics derived from them.
//!
//! A [`Workout`] carries the fields shared by every activity plus a
//! [`WorkoutDetails`] variant holding the kind-specific input and its derived
//! metric. Records are never mutated in place by the edit flow; a fresh record
//! is built with [`Workout::with_inputs`] instead.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// A `(latitude, longitude)` pair, persisted as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates(pub f64, pub f64);

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self(lat, lng)
    }

    pub fn lat(self) -> f64 {
        self.0
    }

    pub fn lng(self) -> f64 {
        self.1
    }
}

/// The kind of activity a workout records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutKind {
    Running,
    Cycling,
}

pub const ALL_KINDS: [WorkoutKind; 2] = [WorkoutKind::Running, WorkoutKind::Cycling];

impl WorkoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkoutKind::Running => "running",
            WorkoutKind::Cycling => "cycling",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkoutKind::Running => "Running",
            WorkoutKind::Cycling => "Cycling",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            WorkoutKind::Running => "🏃‍♂️",
            WorkoutKind::Cycling => "🚴‍♀️",
        }
    }
}

/// Kind-specific input and derived metric.
///
/// Derived values default to zero when absent from a stored record and are
/// recomputed by [`Workout::recompute_derived`] before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkoutDetails {
    #[serde(rename_all = "camelCase")]
    Running {
        cadence_spm: f64,
        #[serde(default)]
        pace_min_per_km: f64,
    },
    #[serde(rename_all = "camelCase")]
    Cycling {
        elevation_gain_m: f64,
        #[serde(default)]
        speed_km_per_h: f64,
    },
}

/// Pace in minutes per kilometre.
pub fn pace_min_per_km(distance_km: f64, duration_min: f64) -> f64 {
    duration_min / distance_km
}

/// Speed in kilometres per hour.
pub fn speed_km_per_h(distance_km: f64, duration_min: f64) -> f64 {
    distance_km / (duration_min / 60.0)
}

/// Human readable title such as `"Running on April 7"`, using the local date.
pub fn describe(kind: WorkoutKind, created_at: DateTime<Utc>) -> String {
    let local = created_at.with_timezone(&Local);
    format!("{} on {}", kind.label(), local.format("%B %-d"))
}

/// A single logged activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    id: String,
    created_at: DateTime<Utc>,
    coordinates: Coordinates,
    distance_km: f64,
    duration_min: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    interaction_count: u32,
    #[serde(flatten)]
    details: WorkoutDetails,
}

impl Workout {
    /// Build a record of `kind`; `extra` is the cadence for running and the
    /// elevation gain for cycling.
    pub fn new(
        kind: WorkoutKind,
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        coordinates: Coordinates,
        distance_km: f64,
        duration_min: f64,
        extra: f64,
    ) -> Self {
        let details = match kind {
            WorkoutKind::Running => WorkoutDetails::Running {
                cadence_spm: extra,
                pace_min_per_km: 0.0,
            },
            WorkoutKind::Cycling => WorkoutDetails::Cycling {
                elevation_gain_m: extra,
                speed_km_per_h: 0.0,
            },
        };
        let mut workout = Self {
            id: id.into(),
            created_at,
            coordinates,
            distance_km,
            duration_min,
            description: describe(kind, created_at),
            interaction_count: 0,
            details,
        };
        workout.recompute_derived();
        workout
    }

    #[cfg(test)]
    pub fn running(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        coordinates: Coordinates,
        distance_km: f64,
        duration_min: f64,
        cadence_spm: f64,
    ) -> Self {
        Self::new(
            WorkoutKind::Running,
            id,
            created_at,
            coordinates,
            distance_km,
            duration_min,
            cadence_spm,
        )
    }

    #[cfg(test)]
    pub fn cycling(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        coordinates: Coordinates,
        distance_km: f64,
        duration_min: f64,
        elevation_gain_m: f64,
    ) -> Self {
        Self::new(
            WorkoutKind::Cycling,
            id,
            created_at,
            coordinates,
            distance_km,
            duration_min,
            elevation_gain_m,
        )
    }

    /// A freshly constructed record of the same kind with new inputs.
    ///
    /// Identity (`id`, `created_at`, `coordinates`) and the interaction count
    /// carry over; derived metrics are recomputed.
    pub fn with_inputs(&self, distance_km: f64, duration_min: f64, extra: f64) -> Self {
        let mut workout = Self::new(
            self.kind(),
            self.id.clone(),
            self.created_at,
            self.coordinates,
            distance_km,
            duration_min,
            extra,
        );
        workout.interaction_count = self.interaction_count;
        workout
    }

    /// Recompute pace or speed from the current distance and duration.
    pub fn recompute_derived(&mut self) {
        match &mut self.details {
            WorkoutDetails::Running {
                pace_min_per_km: pace,
                ..
            } => *pace = pace_min_per_km(self.distance_km, self.duration_min),
            WorkoutDetails::Cycling {
                speed_km_per_h: speed,
                ..
            } => *speed = speed_km_per_h(self.distance_km, self.duration_min),
        }
    }

    /// Bring a record read from storage up to date: derived metrics are
    /// recomputed and a missing description is regenerated.
    pub fn normalized(mut self) -> Self {
        self.recompute_derived();
        if self.description.is_empty() {
            self.description = describe(self.kind(), self.created_at);
        }
        self
    }

    pub fn touch(&mut self) {
        self.interaction_count = self.interaction_count.saturating_add(1);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn duration_min(&self) -> f64 {
        self.duration_min
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn interaction_count(&self) -> u32 {
        self.interaction_count
    }

    pub fn kind(&self) -> WorkoutKind {
        match self.details {
            WorkoutDetails::Running { .. } => WorkoutKind::Running,
            WorkoutDetails::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    /// Cadence for running, elevation gain for cycling.
    pub fn extra(&self) -> f64 {
        match self.details {
            WorkoutDetails::Running { cadence_spm, .. } => cadence_spm,
            WorkoutDetails::Cycling {
                elevation_gain_m, ..
            } => elevation_gain_m,
        }
    }

    pub fn pace_min_per_km(&self) -> Option<f64> {
        match self.details {
            WorkoutDetails::Running {
                pace_min_per_km, ..
            } => Some(pace_min_per_km),
            WorkoutDetails::Cycling { .. } => None,
        }
    }

    pub fn speed_km_per_h(&self) -> Option<f64> {
        match self.details {
            WorkoutDetails::Cycling { speed_km_per_h, .. } => Some(speed_km_per_h),
            WorkoutDetails::Running { .. } => None,
        }
    }

    pub fn cadence_spm(&self) -> Option<f64> {
        match self.details {
            WorkoutDetails::Running { cadence_spm, .. } => Some(cadence_spm),
            WorkoutDetails::Cycling { .. } => None,
        }
    }

    pub fn elevation_gain_m(&self) -> Option<f64> {
        match self.details {
            WorkoutDetails::Cycling {
                elevation_gain_m, ..
            } => Some(elevation_gain_m),
            WorkoutDetails::Running { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn april_7() -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 4, 7, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn running_pace_is_duration_over_distance() {
        let w = Workout::running("1", april_7(), Coordinates::new(10.0, 20.0), 5.0, 30.0, 150.0);
        assert_eq!(w.pace_min_per_km(), Some(6.0));
        assert_eq!(w.speed_km_per_h(), None);
        assert_eq!(w.cadence_spm(), Some(150.0));
        assert_eq!(w.kind(), WorkoutKind::Running);
    }

    #[test]
    fn cycling_speed_is_km_per_hour() {
        let w = Workout::cycling("2", april_7(), Coordinates::new(10.0, 20.0), 20.0, 60.0, 100.0);
        assert_eq!(w.speed_km_per_h(), Some(20.0));
        assert_eq!(w.elevation_gain_m(), Some(100.0));
        assert_eq!(w.pace_min_per_km(), None);

        let odd = Workout::cycling("3", april_7(), Coordinates::new(0.0, 0.0), 7.3, 23.0, 0.0);
        assert_eq!(odd.speed_km_per_h(), Some(7.3 / (23.0 / 60.0)));
    }

    #[test]
    fn description_uses_kind_month_and_day() {
        let run = Workout::running("1", april_7(), Coordinates::new(0.0, 0.0), 1.0, 1.0, 1.0);
        assert_eq!(run.description(), "Running on April 7");
        let ride = Workout::cycling("2", april_7(), Coordinates::new(0.0, 0.0), 1.0, 1.0, 0.0);
        assert_eq!(ride.description(), "Cycling on April 7");
    }

    #[test]
    fn with_inputs_keeps_identity_and_recomputes() {
        let mut w = Workout::running("abc", april_7(), Coordinates::new(1.0, 2.0), 5.0, 30.0, 150.0);
        w.touch();
        let edited = w.with_inputs(10.0, 45.0, 170.0);
        assert_eq!(edited.id(), "abc");
        assert_eq!(edited.created_at(), w.created_at());
        assert_eq!(edited.coordinates(), w.coordinates());
        assert_eq!(edited.interaction_count(), 1);
        assert_eq!(edited.cadence_spm(), Some(170.0));
        assert_eq!(edited.pace_min_per_km(), Some(4.5));
    }

    #[test]
    fn touch_only_counts() {
        let mut w = Workout::cycling("1", april_7(), Coordinates::new(0.0, 0.0), 2.0, 4.0, 3.0);
        let before = w.clone();
        w.touch();
        w.touch();
        assert_eq!(w.interaction_count(), 2);
        assert_eq!(w.speed_km_per_h(), before.speed_km_per_h());
        assert_eq!(w.description(), before.description());
    }

    #[test]
    fn serializes_to_flat_record_shape() {
        let w = Workout::running("42", april_7(), Coordinates::new(10.0, 20.0), 5.0, 30.0, 150.0);
        let value = serde_json::to_value(&w).unwrap();
        assert_eq!(value["type"], "running");
        assert_eq!(value["coordinates"], serde_json::json!([10.0, 20.0]));
        assert_eq!(value["distanceKm"], 5.0);
        assert_eq!(value["durationMin"], 30.0);
        assert_eq!(value["cadenceSpm"], 150.0);
        assert_eq!(value["paceMinPerKm"], 6.0);
        assert_eq!(value["description"], "Running on April 7");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("speedKmPerH").is_none());
    }

    #[test]
    fn normalized_fills_missing_derived_fields() {
        let json = serde_json::json!({
            "id": "7",
            "createdAt": "2024-04-07T12:00:00Z",
            "coordinates": [1.0, 2.0],
            "distanceKm": 20.0,
            "durationMin": 30.0,
            "type": "cycling",
            "elevationGainM": 12.0
        });
        let w: Workout = serde_json::from_value(json).unwrap();
        assert_eq!(w.speed_km_per_h(), Some(0.0));
        let w = w.normalized();
        assert_eq!(w.speed_km_per_h(), Some(40.0));
        assert!(w.description().starts_with("Cycling on April"));
        assert_eq!(w.interaction_count(), 0);
    }
}
