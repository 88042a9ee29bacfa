//! Full resync of the map and list views from the workout collection.
//!
//! [`render`] is pure: it turns the current collection into the sequence of
//! [`ViewCommand`]s that rebuilds every view from scratch. The controller
//! decides which of them reach the surfaces.

use crate::map::Bounds;
use crate::workout::{Coordinates, Workout, WorkoutKind};

/// One map marker per workout.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub workout_id: String,
    pub kind: WorkoutKind,
    pub position: Coordinates,
    pub popup: String,
    pub popup_class: String,
}

/// A line through the coordinates of every workout of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineView {
    pub kind: WorkoutKind,
    pub points: Vec<Coordinates>,
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

/// One entry of the workout list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub workout_id: String,
    pub kind: WorkoutKind,
    pub title: String,
    pub rows: Vec<DetailRow>,
    /// How often the workout was focused from the map or the list.
    pub interactions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    ClearList,
    AddListEntry(ListEntry),
    ClearMarkers,
    AddMarker(MarkerView),
    ClearPolylines,
    DrawPolyline(PolylineView),
    SetView { center: Coordinates, zoom: f64 },
    PlaceHomeMarker(Coordinates),
    FitBounds(Bounds),
}

impl ViewCommand {
    /// Whether the command needs an initialized map.
    pub fn targets_map(&self) -> bool {
        !matches!(self, ViewCommand::ClearList | ViewCommand::AddListEntry(_))
    }
}

pub fn kind_color(kind: WorkoutKind) -> [u8; 3] {
    match kind {
        WorkoutKind::Running => [0x00, 0xc4, 0x6a],
        WorkoutKind::Cycling => [0xff, 0xb5, 0x45],
    }
}

/// Plain numbers print without a trailing `.0`; derived metrics use one decimal.
fn plain(value: f64) -> String {
    format!("{value}")
}

fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

pub fn marker_for(workout: &Workout) -> MarkerView {
    let kind = workout.kind();
    MarkerView {
        workout_id: workout.id().to_string(),
        kind,
        position: workout.coordinates(),
        popup: format!("{} {}", kind.icon(), workout.description()),
        popup_class: format!("{}-popup", kind.as_str()),
    }
}

pub fn list_entry_for(workout: &Workout) -> ListEntry {
    let kind = workout.kind();
    let mut rows = vec![
        DetailRow {
            icon: kind.icon(),
            value: plain(workout.distance_km()),
            unit: "km",
        },
        DetailRow {
            icon: "⏱",
            value: plain(workout.duration_min()),
            unit: "min",
        },
    ];
    match kind {
        WorkoutKind::Running => {
            rows.push(DetailRow {
                icon: "⚡️",
                value: one_decimal(workout.pace_min_per_km().unwrap_or_default()),
                unit: "min/km",
            });
            rows.push(DetailRow {
                icon: "🦶🏼",
                value: plain(workout.extra()),
                unit: "spm",
            });
        }
        WorkoutKind::Cycling => {
            rows.push(DetailRow {
                icon: "⚡️",
                value: one_decimal(workout.speed_km_per_h().unwrap_or_default()),
                unit: "km/h",
            });
            rows.push(DetailRow {
                icon: "⛰",
                value: plain(workout.extra()),
                unit: "m",
            });
        }
    }
    ListEntry {
        workout_id: workout.id().to_string(),
        kind,
        title: workout.description().to_string(),
        rows,
        interactions: workout.interaction_count(),
    }
}

/// Partition coordinates by kind, keeping collection order within a group.
/// Empty groups produce no polyline.
pub fn polylines_for(workouts: &[Workout]) -> Vec<PolylineView> {
    let mut lines: Vec<PolylineView> = Vec::new();
    for kind in crate::workout::ALL_KINDS {
        let points: Vec<Coordinates> = workouts
            .iter()
            .filter(|w| w.kind() == kind)
            .map(|w| w.coordinates())
            .collect();
        if !points.is_empty() {
            lines.push(PolylineView {
                kind,
                points,
                color: kind_color(kind),
            });
        }
    }
    lines
}

pub fn render(workouts: &[Workout]) -> Vec<ViewCommand> {
    let mut commands = vec![
        ViewCommand::ClearList,
        ViewCommand::ClearMarkers,
        ViewCommand::ClearPolylines,
    ];
    for w in workouts {
        commands.push(ViewCommand::AddMarker(marker_for(w)));
        commands.push(ViewCommand::AddListEntry(list_entry_for(w)));
    }
    commands.extend(polylines_for(workouts).into_iter().map(ViewCommand::DrawPolyline));
    commands
}
