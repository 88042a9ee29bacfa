//! The workout collection and everything kept in sync with it.
//!
//! [`Controller`] is the only owner of the collection. Every mutation is
//! followed by a full resync (see [`crate::render::render`]) and a write of
//! the whole collection to the key-value store. View updates are queued as
//! [`ViewCommand`]s and user-facing messages as [`Notice`]s; the shell drains
//! both once per frame.

use chrono::{DateTime, Utc};

use crate::error::{Field, InvalidField, TrackerError};
use crate::geolocation::GeolocationError;
use crate::map::Bounds;
use crate::render::{MarkerView, PolylineView, ViewCommand, render};
use crate::storage::{self, KeyValueStore};
use crate::workout::{Coordinates, Workout, WorkoutKind};

pub const DEFAULT_STORAGE_KEY: &str = "workouts";
pub const DEFAULT_ZOOM: f64 = 17.0;

const ID_MODULUS: i64 = 10_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coordinates,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// An action waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Delete { id: String },
}

/// Check create/edit inputs. Every failing field is reported.
pub fn validate_inputs(
    kind: WorkoutKind,
    distance_km: f64,
    duration_min: f64,
    extra: f64,
) -> Result<(), TrackerError> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    let mut invalid = Vec::new();
    if !positive(distance_km) {
        invalid.push(InvalidField {
            field: Field::Distance,
            value: distance_km,
        });
    }
    if !positive(duration_min) {
        invalid.push(InvalidField {
            field: Field::Duration,
            value: duration_min,
        });
    }
    match kind {
        WorkoutKind::Running if !positive(extra) => invalid.push(InvalidField {
            field: Field::Cadence,
            value: extra,
        }),
        WorkoutKind::Cycling if !(extra.is_finite() && extra >= 0.0) => {
            invalid.push(InvalidField {
                field: Field::ElevationGain,
                value: extra,
            })
        }
        _ => {}
    }
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(TrackerError::Validation(invalid))
    }
}

pub struct Controller<S> {
    workouts: Vec<Workout>,
    markers: Vec<MarkerView>,
    polylines: Vec<PolylineView>,
    map: Option<Viewport>,
    store: S,
    storage_key: String,
    zoom: f64,
    pending: Option<PendingAction>,
    outbox: Vec<ViewCommand>,
    notices: Vec<Notice>,
    /// In-memory changes not yet written to the store.
    unsaved: bool,
}

impl<S: KeyValueStore> Controller<S> {
    pub fn new(store: S) -> Self {
        Self {
            workouts: Vec::new(),
            markers: Vec::new(),
            polylines: Vec::new(),
            map: None,
            store,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            zoom: DEFAULT_ZOOM,
            pending: None,
            outbox: Vec::new(),
            notices: Vec::new(),
            unsaved: false,
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn get(&self, id: &str) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id() == id)
    }

    #[cfg(test)]
    pub fn markers(&self) -> &[MarkerView] {
        &self.markers
    }

    pub fn polylines(&self) -> &[PolylineView] {
        &self.polylines
    }

    pub fn is_map_ready(&self) -> bool {
        self.map.is_some()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn take_commands(&mut self) -> Vec<ViewCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Log an operation error and queue it for the user.
    pub fn report(&mut self, err: &TrackerError) {
        let level = match err {
            TrackerError::Validation(_) | TrackerError::NotFound(_) => {
                log::warn!("{err}");
                NoticeLevel::Warning
            }
            TrackerError::Storage(_) | TrackerError::GeolocationUnavailable(_) => {
                log::error!("{err}");
                NoticeLevel::Error
            }
        };
        self.notify(level, err.to_string());
    }

    fn index_of(&self, id: &str) -> Result<usize, TrackerError> {
        self.workouts
            .iter()
            .position(|w| w.id() == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    /// Ten digits from the creation time, bumped past ids already in use.
    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut n = now.timestamp_millis().rem_euclid(ID_MODULUS);
        loop {
            let id = format!("{n:010}");
            if self.get(&id).is_none() {
                return id;
            }
            n = (n + 1) % ID_MODULUS;
        }
    }

    pub fn create_workout(
        &mut self,
        kind: WorkoutKind,
        coordinates: Coordinates,
        distance_km: f64,
        duration_min: f64,
        extra: f64,
    ) -> Result<String, TrackerError> {
        validate_inputs(kind, distance_km, duration_min, extra)?;
        let created_at = Utc::now();
        let id = self.next_id(created_at);
        let workout = Workout::new(
            kind,
            id.clone(),
            created_at,
            coordinates,
            distance_km,
            duration_min,
            extra,
        );
        log::info!("Created workout {id}: {}", workout.description());
        self.workouts.push(workout);
        self.resync();
        self.persist();
        Ok(id)
    }

    /// Replace the record in place with one built from the new inputs.
    pub fn edit_workout(
        &mut self,
        id: &str,
        distance_km: f64,
        duration_min: f64,
        extra: f64,
    ) -> Result<(), TrackerError> {
        let index = self.index_of(id)?;
        let kind = self.workouts[index].kind();
        validate_inputs(kind, distance_km, duration_min, extra)?;
        let replacement = self.workouts[index].with_inputs(distance_km, duration_min, extra);
        self.workouts[index] = replacement;
        log::info!("Edited workout {id}");
        self.resync();
        self.persist();
        Ok(())
    }

    /// Remove the workout with `id`, looking its position up at call time.
    pub fn delete_workout(&mut self, id: &str) -> Result<Workout, TrackerError> {
        let index = self.index_of(id)?;
        let removed = self.workouts.remove(index);
        if self.pending == Some(PendingAction::Delete { id: id.to_string() }) {
            self.pending = None;
        }
        log::info!("Deleted workout {id}");
        self.resync();
        self.persist();
        Ok(removed)
    }

    /// Ask for confirmation before deleting `id`.
    pub fn request_delete(&mut self, id: &str) -> Result<(), TrackerError> {
        self.index_of(id)?;
        self.pending = Some(PendingAction::Delete { id: id.to_string() });
        Ok(())
    }

    /// Answer the pending confirmation. Returns the removed workout when a
    /// deletion was confirmed.
    pub fn resolve_pending(&mut self, confirmed: bool) -> Result<Option<Workout>, TrackerError> {
        match self.pending.take() {
            Some(PendingAction::Delete { id }) if confirmed => self.delete_workout(&id).map(Some),
            Some(PendingAction::Delete { id }) => {
                log::info!("Deletion of {id} cancelled");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn delete_all(&mut self) {
        log::info!("Deleting all {} workouts", self.workouts.len());
        self.workouts.clear();
        self.pending = None;
        self.resync();
        self.persist();
    }

    /// Drop the stored collection entirely and start empty.
    pub fn reset(&mut self) -> Result<(), TrackerError> {
        self.store.remove(&self.storage_key)?;
        self.workouts.clear();
        self.pending = None;
        self.unsaved = false;
        self.resync();
        log::info!("Storage key {} removed", self.storage_key);
        Ok(())
    }

    /// Replace the collection with the stored one.
    ///
    /// Absent data is an empty collection. Unreadable data also leaves the
    /// collection empty but is returned as an error.
    pub fn load_from_storage(&mut self) -> Result<usize, TrackerError> {
        let loaded = storage::load_workouts(&self.store, &self.storage_key);
        self.pending = None;
        // Nothing to write back either way: the store holds what was read.
        self.unsaved = false;
        match loaded {
            Ok(workouts) => {
                self.workouts = workouts;
                log::info!("Loaded {} workouts", self.workouts.len());
                self.resync();
                Ok(self.workouts.len())
            }
            Err(e) => {
                self.workouts.clear();
                self.resync();
                Err(e.into())
            }
        }
    }

    pub fn save_to_storage(&mut self) -> Result<(), TrackerError> {
        storage::save_workouts(&mut self.store, &self.storage_key, &self.workouts)?;
        self.unsaved = false;
        Ok(())
    }

    /// Whether the collection changed since it was last loaded or saved.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Save only when something changed, so an unreadable stored
    /// collection is never replaced by the empty one it loaded as.
    pub fn save_if_unsaved(&mut self) -> Result<bool, TrackerError> {
        if !self.unsaved {
            return Ok(false);
        }
        self.save_to_storage()?;
        Ok(true)
    }

    fn persist(&mut self) {
        self.unsaved = true;
        if let Err(e) = self.save_to_storage() {
            log::error!("Failed to save workouts: {e}");
            self.notify(
                NoticeLevel::Warning,
                format!("{e}. Changes are kept for this session only."),
            );
        }
    }

    fn resync(&mut self) {
        let commands = render(&self.workouts);
        self.markers.clear();
        self.polylines.clear();
        for command in &commands {
            match command {
                ViewCommand::AddMarker(m) => self.markers.push(m.clone()),
                ViewCommand::DrawPolyline(l) => self.polylines.push(l.clone()),
                _ => {}
            }
        }
        let map_ready = self.map.is_some();
        self.outbox
            .extend(commands.into_iter().filter(|c| map_ready || !c.targets_map()));
    }

    /// Rebuild only the list, e.g. after an interaction count changed.
    fn refresh_list(&mut self) {
        self.outbox
            .extend(render(&self.workouts).into_iter().filter(|c| !c.targets_map()));
    }

    /// Initialize the map at the user's position and replay every workout.
    pub fn on_position(&mut self, position: Coordinates) {
        log::info!(
            "Position acquired: {:.5}, {:.5}",
            position.lat(),
            position.lng()
        );
        self.map = Some(Viewport {
            center: position,
            zoom: self.zoom,
        });
        self.outbox.push(ViewCommand::SetView {
            center: position,
            zoom: self.zoom,
        });
        self.outbox.push(ViewCommand::PlaceHomeMarker(position));
        self.resync();
    }

    /// The map stays uninitialized; list operations keep working.
    pub fn on_position_error(&mut self, err: GeolocationError) {
        let err = TrackerError::from(err);
        self.report(&err);
    }

    /// Pan and zoom to a workout. No-op without a map or for unknown ids.
    pub fn focus_workout(&mut self, id: &str) {
        if self.map.is_none() {
            return;
        }
        let Some(workout) = self.workouts.iter_mut().find(|w| w.id() == id) else {
            return;
        };
        workout.touch();
        let center = workout.coordinates();
        self.unsaved = true;
        self.refresh_list();
        self.map = Some(Viewport {
            center,
            zoom: self.zoom,
        });
        self.outbox.push(ViewCommand::SetView {
            center,
            zoom: self.zoom,
        });
    }

    /// Fit the viewport around every marker. No-op without a map or markers.
    pub fn fit_all_markers(&mut self) -> Option<Bounds> {
        let viewport = self.map?;
        let bounds = Bounds::covering(self.markers.iter().map(|m| m.position))?;
        self.map = Some(Viewport {
            center: bounds.center(),
            zoom: viewport.zoom,
        });
        self.outbox.push(ViewCommand::FitBounds(bounds));
        Some(bounds)
    }
}
