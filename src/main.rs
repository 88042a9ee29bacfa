//! Main application logic and persistent user settings.

use dirs_next as dirs;
use eframe::{App, Frame, NativeOptions, egui};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use log::info;

mod controller;
use controller::{Controller, DEFAULT_STORAGE_KEY, DEFAULT_ZOOM, Notice, NoticeLevel, PendingAction};
mod error;
mod export;
use export::{save_workouts_csv, save_workouts_json};
mod form;
use form::WorkoutForm;
mod geolocation;
use geolocation::{
    FixedLocation, GeolocationError, IP_API_URL, IpGeolocation, locate_in_background,
    resolve_fixed_location,
};
mod map;
use map::apply_commands;
mod map_view;
use map_view::{ListAction, ListPanel, MapCanvas, MapEvent};
mod render;
mod report;
use report::export_html_log;
mod storage;
use storage::{DirStore, KeyValueStore, MemoryStore, resolve_data_dir};
mod workout;
use workout::{ALL_KINDS, Coordinates};

const TOAST_DURATION: Duration = Duration::from_secs(4);

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_geolocation_url() -> String {
    IP_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

/// Persistent configuration for the map, storage and geolocation.
///
/// The values are serialized to a JSON file in the user's config directory.
/// Every field has a serde default so older or partial files still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Settings {
    #[serde(default = "default_zoom")]
    map_zoom_level: f64,
    /// Key the workout collection is stored under.
    #[serde(default = "default_storage_key")]
    storage_key: String,
    #[serde(default = "default_geolocation_url")]
    geolocation_url: String,
    /// Skip the geolocation service and start the map here.
    #[serde(default)]
    fixed_location: Option<Coordinates>,
    #[serde(default)]
    data_dir: Option<String>,
    #[serde(default = "default_true")]
    show_list: bool,
    #[serde(default)]
    last_export_dir: Option<String>,
}

impl Settings {
    const FILE: &'static str = "workout_mapper_settings.json";

    fn path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings from the JSON configuration file, falling back to the
    /// defaults when the file is missing or unreadable.
    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring invalid settings file {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(self) {
                Ok(data) => {
                    if let Err(e) = std::fs::write(&path, data) {
                        log::error!("Failed to save settings: {e}");
                    }
                }
                Err(e) => log::error!("Failed to serialize settings: {e}"),
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_zoom_level: DEFAULT_ZOOM,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            geolocation_url: IP_API_URL.to_string(),
            fixed_location: None,
            data_dir: None,
            show_list: true,
            last_export_dir: None,
        }
    }
}

fn open_store(settings: &Settings) -> Box<dyn KeyValueStore> {
    match resolve_data_dir(settings.data_dir.as_deref()) {
        Some(dir) => {
            info!("Storing workouts in {}", dir.display());
            Box::new(DirStore::new(dir))
        }
        None => {
            log::warn!("No data directory available; workouts will not survive a restart");
            Box::new(MemoryStore::new())
        }
    }
}

fn request_position(settings: &Settings) -> Receiver<Result<Coordinates, GeolocationError>> {
    match resolve_fixed_location(settings.fixed_location) {
        Some(pos) => locate_in_background(FixedLocation(pos)),
        None => locate_in_background(IpGeolocation::new(settings.geolocation_url.clone())),
    }
}

/// What the form window is currently for.
#[derive(Debug, Clone, PartialEq)]
enum FormTarget {
    New(Coordinates),
    Edit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Csv,
    Html,
}

impl ExportFormat {
    fn from_path(path: &std::path::Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("csv") => ExportFormat::Csv,
            Some("html") | Some("htm") => ExportFormat::Html,
            _ => ExportFormat::Json,
        }
    }
}

struct MapApp {
    controller: Controller<Box<dyn KeyValueStore>>,
    settings: Settings,
    settings_dirty: bool,
    map: MapCanvas,
    list: ListPanel,
    form: WorkoutForm,
    form_target: Option<FormTarget>,
    position_rx: Option<Receiver<Result<Coordinates, GeolocationError>>>,
    toasts: Vec<(Notice, Instant)>,
    show_settings: bool,
    confirm_delete_all: bool,
}

impl MapApp {
    fn new(settings: Settings, store: Box<dyn KeyValueStore>) -> Self {
        let mut controller = Controller::new(store)
            .with_storage_key(settings.storage_key.clone())
            .with_zoom(settings.map_zoom_level);
        match controller.load_from_storage() {
            Ok(n) => info!("Restored {n} workouts"),
            Err(e) => controller.report(&e),
        }
        let mut app = Self {
            controller,
            settings,
            settings_dirty: false,
            map: MapCanvas::default(),
            list: ListPanel::default(),
            form: WorkoutForm::default(),
            form_target: None,
            position_rx: None,
            toasts: Vec::new(),
            show_settings: false,
            confirm_delete_all: false,
        };
        app.flush_controller();
        app
    }

    /// Apply queued view commands and collect queued notices.
    fn flush_controller(&mut self) {
        let commands = self.controller.take_commands();
        apply_commands(&commands, &mut self.map, &mut self.list);
        let now = Instant::now();
        for notice in self.controller.take_notices() {
            self.toasts.push((notice, now));
        }
    }

    fn poll_position(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.position_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(pos)) => {
                self.controller.on_position(pos);
                self.position_rx = None;
            }
            Ok(Err(e)) => {
                self.controller.on_position_error(e);
                self.position_rx = None;
            }
            Err(TryRecvError::Empty) => ctx.request_repaint_after(Duration::from_millis(100)),
            Err(TryRecvError::Disconnected) => self.position_rx = None,
        }
    }

    /// Close the edit form once its workout is gone.
    fn close_stale_form(&mut self) {
        if let Some(FormTarget::Edit(id)) = &self.form_target {
            if self.controller.get(id).is_none() {
                self.form.clear();
                self.form_target = None;
            }
        }
    }

    fn resolve_delete(&mut self, confirmed: bool) {
        if let Err(e) = self.controller.resolve_pending(confirmed) {
            self.controller.report(&e);
        }
        self.close_stale_form();
    }

    fn open_edit(&mut self, id: &str) {
        if let Some(w) = self.controller.get(id) {
            self.form = WorkoutForm::for_workout(w);
            self.form_target = Some(FormTarget::Edit(id.to_string()));
        }
    }

    /// Submit the form. The form stays open when the input is rejected.
    fn submit_form(&mut self) {
        let Some(target) = self.form_target.clone() else {
            return;
        };
        let inputs = self.form.inputs();
        let result = match &target {
            FormTarget::New(at) => self
                .controller
                .create_workout(inputs.kind, *at, inputs.distance_km, inputs.duration_min, inputs.extra)
                .map(|_| ()),
            FormTarget::Edit(id) => self.controller.edit_workout(
                id,
                inputs.distance_km,
                inputs.duration_min,
                inputs.extra,
            ),
        };
        match result {
            Ok(()) => {
                self.form.clear();
                self.form_target = None;
            }
            Err(e) => self.controller.report(&e),
        }
    }

    fn handle_list_action(&mut self, action: ListAction) {
        match action {
            ListAction::Focus(id) => self.controller.focus_workout(&id),
            ListAction::Edit(id) => self.open_edit(&id),
            ListAction::Delete(id) => {
                if let Err(e) = self.controller.request_delete(&id) {
                    self.controller.report(&e);
                }
            }
        }
    }

    fn handle_map_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::Clicked(at) => {
                if !matches!(self.form_target, Some(FormTarget::Edit(_))) {
                    self.form_target = Some(FormTarget::New(at));
                }
            }
            MapEvent::MarkerSelected(id) => self.controller.focus_workout(&id),
        }
    }

    fn export(&mut self) {
        let mut dialog = FileDialog::new()
            .add_filter("JSON", &["json"])
            .add_filter("CSV", &["csv"])
            .add_filter("HTML", &["html"]);
        if let Some(dir) = &self.settings.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        let workouts = self.controller.workouts();
        let result = match ExportFormat::from_path(&path) {
            ExportFormat::Csv => save_workouts_csv(&path, workouts).map_err(|e| e.to_string()),
            ExportFormat::Html => export_html_log(&path, workouts).map_err(|e| e.to_string()),
            ExportFormat::Json => save_workouts_json(&path, workouts).map_err(|e| e.to_string()),
        };
        match result {
            Ok(()) => {
                info!("Exported {} workouts to {}", workouts.len(), path.display());
                self.controller
                    .notify(NoticeLevel::Info, format!("Exported to {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to export workouts: {e}");
                self.controller
                    .notify(NoticeLevel::Error, format!("Export failed: {e}"));
            }
        }
        if let Some(parent) = path.parent() {
            self.settings.last_export_dir = Some(parent.display().to_string());
            self.settings_dirty = true;
        }
    }

    fn form_window(&mut self, ctx: &egui::Context) {
        let Some(target) = self.form_target.clone() else {
            return;
        };
        let title = match target {
            FormTarget::New(_) => "New workout",
            FormTarget::Edit(_) => "Edit workout",
        };
        let mut submit = false;
        let mut cancel = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("workout_form").num_columns(2).show(ui, |ui| {
                    ui.label("Type");
                    match target {
                        FormTarget::New(_) => {
                            egui::ComboBox::from_id_source("workout_kind")
                                .selected_text(self.form.kind.label())
                                .show_ui(ui, |ui| {
                                    for kind in ALL_KINDS {
                                        ui.selectable_value(&mut self.form.kind, kind, kind.label());
                                    }
                                });
                        }
                        FormTarget::Edit(_) => {
                            ui.label(self.form.kind.label());
                        }
                    }
                    ui.end_row();
                    ui.label("Distance (km)");
                    ui.text_edit_singleline(&mut self.form.distance);
                    ui.end_row();
                    ui.label("Duration (min)");
                    ui.text_edit_singleline(&mut self.form.duration);
                    ui.end_row();
                    if self.form.shows_cadence() {
                        ui.label("Cadence (step/min)");
                        ui.text_edit_singleline(&mut self.form.cadence);
                        ui.end_row();
                    }
                    if self.form.shows_elevation() {
                        ui.label("Elev gain (m)");
                        ui.text_edit_singleline(&mut self.form.elevation);
                        ui.end_row();
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        submit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }
            });
        if cancel {
            self.form.clear();
            self.form_target = None;
        } else if submit {
            self.submit_form();
        }
    }

    fn confirm_window(&mut self, ctx: &egui::Context) {
        let Some(PendingAction::Delete { id }) = self.controller.pending().cloned() else {
            return;
        };
        let description = self
            .controller
            .get(&id)
            .map(|w| w.description().to_string())
            .unwrap_or_else(|| id.clone());
        let mut answer = None;
        egui::Window::new("Delete workout")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("Delete \"{description}\"?"));
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });
        if let Some(confirmed) = answer {
            self.resolve_delete(confirmed);
        }
    }

    fn delete_all_window(&mut self, ctx: &egui::Context) {
        if !self.confirm_delete_all {
            return;
        }
        let mut answer = None;
        egui::Window::new("Delete all workouts")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Delete all {} workouts?",
                    self.controller.workouts().len()
                ));
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });
        if let Some(confirmed) = answer {
            if confirmed {
                self.controller.delete_all();
                self.close_stale_form();
            }
            self.confirm_delete_all = false;
        }
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Map zoom level");
                    if ui
                        .add(
                            egui::DragValue::new(&mut self.settings.map_zoom_level)
                                .clamp_range(1.0..=19.0)
                                .speed(0.1),
                        )
                        .changed()
                    {
                        self.controller.set_zoom(self.settings.map_zoom_level);
                        self.settings_dirty = true;
                    }
                });
                if ui
                    .checkbox(&mut self.settings.show_list, "Show workout list")
                    .changed()
                {
                    self.settings_dirty = true;
                }
                ui.separator();
                ui.label(format!("Storage key: {}", self.settings.storage_key));
                ui.label(format!("Geolocation: {}", self.settings.geolocation_url));
            });
        self.show_settings = open;
    }

    fn toasts(&mut self, ctx: &egui::Context) {
        self.toasts.retain(|(_, at)| at.elapsed() < TOAST_DURATION);
        if self.toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
            .show(ctx, |ui| {
                for (notice, _) in &self.toasts {
                    let color = match notice.level {
                        NoticeLevel::Info => ui.visuals().text_color(),
                        NoticeLevel::Warning => egui::Color32::from_rgb(0xff, 0xb5, 0x45),
                        NoticeLevel::Error => ui.visuals().error_fg_color,
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.colored_label(color, notice.message.as_str());
                    });
                }
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl App for MapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_position(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                    if ui.button("Export Workouts").clicked() {
                        self.export();
                        ui.close_menu();
                    }
                    if ui.button("Reset Storage").clicked() {
                        if let Err(e) = self.controller.reset() {
                            self.controller.report(&e);
                        }
                        self.close_stale_form();
                        ui.close_menu();
                    }
                });
                ui.separator();
                let map_ready = self.controller.is_map_ready();
                if ui
                    .add_enabled(map_ready, egui::Button::new("Fit all markers"))
                    .clicked()
                {
                    self.controller.fit_all_markers();
                }
                if ui
                    .add_enabled(
                        !self.controller.workouts().is_empty(),
                        egui::Button::new("Delete all"),
                    )
                    .clicked()
                {
                    self.confirm_delete_all = true;
                }
                if ui.button("Toggle list").clicked() {
                    self.settings.show_list = !self.settings.show_list;
                    self.settings_dirty = true;
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "{} workouts, {} on map, {} routes",
                        self.list.entries().len(),
                        self.map.marker_count(),
                        self.controller.polylines().len()
                    ));
                });
            });
        });

        if self.settings.show_list {
            let mut action = None;
            egui::SidePanel::left("workout_list")
                .resizable(true)
                .default_width(320.0)
                .show(ctx, |ui| {
                    ui.heading("Workouts");
                    ui.separator();
                    action = self.list.show(ui);
                });
            if let Some(action) = action {
                self.handle_list_action(action);
            }
        }

        let mut event = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.controller.is_map_ready() {
                event = self.map.show(ui);
            } else if self.position_rx.is_some() {
                ui.centered_and_justified(|ui| ui.label("Locating you..."));
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("Map unavailable: your position could not be determined.")
                });
            }
        });
        if let Some(event) = event {
            self.handle_map_event(event);
        }

        self.form_window(ctx);
        self.confirm_window(ctx);
        self.delete_all_window(ctx);
        self.settings_window(ctx);

        self.flush_controller();
        self.toasts(ctx);

        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
        match self.controller.save_if_unsaved() {
            Ok(true) => info!("Saved workouts on exit"),
            Ok(false) => {}
            Err(e) => log::error!("Failed to save workouts on exit: {e}"),
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let settings = Settings::load();
    let store = open_store(&settings);
    let mut app = MapApp::new(settings, store);
    app.position_rx = Some(request_position(&app.settings));
    let options = NativeOptions::default();
    eframe::run_native(
        "Workout Mapper",
        options,
        Box::new(|_cc| Box::new(app)),
    )
}
