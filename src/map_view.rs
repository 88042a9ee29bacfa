//! `egui` surfaces for the map and the workout list.
//!
//! The map is an `egui_plot` canvas in longitude/latitude space: x is the
//! longitude and y the latitude.

use egui_plot::{Legend, Line, MarkerShape, Plot, PlotBounds, PlotPoint, PlotPoints, Points, Text};

use crate::map::{Bounds, ListSurface, MapSurface, span_for_zoom};
use crate::render::{ListEntry, MarkerView, PolylineView};
use crate::workout::Coordinates;

/// Fitting never zooms in closer than this level.
const MAX_FIT_ZOOM: f64 = 17.0;
const FIT_PADDING: f64 = 0.1;
/// Fraction of the visible width within which a click selects a marker.
const PICK_RATIO: f64 = 0.015;

fn color(rgb: [u8; 3]) -> egui::Color32 {
    egui::Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

fn xy(c: Coordinates) -> [f64; 2] {
    [c.lng(), c.lat()]
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    Clicked(Coordinates),
    MarkerSelected(String),
}

#[derive(Default)]
pub struct MapCanvas {
    home: Option<Coordinates>,
    markers: Vec<MarkerView>,
    polylines: Vec<PolylineView>,
    requested: Option<Bounds>,
}

impl MapSurface for MapCanvas {
    fn set_view(&mut self, center: Coordinates, zoom: f64) {
        self.requested = Some(Bounds::around(center, span_for_zoom(zoom)));
    }

    fn place_home_marker(&mut self, at: Coordinates) {
        self.home = Some(at);
    }

    fn add_marker(&mut self, marker: &MarkerView) {
        self.markers.push(marker.clone());
    }

    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn add_polyline(&mut self, line: &PolylineView) {
        self.polylines.push(line.clone());
    }

    fn clear_polylines(&mut self) {
        self.polylines.clear();
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.requested = Some(bounds.padded(FIT_PADDING, span_for_zoom(MAX_FIT_ZOOM)));
    }
}

fn nearest_marker(pointer: PlotPoint, markers: &[MarkerView], radius: f64) -> Option<&MarkerView> {
    markers
        .iter()
        .map(|m| {
            let [x, y] = xy(m.position);
            (m, (x - pointer.x).powi(2) + (y - pointer.y).powi(2))
        })
        .filter(|(_, d)| *d <= radius * radius)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(m, _)| m)
}

impl MapCanvas {
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<MapEvent> {
        let requested = self.requested.take();
        let mut pointer: Option<PlotPoint> = None;
        let mut pick_radius = 0.0;

        let resp = Plot::new("workout_map")
            .data_aspect(1.0)
            .legend(Legend::default())
            .label_formatter(|name, value| {
                if name.is_empty() {
                    format!("{:.5}, {:.5}", value.y, value.x)
                } else {
                    format!("{name}\n{:.5}, {:.5}", value.y, value.x)
                }
            })
            .show(ui, |plot_ui| {
                if let Some(b) = requested {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        xy(b.south_west),
                        xy(b.north_east),
                    ));
                }
                pointer = plot_ui.pointer_coordinate();
                pick_radius = plot_ui.plot_bounds().width() * PICK_RATIO;

                for line in &self.polylines {
                    let pts: Vec<[f64; 2]> = line.points.iter().copied().map(xy).collect();
                    plot_ui.line(
                        Line::new(PlotPoints::from(pts))
                            .color(color(line.color))
                            .width(2.0)
                            .name(line.kind.label()),
                    );
                }
                if let Some(home) = self.home {
                    plot_ui.points(
                        Points::new(vec![xy(home)])
                            .shape(MarkerShape::Diamond)
                            .radius(7.0)
                            .color(egui::Color32::LIGHT_BLUE)
                            .name("You're here"),
                    );
                }
                for m in &self.markers {
                    let rgb = crate::render::kind_color(m.kind);
                    plot_ui.points(
                        Points::new(vec![xy(m.position)])
                            .shape(MarkerShape::Circle)
                            .radius(6.0)
                            .color(color(rgb))
                            .name(m.kind.label()),
                    );
                    let [x, y] = xy(m.position);
                    plot_ui.text(
                        Text::new(PlotPoint::new(x, y), m.popup.clone())
                            .anchor(egui::Align2::LEFT_BOTTOM)
                            .color(color(rgb)),
                    );
                }
            });

        if !resp.response.clicked() {
            return None;
        }
        let p = pointer?;
        match nearest_marker(p, &self.markers, pick_radius) {
            Some(m) => Some(MapEvent::MarkerSelected(m.workout_id.clone())),
            None => Some(MapEvent::Clicked(Coordinates::new(p.y, p.x))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    Focus(String),
    Edit(String),
    Delete(String),
}

/// Newest entry on top, like entries inserted just below the form.
#[derive(Default)]
pub struct ListPanel {
    entries: Vec<ListEntry>,
}

impl ListSurface for ListPanel {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn push_entry(&mut self, entry: &ListEntry) {
        self.entries.insert(0, entry.clone());
    }
}

impl ListPanel {
    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    pub fn show(&self, ui: &mut egui::Ui) -> Option<ListAction> {
        let mut action = None;
        if self.entries.is_empty() {
            ui.label("Click on the map to log a workout.");
            return None;
        }
        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in &self.entries {
                let accent = color(crate::render::kind_color(entry.kind));
                egui::Frame::group(ui.style())
                    .stroke(egui::Stroke::new(1.0, accent))
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            let title = egui::RichText::new(&entry.title).strong();
                            if ui.selectable_label(false, title).clicked() {
                                action = Some(ListAction::Focus(entry.workout_id.clone()));
                            }
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                if ui.small_button("Delete").clicked() {
                                    action = Some(ListAction::Delete(entry.workout_id.clone()));
                                }
                                if ui.small_button("Edit").clicked() {
                                    action = Some(ListAction::Edit(entry.workout_id.clone()));
                                }
                                ui.label(
                                    egui::RichText::new(format!("👁 {}", entry.interactions))
                                        .weak(),
                                )
                                .on_hover_text("Times focused");
                            });
                        });
                        ui.horizontal_wrapped(|ui| {
                            for row in &entry.rows {
                                ui.label(row.icon);
                                ui.label(egui::RichText::new(&row.value).strong());
                                ui.label(egui::RichText::new(row.unit).weak());
                                ui.add_space(8.0);
                            }
                        });
                    });
            }
        });
        action
    }
}
