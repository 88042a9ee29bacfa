//! Capability set the core expects from a map and a list view.

use crate::render::{ListEntry, MarkerView, PolylineView, ViewCommand};
use crate::workout::Coordinates;

/// Width in degrees of longitude visible at a web-map zoom level.
pub fn span_for_zoom(zoom: f64) -> f64 {
    360.0 / 2f64.powf(zoom)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl Bounds {
    /// Smallest box containing every point, `None` for no points.
    pub fn covering<I: IntoIterator<Item = Coordinates>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut south, mut west, mut north, mut east) =
            (first.lat(), first.lng(), first.lat(), first.lng());
        for p in iter {
            south = south.min(p.lat());
            north = north.max(p.lat());
            west = west.min(p.lng());
            east = east.max(p.lng());
        }
        Some(Self {
            south_west: Coordinates::new(south, west),
            north_east: Coordinates::new(north, east),
        })
    }

    /// Square box of side `span` centred on `center`.
    pub fn around(center: Coordinates, span: f64) -> Self {
        let half = span / 2.0;
        Self {
            south_west: Coordinates::new(center.lat() - half, center.lng() - half),
            north_east: Coordinates::new(center.lat() + half, center.lng() + half),
        }
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.south_west.lat() + self.north_east.lat()) / 2.0,
            (self.south_west.lng() + self.north_east.lng()) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.north_east.lng() - self.south_west.lng()
    }

    pub fn height(&self) -> f64 {
        self.north_east.lat() - self.south_west.lat()
    }

    /// Grow each side by `ratio` of the box, and to at least `min_span`.
    pub fn padded(&self, ratio: f64, min_span: f64) -> Self {
        let center = self.center();
        let width = (self.width() * (1.0 + 2.0 * ratio)).max(min_span);
        let height = (self.height() * (1.0 + 2.0 * ratio)).max(min_span);
        Self {
            south_west: Coordinates::new(center.lat() - height / 2.0, center.lng() - width / 2.0),
            north_east: Coordinates::new(center.lat() + height / 2.0, center.lng() + width / 2.0),
        }
    }
}

pub trait MapSurface {
    fn set_view(&mut self, center: Coordinates, zoom: f64);
    fn place_home_marker(&mut self, at: Coordinates);
    fn add_marker(&mut self, marker: &MarkerView);
    fn clear_markers(&mut self);
    fn add_polyline(&mut self, line: &PolylineView);
    fn clear_polylines(&mut self);
    fn fit_bounds(&mut self, bounds: Bounds);
}

pub trait ListSurface {
    fn clear(&mut self);
    fn push_entry(&mut self, entry: &ListEntry);
}

pub fn apply_commands<M, L>(commands: &[ViewCommand], map: &mut M, list: &mut L)
where
    M: MapSurface + ?Sized,
    L: ListSurface + ?Sized,
{
    for command in commands {
        match command {
            ViewCommand::ClearList => list.clear(),
            ViewCommand::AddListEntry(entry) => list.push_entry(entry),
            ViewCommand::ClearMarkers => map.clear_markers(),
            ViewCommand::AddMarker(marker) => map.add_marker(marker),
            ViewCommand::ClearPolylines => map.clear_polylines(),
            ViewCommand::DrawPolyline(line) => map.add_polyline(line),
            ViewCommand::SetView { center, zoom } => map.set_view(*center, *zoom),
            ViewCommand::PlaceHomeMarker(at) => map.place_home_marker(*at),
            ViewCommand::FitBounds(bounds) => map.fit_bounds(*bounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::WorkoutKind;

    #[derive(Default)]
    struct Recorder {
        markers: Vec<String>,
        lines: usize,
        view: Option<(Coordinates, f64)>,
        fitted: Option<Bounds>,
        entries: Vec<String>,
    }

    impl MapSurface for Recorder {
        fn set_view(&mut self, center: Coordinates, zoom: f64) {
            self.view = Some((center, zoom));
        }
        fn place_home_marker(&mut self, _at: Coordinates) {}
        fn add_marker(&mut self, marker: &MarkerView) {
            self.markers.push(marker.workout_id.clone());
        }
        fn clear_markers(&mut self) {
            self.markers.clear();
        }
        fn add_polyline(&mut self, _line: &PolylineView) {
            self.lines += 1;
        }
        fn clear_polylines(&mut self) {
            self.lines = 0;
        }
        fn fit_bounds(&mut self, bounds: Bounds) {
            self.fitted = Some(bounds);
        }
    }

    impl ListSurface for Recorder {
        fn clear(&mut self) {
            self.entries.clear();
        }
        fn push_entry(&mut self, entry: &ListEntry) {
            self.entries.push(entry.workout_id.clone());
        }
    }

    fn marker(id: &str) -> MarkerView {
        MarkerView {
            workout_id: id.into(),
            kind: WorkoutKind::Running,
            position: Coordinates::new(0.0, 0.0),
            popup: String::new(),
            popup_class: "running-popup".into(),
        }
    }

    #[test]
    fn covering_spans_all_points() {
        let b = Bounds::covering([
            Coordinates::new(10.0, 20.0),
            Coordinates::new(-5.0, 25.0),
            Coordinates::new(3.0, 18.0),
        ])
        .unwrap();
        assert_eq!(b.south_west, Coordinates::new(-5.0, 18.0));
        assert_eq!(b.north_east, Coordinates::new(10.0, 25.0));
        assert_eq!(b.center(), Coordinates::new(2.5, 21.5));
        assert_eq!(b.width(), 7.0);
        assert_eq!(b.height(), 15.0);
    }

    #[test]
    fn covering_nothing_is_none() {
        assert_eq!(Bounds::covering(Vec::<Coordinates>::new()), None);
    }

    #[test]
    fn padded_single_point_gets_min_span() {
        let b = Bounds::covering([Coordinates::new(1.0, 2.0)]).unwrap();
        let p = b.padded(0.1, 0.01);
        assert!((p.width() - 0.01).abs() < 1e-12);
        assert!((p.height() - 0.01).abs() < 1e-12);
        assert!((p.center().lat() - 1.0).abs() < 1e-9);
        assert!((p.center().lng() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_halves_span() {
        assert_eq!(span_for_zoom(0.0), 360.0);
        assert_eq!(span_for_zoom(1.0), 180.0);
        assert!(span_for_zoom(17.0) < 0.003);
    }

    #[test]
    fn apply_routes_each_command() {
        let mut map = Recorder::default();
        let mut list = Recorder::default();
        let center = Coordinates::new(4.0, 5.0);
        let commands = vec![
            ViewCommand::AddMarker(marker("a")),
            ViewCommand::ClearMarkers,
            ViewCommand::AddMarker(marker("b")),
            ViewCommand::SetView { center, zoom: 13.0 },
            ViewCommand::FitBounds(Bounds::around(center, 1.0)),
        ];
        apply_commands(&commands, &mut map, &mut list);
        assert_eq!(map.markers, ["b"]);
        assert_eq!(map.view, Some((center, 13.0)));
        assert!(map.fitted.is_some());
        assert!(list.entries.is_empty());
    }
}
