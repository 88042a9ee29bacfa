use crate::workout::Workout;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

/// One flat CSV row; fields that do not apply to the kind stay empty.
#[derive(Serialize)]
struct WorkoutRow<'a> {
    id: &'a str,
    created_at: String,
    kind: &'static str,
    description: &'a str,
    lat: f64,
    lng: f64,
    distance_km: f64,
    duration_min: f64,
    cadence_spm: Option<f64>,
    pace_min_per_km: Option<f64>,
    elevation_gain_m: Option<f64>,
    speed_km_per_h: Option<f64>,
}

impl<'a> From<&'a Workout> for WorkoutRow<'a> {
    fn from(w: &'a Workout) -> Self {
        Self {
            id: w.id(),
            created_at: w.created_at().to_rfc3339(),
            kind: w.kind().as_str(),
            description: w.description(),
            lat: w.coordinates().lat(),
            lng: w.coordinates().lng(),
            distance_km: w.distance_km(),
            duration_min: w.duration_min(),
            cadence_spm: w.cadence_spm(),
            pace_min_per_km: w.pace_min_per_km(),
            elevation_gain_m: w.elevation_gain_m(),
            speed_km_per_h: w.speed_km_per_h(),
        }
    }
}

pub fn write_workouts_csv(writer: impl Write, workouts: &[Workout]) -> csv::Result<()> {
    let rows: Vec<WorkoutRow> = workouts.iter().map(WorkoutRow::from).collect();
    write_csv(writer, &rows)
}

pub fn save_workouts_csv<P: AsRef<Path>>(path: P, workouts: &[Workout]) -> csv::Result<()> {
    write_workouts_csv(std::fs::File::create(path)?, workouts)
}

pub fn save_workouts_json<P: AsRef<Path>>(path: P, workouts: &[Workout]) -> std::io::Result<()> {
    write_json(workouts, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::Coordinates;
    use chrono::{TimeZone, Utc};

    fn workouts() -> Vec<Workout> {
        let t = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        vec![
            Workout::running("1", t, Coordinates::new(1.5, 2.5), 5.0, 30.0, 150.0),
            Workout::cycling("2", t, Coordinates::new(3.0, 4.0), 20.0, 60.0, 100.0),
        ]
    }

    #[test]
    fn csv_has_one_row_per_workout() {
        let mut buf = Vec::new();
        write_workouts_csv(&mut buf, &workouts()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,created_at,kind,description,lat,lng"));
        assert!(lines[1].contains(",running,"));
        assert!(lines[1].ends_with(",150.0,6.0,,"));
        assert!(lines[2].contains(",cycling,"));
        assert!(lines[2].ends_with(",,,100.0,20.0"));
    }

    #[test]
    fn json_export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workouts.json");
        save_workouts_json(&path, &workouts()).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        let back: Vec<Workout> = serde_json::from_str(&data).unwrap();
        assert_eq!(back, workouts());
    }
}
