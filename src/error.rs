use crate::geolocation::GeolocationError;
use crate::storage::StorageError;

/// Numeric input fields accepted by the create and edit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Distance,
    Duration,
    Cadence,
    ElevationGain,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Distance => "distance",
            Field::Duration => "duration",
            Field::Cadence => "cadence",
            Field::ElevationGain => "elevation gain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidField {
    pub field: Field,
    pub value: f64,
}

impl std::fmt::Display for InvalidField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = match self.field {
            Field::ElevationGain => "a number of zero or more",
            _ => "a positive number",
        };
        write!(f, "{} must be {rule} (got {})", self.field.name(), self.value)
    }
}

#[derive(Debug)]
pub enum TrackerError {
    Validation(Vec<InvalidField>),
    NotFound(String),
    Storage(StorageError),
    GeolocationUnavailable(GeolocationError),
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::Validation(fields) => {
                write!(f, "Inputs have to be positive numbers: ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{field}")?;
                }
                Ok(())
            }
            TrackerError::NotFound(id) => write!(f, "No workout with id {id}"),
            TrackerError::Storage(e) => write!(f, "Could not access saved workouts: {e}"),
            TrackerError::GeolocationUnavailable(e) => {
                write!(f, "Could not get your position: {e}")
            }
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Validation(_) | TrackerError::NotFound(_) => None,
            TrackerError::Storage(e) => Some(e),
            TrackerError::GeolocationUnavailable(e) => Some(e),
        }
    }
}

impl From<StorageError> for TrackerError {
    fn from(e: StorageError) -> Self {
        TrackerError::Storage(e)
    }
}

impl From<GeolocationError> for TrackerError {
    fn from(e: GeolocationError) -> Self {
        TrackerError::GeolocationUnavailable(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = TrackerError::Validation(vec![
            InvalidField {
                field: Field::Distance,
                value: -1.0,
            },
            InvalidField {
                field: Field::ElevationGain,
                value: f64::NAN,
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("distance must be a positive number (got -1)"));
        assert!(msg.contains("elevation gain must be a number of zero or more (got NaN)"));
    }

    #[test]
    fn storage_error_is_the_source() {
        use std::error::Error;
        let err: TrackerError = StorageError::InvalidKey("bad/key".into()).into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("bad/key"));
    }
}
