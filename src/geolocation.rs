use crate::workout::Coordinates;
use serde_json::Value;
use std::sync::mpsc::{self, Receiver};

pub const IP_API_URL: &str = "http://ip-api.com/json";
const LOCATION_ENV: &str = "WORKOUT_MAPPER_LOCATION";

#[derive(Debug)]
pub enum GeolocationError {
    Denied(String),
    Unavailable(String),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeolocationError::Denied(body) => write!(f, "Denied: {body}"),
            GeolocationError::Unavailable(reason) => write!(f, "Unavailable: {reason}"),
            GeolocationError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GeolocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeolocationError::Denied(_) | GeolocationError::Unavailable(_) => None,
            GeolocationError::Other(e) => Some(&**e),
        }
    }
}

/// One-shot source of the user's current position.
pub trait GeolocationProvider {
    fn locate(&self) -> Result<Coordinates, GeolocationError>;
}

/// Position looked up from the machine's public IP address.
///
/// The service is expected to answer with the `ip-api.com` JSON shape:
/// `{"status": "success", "lat": .., "lon": ..}`.
#[derive(Debug, Clone)]
pub struct IpGeolocation {
    url: String,
}

impl IpGeolocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for IpGeolocation {
    fn default() -> Self {
        Self::new(IP_API_URL)
    }
}

impl GeolocationProvider for IpGeolocation {
    fn locate(&self) -> Result<Coordinates, GeolocationError> {
        log::info!("Requesting position from {}", self.url);
        let response = ureq::get(&self.url)
            .set("Accept", "application/json")
            .call();
        let body = match response {
            Ok(r) => r
                .into_string()
                .map_err(|e| GeolocationError::Other(Box::new(e)))?,
            Err(ureq::Error::Status(401 | 403, r)) => {
                let body = r.into_string().unwrap_or_default();
                return Err(GeolocationError::Denied(body));
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(GeolocationError::Unavailable(format!("HTTP status {code}")));
            }
            Err(e) => return Err(GeolocationError::Other(Box::new(e))),
        };
        parse_position(&body)
    }
}

fn parse_position(body: &str) -> Result<Coordinates, GeolocationError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| GeolocationError::Other(Box::new(e)))?;
    if let Some(status) = json.get("status").and_then(|v| v.as_str()) {
        if status != "success" {
            let message = json
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or(status);
            return Err(GeolocationError::Unavailable(message.to_string()));
        }
    }
    let lat = json.get("lat").and_then(|v| v.as_f64());
    let lon = json.get("lon").and_then(|v| v.as_f64());
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
        _ => Err(GeolocationError::Unavailable(
            "response has no coordinates".into(),
        )),
    }
}

/// Provider that always answers with the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

impl GeolocationProvider for FixedLocation {
    fn locate(&self) -> Result<Coordinates, GeolocationError> {
        Ok(self.0)
    }
}

/// Parse `"lat,lng"`.
pub fn parse_location(text: &str) -> Option<Coordinates> {
    let (lat, lng) = text.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
    in_range.then(|| Coordinates::new(lat, lng))
}

/// Determine a fixed position to use instead of asking a service.
///
/// A valid `WORKOUT_MAPPER_LOCATION` environment variable takes precedence
/// over the location stored in the settings.
pub fn resolve_fixed_location(settings_location: Option<Coordinates>) -> Option<Coordinates> {
    std::env::var(LOCATION_ENV)
        .ok()
        .and_then(|v| parse_location(&v))
        .or(settings_location)
}

/// Run a single position request on a background thread.
///
/// The receiver yields exactly one result; there is no retry.
pub fn locate_in_background<P>(provider: P) -> Receiver<Result<Coordinates, GeolocationError>>
where
    P: GeolocationProvider + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = provider.locate();
        if tx.send(result).is_err() {
            log::warn!("Position arrived after the receiver was dropped");
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn reads_lat_lon_from_service() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200)
                .body(r#"{"status":"success","lat":48.8566,"lon":2.3522,"city":"Paris"}"#);
        });

        let pos = IpGeolocation::new(server.url("/json")).locate().unwrap();
        assert_eq!(pos, Coordinates::new(48.8566, 2.3522));
        m.assert();
    }

    #[test]
    fn failed_status_is_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200)
                .body(r#"{"status":"fail","message":"private range"}"#);
        });

        match IpGeolocation::new(server.url("/json")).locate() {
            Err(GeolocationError::Unavailable(msg)) => assert_eq!(msg, "private range"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn maps_403_to_denied() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(403).body("quota exceeded");
        });

        match IpGeolocation::new(server.url("/json")).locate() {
            Err(GeolocationError::Denied(body)) => assert_eq!(body, "quota exceeded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parse_location_checks_range() {
        assert_eq!(parse_location(" 10.5, -20 "), Some(Coordinates::new(10.5, -20.0)));
        assert_eq!(parse_location("91,0"), None);
        assert_eq!(parse_location("10;20"), None);
        assert_eq!(parse_location("abc,1"), None);
    }

    #[test]
    fn background_request_delivers_once() {
        let rx = locate_in_background(FixedLocation(Coordinates::new(1.0, 2.0)));
        let pos = rx.recv().unwrap().unwrap();
        assert_eq!(pos, Coordinates::new(1.0, 2.0));
        assert!(rx.recv().is_err());
    }
}
