//! JSON/HTTP routing layer in front of the session manager

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::engine::Engine;
use crate::errors::Error;
use crate::session::Session;

/// Body for the activation endpoints. `duration` is in seconds; absent
/// means keep refreshing until explicitly turned off.
#[derive(Debug, Deserialize)]
pub(crate) struct LightRequest {
    key: String,
    #[serde(default = "default_color")]
    color: String,
    duration: Option<f64>,
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

/// Body for the per-target off endpoints.
#[derive(Debug, Deserialize)]
struct KeyRequest {
    key: String,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn router<E: Engine + Clone>(session: Arc<Session<E>>) -> Router {
    Router::new()
        .route("/lights_on_key", post(lights_on_key::<E>))
        .route("/lights_on_region", post(lights_on_region::<E>))
        .route("/lights_off_key", post(lights_off_key::<E>))
        .route("/lights_off_region", post(lights_off_region::<E>))
        .route("/lights_off", post(lights_off::<E>))
        .with_state(session)
}

fn parse_request(req: &LightRequest) -> Result<(Rgb, Option<Duration>), Error> {
    let color: Rgb = req.color.parse()?;
    let duration = match req.duration {
        Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => return Err(Error::InvalidDuration(secs)),
        None => None,
    };
    Ok((color, duration))
}

fn ok(status: String) -> Response {
    (StatusCode::OK, Json(StatusBody { status })).into_response()
}

fn fail(err: &Error) -> Response {
    let code = match err {
        Error::InvalidKey(_)
        | Error::UnknownRegion(_)
        | Error::InvalidColor(_)
        | Error::InvalidDuration(_) => StatusCode::BAD_REQUEST,
        Error::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn lights_on_key<E: Engine + Clone>(
    State(session): State<Arc<Session<E>>>,
    Json(req): Json<LightRequest>,
) -> Response {
    let (color, duration) = match parse_request(&req) {
        Ok(parsed) => parsed,
        Err(err) => return fail(&err),
    };
    match session.activate_key(&req.key, color, duration).await {
        Ok(()) => ok(format!("key {:?} lit with {}", req.key, req.color)),
        Err(err) => fail(&err),
    }
}

async fn lights_on_region<E: Engine + Clone>(
    State(session): State<Arc<Session<E>>>,
    Json(req): Json<LightRequest>,
) -> Response {
    let (color, duration) = match parse_request(&req) {
        Ok(parsed) => parsed,
        Err(err) => return fail(&err),
    };
    match session.activate_region(&req.key, color, duration).await {
        Ok(()) => ok(format!("region of key {:?} lit with {}", req.key, req.color)),
        Err(err) => fail(&err),
    }
}

async fn lights_off_key<E: Engine + Clone>(
    State(session): State<Arc<Session<E>>>,
    Json(req): Json<KeyRequest>,
) -> Response {
    match session.deactivate_key(&req.key).await {
        Ok(()) => ok(format!("key {:?} lights off", req.key)),
        Err(err) => fail(&err),
    }
}

async fn lights_off_region<E: Engine + Clone>(
    State(session): State<Arc<Session<E>>>,
    Json(req): Json<KeyRequest>,
) -> Response {
    match session.deactivate_region(&req.key).await {
        Ok(()) => ok(format!("region of key {:?} lights off", req.key)),
        Err(err) => fail(&err),
    }
}

async fn lights_off<E: Engine + Clone>(State(session): State<Arc<Session<E>>>) -> Response {
    match session.all_off().await {
        Ok(()) => ok("all keys lights off".to_string()),
        Err(err) => fail(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;

    #[test]
    fn request_defaults_apply() {
        let req: LightRequest = serde_json::from_str(r#"{"key": "g"}"#).unwrap();
        assert_eq!(req.key, "g");
        assert_eq!(req.color, "#FFFFFF");
        assert_eq!(req.duration, None);

        let (color, duration) = parse_request(&req).unwrap();
        assert_eq!(
            color,
            Rgb {
                red: 255,
                green: 255,
                blue: 255
            }
        );
        assert_eq!(duration, None);
    }

    #[test]
    fn durations_are_validated() {
        let req: LightRequest =
            serde_json::from_str(r#"{"key": "g", "duration": 5}"#).unwrap();
        let (_, duration) = parse_request(&req).unwrap();
        assert_eq!(duration, Some(Duration::from_secs(5)));

        for bad in [r#"{"key": "g", "duration": -1}"#, r#"{"key": "g", "duration": 0}"#] {
            let req: LightRequest = serde_json::from_str(bad).unwrap();
            assert!(matches!(
                parse_request(&req),
                Err(Error::InvalidDuration(_))
            ));
        }
    }

    #[test]
    fn bad_colors_are_rejected() {
        let req: LightRequest =
            serde_json::from_str(r##"{"key": "g", "color": "#XYZ"}"##).unwrap();
        assert!(matches!(parse_request(&req), Err(Error::InvalidColor(_))));
    }

    #[test]
    fn validation_and_engine_errors_map_to_distinct_statuses() {
        assert_eq!(
            fail(&Error::InvalidKey("gh".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            fail(&Error::UnknownRegion('7')).status(),
            StatusCode::BAD_REQUEST
        );
        let engine_err = Error::Engine(EngineError::Rejected {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "down".to_string(),
        });
        assert_eq!(
            fail(&engine_err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
