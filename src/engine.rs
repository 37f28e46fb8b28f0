//! Client for the engine's register/bind/trigger HTTP API

use std::future::Future;
use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::color::Rgb;
use crate::errors::EngineError;

/// Trigger value asserting an event.
pub(crate) const EVENT_ON: u8 = 1;
/// Trigger value clearing an event.
pub(crate) const EVENT_OFF: u8 = 0;

/// Built-in engine icon shown next to registered events.
const ICON_ID: u8 = 1;
/// How long the engine keeps the app alive without traffic.
const DEINITIALIZE_TIMER_MS: u32 = 10_000;

/// The engine operations the session layer depends on. The seam that lets
/// tests substitute a recording mock for the real HTTP client.
pub(crate) trait Engine: Send + Sync + 'static {
    /// Register a logical event. The engine may reject duplicates.
    fn register_event(
        &self,
        event: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Bind every zone in `zones` to `color` for `event`. One call covers
    /// the whole list; this is the expensive, visually disruptive operation.
    fn bind_color(
        &self,
        event: &str,
        zones: &[String],
        color: Rgb,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Assert the event's value: [`EVENT_ON`] or [`EVENT_OFF`].
    fn trigger(
        &self,
        event: &str,
        value: u8,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Stateless request/response wrapper around the engine's HTTP API.
#[derive(Debug, Clone)]
pub(crate) struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    game: String,
}

impl EngineClient {
    pub(crate) fn new(
        address: &str,
        game: &str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: format!("http://{address}"),
            game: game.to_string(),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize>(&self, endpoint: &str, payload: &T) -> Result<(), EngineError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self.http.post(&url).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        debug!("POST {url} -> {status}: {body}");
        Err(EngineError::Rejected { status, body })
    }

    /// Register this app with the engine.
    pub(crate) async fn register_game(
        &self,
        display_name: &str,
        developer: &str,
    ) -> Result<(), EngineError> {
        self.post(
            "game_metadata",
            &GameMetadata {
                game: &self.game,
                game_display_name: display_name,
                developer,
                deinitialize_timer_length_ms: DEINITIALIZE_TIMER_MS,
            },
        )
        .await
    }

    /// Whether the engine answers the metadata probe at all.
    pub(crate) async fn health_check(&self) -> bool {
        self.post(
            "game_metadata",
            &GameMetadata {
                game: &self.game,
                game_display_name: "HealthCheck",
                developer: "Checker",
                deinitialize_timer_length_ms: 1000,
            },
        )
        .await
        .is_ok()
    }

    /// Best-effort deregistration on shutdown.
    pub(crate) async fn remove_game(&self) -> Result<(), EngineError> {
        self.post("remove_game", &RemoveGame { game: &self.game })
            .await
    }
}

impl Engine for EngineClient {
    async fn register_event(&self, event: &str) -> Result<(), EngineError> {
        self.post(
            "register_game_event",
            &RegisterEvent {
                game: &self.game,
                event,
                min_value: 0,
                max_value: 1,
                icon_id: ICON_ID,
            },
        )
        .await
    }

    async fn bind_color(
        &self,
        event: &str,
        zones: &[String],
        color: Rgb,
    ) -> Result<(), EngineError> {
        let handlers = zones
            .iter()
            .map(|zone| ZoneHandler {
                device_type: "keyboard",
                zone,
                mode: "color",
                color,
            })
            .collect();
        self.post(
            "bind_game_event",
            &BindEvent {
                game: &self.game,
                event,
                handlers,
            },
        )
        .await
    }

    async fn trigger(&self, event: &str, value: u8) -> Result<(), EngineError> {
        self.post(
            "game_event",
            &GameEvent {
                game: &self.game,
                event,
                data: EventData { value },
            },
        )
        .await
    }
}

#[derive(Debug, Serialize)]
struct GameMetadata<'a> {
    game: &'a str,
    game_display_name: &'a str,
    developer: &'a str,
    deinitialize_timer_length_ms: u32,
}

#[derive(Debug, Serialize)]
struct RegisterEvent<'a> {
    game: &'a str,
    event: &'a str,
    min_value: u8,
    max_value: u8,
    icon_id: u8,
}

#[derive(Debug, Serialize)]
struct BindEvent<'a> {
    game: &'a str,
    event: &'a str,
    handlers: Vec<ZoneHandler<'a>>,
}

#[derive(Debug, Serialize)]
struct ZoneHandler<'a> {
    #[serde(rename = "device-type")]
    device_type: &'a str,
    zone: &'a str,
    mode: &'a str,
    color: Rgb,
}

#[derive(Debug, Serialize)]
struct GameEvent<'a> {
    game: &'a str,
    event: &'a str,
    data: EventData,
}

#[derive(Debug, Serialize)]
struct EventData {
    value: u8,
}

#[derive(Debug, Serialize)]
struct RemoveGame<'a> {
    game: &'a str,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_payload_matches_wire_format() {
        let payload = BindEvent {
            game: "KEYGLOW",
            event: "GKEY_EVENT",
            handlers: vec![ZoneHandler {
                device_type: "keyboard",
                zone: "g",
                mode: "color",
                color: Rgb {
                    red: 0,
                    green: 255,
                    blue: 0,
                },
            }],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "game": "KEYGLOW",
                "event": "GKEY_EVENT",
                "handlers": [{
                    "device-type": "keyboard",
                    "zone": "g",
                    "mode": "color",
                    "color": {"red": 0, "green": 255, "blue": 0},
                }],
            })
        );
    }

    #[test]
    fn trigger_payload_matches_wire_format() {
        let payload = GameEvent {
            game: "KEYGLOW",
            event: "REGION1_EVENT",
            data: EventData { value: EVENT_ON },
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "game": "KEYGLOW",
                "event": "REGION1_EVENT",
                "data": {"value": 1},
            })
        );
    }
}
