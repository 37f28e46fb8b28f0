//! Lighting session manager
//!
//! Owns the process-wide lighting state: the binding cache, the refresh task
//! registry and the pre-bound all-off event. One instance is built after the
//! engine becomes reachable and shared by every request handler.

use std::time::Duration;

use log::{debug, info, warn};
use smallvec::{smallvec, SmallVec};
use tokio::sync::Mutex;

use crate::cache::BindingCache;
use crate::color::Rgb;
use crate::engine::{Engine, EVENT_OFF, EVENT_ON};
use crate::errors::Error;
use crate::regions;
use crate::scheduler::{RefreshScheduler, DEFAULT_INTERVAL};

/// Event triggered by the global off path; pre-bound to black across every
/// zone at session construction so no bind happens at shutdown time.
pub(crate) const ALL_OFF_EVENT: &str = "__ALL_OFF__";

/// Named keys accepted besides single letters, with their engine zone names.
const SPECIAL_KEYS: &[(&str, &str)] = &[("space", "spacebar"), ("enter", "return")];

/// Zone lists are tiny: one key, or one region's worth.
type Zones = SmallVec<[String; 9]>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionConfig {
    /// Cadence of the keep-alive refresh.
    pub refresh_interval: Duration,
    /// Color pre-bound to every letter key at startup, if any. Avoids the
    /// first-activation flash.
    pub prebind_color: Option<Rgb>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_INTERVAL,
            prebind_color: None,
        }
    }
}

/// The event name and zone set a request resolves to.
#[derive(Debug)]
struct Target {
    event: String,
    zones: Zones,
}

/// Resolve a key request: a single letter, or a whitelisted special key.
fn key_target(key: &str) -> Result<Target, Error> {
    if let Some((name, zone)) = SPECIAL_KEYS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
    {
        return Ok(Target {
            event: format!("{}KEY_EVENT", name.to_uppercase()),
            zones: smallvec![(*zone).to_string()],
        });
    }
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            let c = c.to_ascii_lowercase();
            Ok(Target {
                event: format!("{}KEY_EVENT", c.to_ascii_uppercase()),
                zones: smallvec![c.to_string()],
            })
        }
        _ => Err(Error::InvalidKey(key.to_string())),
    }
}

/// Resolve a region request from any key inside the region.
fn region_target(key: &str) -> Result<Target, Error> {
    let mut chars = key.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(Error::InvalidKey(key.to_string()));
    };
    let region = regions::region_of(c.to_ascii_lowercase()).ok_or(Error::UnknownRegion(c))?;
    Ok(Target {
        event: region.event_name(),
        zones: region.keys.chars().map(|k| k.to_string()).collect(),
    })
}

#[derive(Debug, Default)]
struct Inner {
    cache: BindingCache,
    scheduler: RefreshScheduler,
}

/// Process-wide lighting session. All cache and task-registry mutation is
/// serialized behind one lock; refresh tasks never take it.
pub(crate) struct Session<E> {
    engine: E,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl<E: Engine + Clone> Session<E> {
    /// Build the session: pre-bind the all-off event, and optionally every
    /// letter key. The all-off bind must succeed; per-key pre-bind failures
    /// are logged and skipped.
    pub(crate) async fn new(engine: E, config: SessionConfig) -> Result<Self, Error> {
        let mut inner = Inner::default();

        inner.cache.ensure_registered(&engine, ALL_OFF_EVENT).await?;
        let all_zones: Zones = smallvec!["all".to_string()];
        inner
            .cache
            .ensure_bound(&engine, ALL_OFF_EVENT, &all_zones, Rgb::BLACK)
            .await?;

        if let Some(color) = config.prebind_color {
            for key in 'a'..='z' {
                let event = format!("{}KEY_EVENT", key.to_ascii_uppercase());
                let zones: Zones = smallvec![key.to_string()];
                if let Err(err) = inner.cache.ensure_registered(&engine, &event).await {
                    warn!("failed to pre-register {event}: {err}");
                    continue;
                }
                if let Err(err) = inner.cache.ensure_bound(&engine, &event, &zones, color).await {
                    warn!("failed to pre-bind {event}: {err}");
                }
            }
            info!("pre-bound letter keys");
        }

        Ok(Self {
            engine,
            config,
            inner: Mutex::new(inner),
        })
    }

    /// Light a single key. Returns as soon as the refresher is running;
    /// never blocks for `duration`.
    pub(crate) async fn activate_key(
        &self,
        key: &str,
        color: Rgb,
        duration: Option<Duration>,
    ) -> Result<(), Error> {
        self.activate(key_target(key)?, color, duration).await
    }

    /// Light the whole region containing `key` through its shared event.
    pub(crate) async fn activate_region(
        &self,
        key: &str,
        color: Rgb,
        duration: Option<Duration>,
    ) -> Result<(), Error> {
        self.activate(region_target(key)?, color, duration).await
    }

    async fn activate(
        &self,
        target: Target,
        color: Rgb,
        duration: Option<Duration>,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        inner
            .cache
            .ensure_registered(&self.engine, &target.event)
            .await?;
        inner
            .cache
            .ensure_bound(&self.engine, &target.event, &target.zones, color)
            .await?;
        inner.scheduler.start(
            &self.engine,
            &target.event,
            self.config.refresh_interval,
            duration,
        );
        Ok(())
    }

    /// Stop a key's refresher and trigger its off value. The color binding
    /// stays cached, so re-activating the same color binds nothing.
    pub(crate) async fn deactivate_key(&self, key: &str) -> Result<(), Error> {
        self.deactivate(&key_target(key)?.event).await
    }

    pub(crate) async fn deactivate_region(&self, key: &str) -> Result<(), Error> {
        self.deactivate(&region_target(key)?.event).await
    }

    async fn deactivate(&self, event: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        inner.scheduler.stop(event);
        match self.engine.trigger(event, EVENT_OFF).await {
            Ok(()) => Ok(()),
            // The engine rejects triggers for events it never saw, e.g.
            // deactivating a key that was never activated.
            Err(err) if err.is_rejection() => {
                debug!("off trigger for {event} rejected: {err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Flicker-free global off: stop every refresher and assert the
    /// pre-bound black event instead of rebinding anything. A defensive
    /// sweep then clears every known event individually; each step runs even
    /// when earlier ones failed, and the first failure is reported at the
    /// end.
    pub(crate) async fn all_off(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        inner.scheduler.stop_all();

        let mut first_failure = None;
        if let Err(err) = self.engine.trigger(ALL_OFF_EVENT, EVENT_ON).await {
            warn!("all-off trigger failed: {err}");
            first_failure = Some(err);
        }

        let events: Vec<String> = inner
            .cache
            .known_events()
            .filter(|event| *event != ALL_OFF_EVENT)
            .map(str::to_string)
            .collect();
        for event in events {
            if let Err(err) = self.engine.trigger(&event, EVENT_OFF).await {
                warn!("off trigger for {event} failed during all-off: {err}");
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
