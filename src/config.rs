//! Run configuration.
//!
//! Everything a run needs is collected once at startup into an [`AppConfig`]
//! and passed down by reference:
//!
//! - credentials and station settings from the environment (`.env` supported)
//! - numeric tunables from CLI flags (see `cli`)
//! - the channel table, with units resolved from a static map

use std::path::PathBuf;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::data::feed::{DEFAULT_BASE_URL, FetchSettings};
use crate::domain::{ChannelKind, ChannelSpec};
use crate::error::AppError;

pub const DEFAULT_ZONE: &str = "America/Santiago";
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Feed keys of the station, in report order.
pub const STATION_FEEDS: [&str; 10] = [
    "estacion.temperatura",
    "estacion.humedad",
    "estacion.presion",
    "estacion.altitud",
    "estacion-dot-punto-rocio",
    "estacion-dot-sensacion-termica",
    "estacion-dot-densidad-aire",
    "estacion-dot-humedad-suelo",
    "estacion.luz",
    "estacion.rele_control",
];

/// Unit by normalized channel key (see [`normalized_key`]).
const UNITS: [(&str, &str); 9] = [
    ("temperatura", "°C"),
    ("humedad", "%"),
    ("presion", "hPa"),
    ("altitud", "m"),
    ("punto_rocio", "°C"),
    ("sensacion_termica", "°C"),
    ("densidad_aire", "kg/m³"),
    ("humedad_suelo", "%"),
    ("luz", "lux"),
];

/// Normalized keys reported as ON/OFF instead of statistics.
const BINARY_CHANNELS: [&str; 1] = ["rele_control"];

const FEED_PREFIXES: [&str; 2] = ["estacion.", "estacion-dot-"];

/// Feed key without the station prefix, `-`/space folded to `_`.
pub fn normalized_key(feed_key: &str) -> String {
    let trimmed = feed_key.trim();
    let bare = FEED_PREFIXES
        .iter()
        .find_map(|p| trimmed.strip_prefix(p))
        .unwrap_or(trimmed);
    bare.replace(['-', ' '], "_")
}

/// `estacion-dot-punto-rocio` -> `Punto Rocio`.
pub fn title_for(feed_key: &str) -> String {
    normalized_key(feed_key)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn unit_for(feed_key: &str) -> Option<&'static str> {
    let key = normalized_key(feed_key);
    UNITS.iter().find(|(k, _)| *k == key).map(|(_, unit)| *unit)
}

/// Build the spec for one feed key.
pub fn channel_spec(feed_key: &str) -> ChannelSpec {
    let key = normalized_key(feed_key);
    let kind = if BINARY_CHANNELS.contains(&key.as_str()) {
        ChannelKind::Binary
    } else {
        ChannelKind::Analog
    };
    ChannelSpec {
        key: feed_key.trim().to_string(),
        title: title_for(feed_key),
        unit: unit_for(feed_key).map(str::to_string),
        kind,
    }
}

/// Parse a comma-separated feed list; empty entries are skipped.
///
/// Analog channels missing from the unit map are logged: they still report,
/// labelled "no unit", but usually mean a typo in the key.
pub fn channels_from_list(list: &str) -> Result<Vec<ChannelSpec>, AppError> {
    let channels: Vec<ChannelSpec> = list
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(channel_spec)
        .collect();

    if channels.is_empty() {
        return Err(AppError::new(2, "Channel list is empty."));
    }
    for ch in &channels {
        if ch.unit.is_none() && ch.kind == ChannelKind::Analog {
            log::warn!("channel '{}' has no unit mapping (check the feed key)", ch.key);
        }
    }
    Ok(channels)
}

pub fn default_channels() -> Vec<ChannelSpec> {
    STATION_FEEDS.iter().map(|k| channel_spec(k)).collect()
}

/// `STATION_TZ`, or the station's default zone when unset.
pub fn parse_zone(name: Option<String>) -> Result<Tz, AppError> {
    let name = name.unwrap_or_else(|| DEFAULT_ZONE.to_string());
    name.parse()
        .map_err(|e| AppError::new(2, format!("Unknown time zone '{name}': {e}")))
}

/// Zone from `.env` / the environment, without requiring credentials.
pub fn zone_from_env() -> Result<Tz, AppError> {
    dotenvy::dotenv().ok();
    parse_zone(
        std::env::var("STATION_TZ")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    )
}

#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

/// Settings sourced from the environment.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    pub io_username: String,
    pub io_key: String,
    /// `None` only when delivery is not required (dry runs).
    pub telegram: Option<TelegramCredentials>,
    pub zone: Tz,
    pub base_url: String,
    pub channels: Vec<ChannelSpec>,
}

impl EnvSettings {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env(require_telegram: bool) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok(), require_telegram)
    }

    /// Read settings through `lookup`; blank values count as missing.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        require_telegram: bool,
    ) -> Result<Self, AppError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &str| {
            get(name).ok_or_else(|| AppError::new(2, format!("Missing {name} in environment (.env).")))
        };

        let io_username = required("IO_USERNAME")?;
        let io_key = required("IO_KEY")?;

        let telegram = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramCredentials { token, chat_id }),
            _ if require_telegram => {
                return Err(AppError::new(
                    2,
                    "Missing TELEGRAM_TOKEN / TELEGRAM_CHAT_ID in environment (.env).",
                ));
            }
            _ => None,
        };

        let zone = parse_zone(get("STATION_TZ"))?;

        let base_url = get("STATION_IO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let channels = match get("STATION_FEEDS") {
            Some(list) => channels_from_list(&list)?,
            None => default_channels(),
        };

        Ok(Self {
            io_username,
            io_key,
            telegram,
            zone,
            base_url,
            channels,
        })
    }
}

/// A full run's configuration, derived from environment + CLI flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: EnvSettings,
    pub anchor_hour: u32,
    pub span_days: u32,
    pub tolerance_minutes: i64,
    pub fetch: FetchSettings,
    pub concurrency: usize,
    pub trend_threshold: f64,
    /// Fixed "now" for re-running a past report; `None` means the wall clock.
    pub now: Option<DateTime<Tz>>,
    pub dry_run: bool,
    /// Where SVG charts go; `None` disables charts (text charts too on dry runs).
    pub chart_dir: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

impl AppConfig {
    pub fn zone(&self) -> Tz {
        self.env.zone
    }

    pub fn channels(&self) -> &[ChannelSpec] {
        &self.env.channels
    }
}
