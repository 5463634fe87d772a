//! Aladhan prayer-times API (https://aladhan.com/prayer-times-api).
//!
//! `GET /v1/timingsByCity/{DD-MM-YYYY}?city=..&country=..&method=..`
//! answers `{"code": 200, "data": {"timings": {"Fajr": "05:12", ...}}}`.
//! Unknown locations come back as HTTP 400 with a non-200 `code`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use wird_core::config::PrayerConfig;
use wird_core::error::ResolveError;
use wird_core::tenant::{Location, TriggerName, TriggerSet};
use wird_core::traits::TriggerResolver;

/// Prayer-time resolver backed by the Aladhan HTTP API.
pub struct AladhanResolver {
    client: reqwest::Client,
    base_url: String,
    method: u8,
}

#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: u16,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AladhanData {
    timings: HashMap<String, String>,
}

impl AladhanResolver {
    pub fn new(config: &PrayerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            method: config.method,
        }
    }

    fn url(&self, date: NaiveDate) -> String {
        format!(
            "{}/v1/timingsByCity/{}",
            self.base_url,
            date.format("%d-%m-%Y")
        )
    }
}

/// Parse "05:12" or "05:12 (EET)".
fn parse_time(raw: &str) -> Option<NaiveTime> {
    let hhmm = raw.split_whitespace().next()?;
    NaiveTime::parse_from_str(hhmm, "%H:%M").ok()
}

fn not_found(location: &Location) -> ResolveError {
    ResolveError::NotFound {
        city: location.city.clone(),
        country: location.country.clone(),
    }
}

#[async_trait]
impl TriggerResolver for AladhanResolver {
    fn name(&self) -> &str {
        "aladhan"
    }

    async fn resolve(
        &self,
        location: &Location,
        date: NaiveDate,
    ) -> Result<TriggerSet, ResolveError> {
        let method = self.method.to_string();
        let resp = self
            .client
            .get(self.url(date))
            .query(&[
                ("city", location.city.as_str()),
                ("country", location.country.as_str()),
                ("method", method.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResolveError::Transient(format!("request failed: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(ResolveError::Transient(format!("server error {status}")));
        }
        if status.is_client_error() {
            tracing::info!("Aladhan returned {status} for {location}");
            return Err(not_found(location));
        }

        let body: AladhanResponse = resp
            .json()
            .await
            .map_err(|e| ResolveError::Transient(format!("invalid response body: {e}")))?;

        if body.code != 200 {
            tracing::info!("Aladhan returned code {} for {location}", body.code);
            return Err(not_found(location));
        }

        let data: AladhanData = serde_json::from_value(body.data)
            .map_err(|e| ResolveError::Invalid(format!("no timings in response: {e}")))?;

        let mut times = Vec::with_capacity(TriggerName::ALL.len());
        for name in TriggerName::ALL {
            let raw = data
                .timings
                .get(name.api_key())
                .ok_or_else(|| ResolveError::Invalid(format!("missing {name}")))?;
            let time = parse_time(raw)
                .ok_or_else(|| ResolveError::Invalid(format!("unparseable {name} time '{raw}'")))?;
            times.push((name, time));
        }

        TriggerSet::new(date, times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_with_zone_suffix() {
        assert_eq!(
            parse_time("05:12 (EET)"),
            NaiveTime::from_hms_opt(5, 12, 0)
        );
        assert_eq!(parse_time("19:03"), NaiveTime::from_hms_opt(19, 3, 0));
        assert_eq!(parse_time("soon"), None);
    }

    #[test]
    fn test_url_uses_day_first_date() {
        let resolver = AladhanResolver::new(&PrayerConfig {
            base_url: "http://localhost:9/".into(),
            ..PrayerConfig::default()
        });
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(
            resolver.url(date),
            "http://localhost:9/v1/timingsByCity/07-03-2026"
        );
    }
}
