//! Client for the trend provider's unofficial JSON API.
//!
//! A query is a three-step dance: prime the session cookie, POST the
//! keyword/geo/timeframe payload to the explore endpoint to obtain a
//! TIMESERIES widget token, then fetch the widget's multiline data.

use crate::error::{Error, Result};
use crate::table::KeywordSeries;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

const BASE_URL: &str = "https://trends.google.com";
const EXPLORE_URL: &str = "https://trends.google.com/trends/api/explore";
const MULTILINE_URL: &str = "https://trends.google.com/trends/api/widgetdata/multiline";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Minutes west of UTC for the provider session. JST is -540.
const TZ_OFFSET_MINUTES: i32 = -540;

/// Narrow seam the orchestrator fetches through, fake-able in tests.
pub trait TrendSource {
    async fn interest_over_time(
        &self,
        keyword: &str,
        geo: &str,
        timeframe: &str,
    ) -> Result<KeywordSeries>;
}

pub struct TrendClient {
    http: Client,
    host_language: String,
    cookie_primed: OnceCell<()>,
}

impl TrendClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            host_language: "ja".to_string(),
            cookie_primed: OnceCell::new(),
        })
    }

    /// The provider rejects API calls without the session cookie it sets on
    /// the landing page, so hit that once per client.
    async fn prime_cookies(&self) -> Result<()> {
        self.cookie_primed
            .get_or_try_init(|| async {
                self.http
                    .get(format!("{BASE_URL}/?geo=JP"))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<_, Error>(())
            })
            .await?;
        Ok(())
    }

    async fn fetch_timeseries_widget(
        &self,
        keyword: &str,
        geo: &str,
        timeframe: &str,
    ) -> Result<Widget> {
        let req = serde_json::json!({
            "comparisonItem": [{ "keyword": keyword, "geo": geo, "time": timeframe }],
            "category": 0,
            "property": "",
        });
        let tz = TZ_OFFSET_MINUTES.to_string();
        let req = req.to_string();
        let body = self
            .http
            .get(EXPLORE_URL)
            .query(&[
                ("hl", self.host_language.as_str()),
                ("tz", tz.as_str()),
                ("req", req.as_str()),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::fetch(keyword, format!("explore request refused: {e}")))?
            .text()
            .await?;

        let explore: ExploreResponse = serde_json::from_str(strip_guard(&body)?)?;
        explore
            .widgets
            .into_iter()
            .find(|w| w.id == "TIMESERIES")
            .ok_or_else(|| Error::fetch(keyword, "no TIMESERIES widget in explore response"))
    }
}

impl TrendSource for TrendClient {
    async fn interest_over_time(
        &self,
        keyword: &str,
        geo: &str,
        timeframe: &str,
    ) -> Result<KeywordSeries> {
        self.prime_cookies().await?;

        let widget = self.fetch_timeseries_widget(keyword, geo, timeframe).await?;
        let token = widget
            .token
            .ok_or_else(|| Error::fetch(keyword, "TIMESERIES widget carries no token"))?;
        let request = widget
            .request
            .ok_or_else(|| Error::fetch(keyword, "TIMESERIES widget carries no request"))?;

        let tz = TZ_OFFSET_MINUTES.to_string();
        let request = request.to_string();
        let body = self
            .http
            .get(MULTILINE_URL)
            .query(&[
                ("hl", self.host_language.as_str()),
                ("tz", tz.as_str()),
                ("req", request.as_str()),
                ("token", token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::fetch(keyword, format!("widget data refused: {e}")))?
            .text()
            .await?;

        let series = parse_multiline(&body, keyword)?;
        debug!(keyword, rows = series.points.len(), "fetched series");
        Ok(series)
    }
}

/// API bodies open with a `)]}'` anti-JSON-hijacking guard; skip to the
/// first JSON byte.
fn strip_guard(body: &str) -> Result<&str> {
    body.find(['{', '['])
        .map(|i| &body[i..])
        .ok_or_else(|| Error::fetch("", "response body contains no JSON"))
}

fn parse_multiline(body: &str, keyword: &str) -> Result<KeywordSeries> {
    let parsed: MultilineResponse = serde_json::from_str(strip_guard(body)?)?;
    let mut points = Vec::with_capacity(parsed.default.timeline_data.len());
    let mut values = Vec::with_capacity(parsed.default.timeline_data.len());
    for entry in parsed.default.timeline_data {
        let secs: i64 = entry
            .time
            .parse()
            .map_err(|_| Error::fetch(keyword, format!("bad timestamp: {}", entry.time)))?;
        let date = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| Error::fetch(keyword, format!("timestamp out of range: {secs}")))?
            .date_naive();
        points.push(date);
        values.push(entry.value.first().copied().unwrap_or(0));
    }
    Ok(KeywordSeries { points, values })
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    token: Option<String>,
    request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: Timeline,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(rename = "timelineData")]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    time: String,
    value: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn guard_prefix_is_stripped() {
        assert_eq!(strip_guard(")]}'\n{\"a\":1}").unwrap(), "{\"a\":1}");
        assert_eq!(strip_guard("{\"a\":1}").unwrap(), "{\"a\":1}");
        assert!(strip_guard(")]}'").is_err());
    }

    #[test]
    fn explore_response_yields_timeseries_widget() {
        let body = r#")]}'
{"widgets":[
  {"id":"GEO_MAP","request":{}},
  {"id":"TIMESERIES","token":"APP6_abc","request":{"time":"2023-01-01 2023-01-31"}}
]}"#;
        let explore: ExploreResponse = serde_json::from_str(strip_guard(body).unwrap()).unwrap();
        let widget = explore.widgets.into_iter().find(|w| w.id == "TIMESERIES").unwrap();
        assert_eq!(widget.token.as_deref(), Some("APP6_abc"));
        assert!(widget.request.is_some());
    }

    #[test]
    fn multiline_body_parses_to_series() {
        // 2023-01-01 and 2023-01-08 as epoch seconds.
        let body = r#")]}',
{"default":{"timelineData":[
  {"time":"1672531200","formattedTime":"2023/01/01","value":[42],"isPartial":false},
  {"time":"1673136000","formattedTime":"2023/01/08","value":[63],"isPartial":true}
]}}"#;
        let series = parse_multiline(body, "rust").unwrap();
        assert_eq!(
            series.points,
            vec![
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 8).unwrap(),
            ]
        );
        assert_eq!(series.values, vec![42, 63]);
    }

    #[test]
    fn bad_timestamp_is_a_fetch_error() {
        let body = r#"{"default":{"timelineData":[{"time":"not-a-number","value":[1]}]}}"#;
        assert!(matches!(
            parse_multiline(body, "rust"),
            Err(Error::Fetch { .. })
        ));
    }
}
