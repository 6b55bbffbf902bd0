//! CR2 explorador API client.
//!
//! The service answers `request.php` in one of three ways: the export bytes
//! directly in the body, a JSON envelope pointing at a generated export file
//! (one extra GET), or an HTML error page when it dislikes the request
//! profile. Bare requests are rejected, hence the browser-like headers.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::RawPayload;
use crate::error::FetchError;

const REQUEST_URL: &str = "https://explorador.cr2.cl/request.php";
const REFERER_URL: &str = "https://explorador.cr2.cl/";
const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Timeout for the initial API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for the follow-up export download, which can be much larger.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Request options (URL-encoded JSON in the `options` query parameter)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ExportOptions<'a> {
    variable: Variable<'a>,
    time: TimeWindow,
    series: SeriesSelection<'a>,
    export: ExportFormats<'a>,
    action: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct Variable<'a> {
    id: &'a str,
    var: &'a str,
    intv: &'a str,
    season: &'a str,
    stat: &'a str,
    #[serde(rename = "minFrac")]
    min_frac: u32,
}

#[derive(Debug, Serialize)]
struct TimeWindow {
    start: i64,
    end: i64,
    months: [u32; 12],
}

#[derive(Debug, Serialize)]
struct SeriesSelection<'a> {
    sites: [&'a str; 1],
    start: Option<()>,
    end: Option<()>,
}

#[derive(Debug, Serialize)]
struct ExportFormats<'a> {
    series: &'a str,
}

fn epoch_day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn epoch_day_end(date: NaiveDate) -> i64 {
    epoch_day_start(date) + 86_399
}

/// Serialize the daily-mean-streamflow export request for one station.
fn build_options(station_id: &str, start: NaiveDate, end: NaiveDate) -> String {
    let options = ExportOptions {
        variable: Variable {
            id: "qflxDaily",
            var: "caudal",
            intv: "daily",
            season: "year",
            stat: "mean",
            min_frac: 80,
        },
        time: TimeWindow {
            start: epoch_day_start(start),
            end: epoch_day_end(end),
            months: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        },
        series: SeriesSelection {
            sites: [station_id],
            start: None,
            end: None,
        },
        export: ExportFormats { series: "CSV" },
        action: ["export"],
    };
    // Only serializes plain structs; cannot fail.
    serde_json::to_string(&options).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Export envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ExportEnvelope {
    export: Option<ExportSection>,
}

#[derive(Debug, Deserialize)]
struct ExportSection {
    series: Option<ExportTarget>,
    map: Option<ExportTarget>,
}

/// The envelope has been observed carrying the link both as a bare string
/// and as an object with a `url` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportTarget {
    Link { url: String },
    Direct(String),
}

impl ExportTarget {
    fn url(&self) -> &str {
        match self {
            ExportTarget::Link { url } => url,
            ExportTarget::Direct(url) => url,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ExportLink {
    pub url: String,
    /// True when only the map export was available. The map export is
    /// spatial data, not a time series, so it is a degraded fallback.
    pub from_map: bool,
}

/// Extract the secondary download URL from an envelope response body.
///
/// Returns `None` when the body is not JSON or carries no export link, in
/// which case the body itself is the payload.
pub(crate) fn parse_export_envelope(body: &[u8]) -> Option<ExportLink> {
    let first = body.iter().find(|b| !b.is_ascii_whitespace())?;
    if *first != b'{' {
        return None;
    }
    let envelope: ExportEnvelope = serde_json::from_slice(body).ok()?;
    let export = envelope.export?;
    if let Some(series) = export.series {
        return Some(ExportLink {
            url: series.url().to_string(),
            from_map: false,
        });
    }
    export.map.map(|map| ExportLink {
        url: map.url().to_string(),
        from_map: true,
    })
}

fn looks_like_html(body: &[u8]) -> bool {
    let start: Vec<u8> = body
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(16)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    start.starts_with(b"<!doctype") || start.starts_with(b"<html")
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ExploradorClient {
    client: Client,
}

impl ExploradorClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .default_headers(default_headers())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::from_transport)?;
        Ok(Self { client })
    }

    /// Fetch the raw export payload for one station and date window,
    /// following at most one export-link indirection.
    pub fn fetch(
        &self,
        station_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawPayload, FetchError> {
        let options = build_options(station_id, start, end);
        debug!(%options, "request options");
        info!(station_id, %start, %end, "requesting export from explorador");

        let response = self
            .client
            .get(REQUEST_URL)
            .query(&[("options", options.as_str())])
            .send()
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(status.as_u16()));
        }

        let content_type = declared_content_type(response.headers());
        let body = response
            .bytes()
            .map_err(FetchError::from_transport)?
            .to_vec();

        if looks_like_html(&body) {
            return Err(FetchError::UpstreamRejected);
        }

        match parse_export_envelope(&body) {
            Some(link) => {
                if link.from_map {
                    warn!("envelope has no series export; falling back to the map export");
                }
                info!(url = %link.url, "following export link");
                self.download(&link.url)
            }
            None => {
                debug!(?content_type, bytes = body.len(), "direct payload in response body");
                Ok(RawPayload::new(body, content_type))
            }
        }
    }

    fn download(&self, url: &str) -> Result<RawPayload, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(status.as_u16()));
        }

        let content_type = declared_content_type(response.headers());
        let body = response
            .bytes()
            .map_err(FetchError::from_transport)?
            .to_vec();

        if looks_like_html(&body) {
            return Err(FetchError::UpstreamRejected);
        }

        info!(bytes = body.len(), "export downloaded");
        Ok(RawPayload::new(body, content_type))
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
    headers
}

fn declared_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn options_embed_variable_station_and_export_format() {
        let options = build_options("10111001", date(1960, 1, 1), date(2025, 12, 31));
        assert!(options.contains("\"id\":\"qflxDaily\""), "got: {options}");
        assert!(options.contains("\"var\":\"caudal\""));
        assert!(options.contains("\"sites\":[\"10111001\"]"));
        assert!(options.contains("\"series\":\"CSV\""));
        assert!(options.contains("\"action\":[\"export\"]"));
        assert!(options.contains("\"minFrac\":80"));
    }

    #[test]
    fn options_window_is_epoch_day_bounds() {
        let options = build_options("10111001", date(1960, 1, 1), date(2025, 12, 31));
        // 1960-01-01T00:00:00Z and 2025-12-31T23:59:59Z.
        assert!(options.contains("\"start\":-315619200"), "got: {options}");
        assert!(options.contains("\"end\":1767225599"));
    }

    #[test]
    fn envelope_with_series_url_object() {
        let body = br#"{"export":{"series":{"url":"https://x/series.csv"},"map":{"url":"https://x/map.csv"}}}"#;
        let link = parse_export_envelope(body).expect("should find link");
        assert_eq!(link.url, "https://x/series.csv");
        assert!(!link.from_map);
    }

    #[test]
    fn envelope_with_direct_string_url() {
        let body = br#"{"export":{"series":"https://x/series.csv"}}"#;
        let link = parse_export_envelope(body).expect("should find link");
        assert_eq!(link.url, "https://x/series.csv");
    }

    #[test]
    fn envelope_falls_back_to_map_url() {
        let body = br#"{"export":{"map":{"url":"https://x/map.csv"}}}"#;
        let link = parse_export_envelope(body).expect("should fall back to map");
        assert_eq!(link.url, "https://x/map.csv");
        assert!(link.from_map);
    }

    #[test]
    fn non_envelope_json_is_not_a_link() {
        assert!(parse_export_envelope(br#"{"status":"ok"}"#).is_none());
        assert!(parse_export_envelope(br#"{"export":{}}"#).is_none());
    }

    #[test]
    fn csv_body_is_not_a_link() {
        assert!(parse_export_envelope(b"fecha,caudal\n1961-01-01,12.5\n").is_none());
    }

    #[test]
    fn html_detection_ignores_leading_whitespace_and_case() {
        assert!(looks_like_html(b"\n  <!DOCTYPE html><html>"));
        assert!(looks_like_html(b"<HTML><body>error</body>"));
        assert!(!looks_like_html(b"fecha,caudal\n"));
        assert!(!looks_like_html(br#"{"export":{}}"#));
    }
}
