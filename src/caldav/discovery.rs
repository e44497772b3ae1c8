//! Principal/calendar-home discovery, calendar listing, and event fetch
//! over WebDAV PROPFIND/REPORT.

use super::xml;
use chrono::{DateTime, Utc};
use reqwest::Method;
use std::time::Duration;
use url::Url;

pub struct CalDavClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl CalDavClient {
    pub fn new(
        base_url: &str,
        username: String,
        password: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            username,
            password,
        })
    }

    async fn propfind(&self, url: &Url, depth: u8, body: String) -> anyhow::Result<String> {
        self.send(Method::from_bytes(b"PROPFIND")?, url, depth, body)
            .await
    }

    async fn report(&self, url: &Url, depth: u8, body: String) -> anyhow::Result<String> {
        self.send(Method::from_bytes(b"REPORT")?, url, depth, body)
            .await
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        depth: u8,
        body: String,
    ) -> anyhow::Result<String> {
        let response = self
            .http
            .request(method, url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", depth.to_string())
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    /// PROPFIND depth 0 at the base URL for `current-user-principal`,
    /// resolved relative to the base.
    pub async fn discover_principal(&self) -> anyhow::Result<Url> {
        let body = self
            .propfind(&self.base_url, 0, xml::principal_propfind_body())
            .await?;
        let responses = xml::parse_multistatus(&body)?;
        let href = responses
            .iter()
            .find_map(|r| r.current_user_principal.clone())
            .ok_or_else(|| anyhow::anyhow!("no current-user-principal in PROPFIND response"))?;
        Ok(self.base_url.join(&href)?)
    }

    /// PROPFIND depth 0 at the principal URL for `calendar-home-set`.
    pub async fn discover_calendar_home(&self, principal_url: &Url) -> anyhow::Result<Url> {
        let body = self
            .propfind(principal_url, 0, xml::calendar_home_propfind_body())
            .await?;
        let responses = xml::parse_multistatus(&body)?;
        let href = responses
            .iter()
            .find_map(|r| r.calendar_home_set.clone())
            .ok_or_else(|| anyhow::anyhow!("no calendar-home-set in PROPFIND response"))?;
        Ok(self.base_url.join(&href)?)
    }

    /// PROPFIND depth 1 at the home URL. Keeps only resources whose
    /// supported-component set includes VEVENT or does not list one.
    pub async fn list_calendars(&self, home_url: &Url) -> anyhow::Result<Vec<Url>> {
        let body = self
            .propfind(home_url, 1, xml::calendar_listing_propfind_body())
            .await?;
        let responses = xml::parse_multistatus(&body)?;

        responses
            .into_iter()
            .filter(|r| r.is_collection)
            .filter(|r| {
                r.supported_components.is_empty()
                    || r.supported_components.iter().any(|c| c == "VEVENT")
            })
            .filter_map(|r| r.href)
            .map(|href| self.base_url.join(&href).map_err(anyhow::Error::from))
            .collect()
    }

    /// REPORT `calendar-query` with a VEVENT time-range filter bounded by
    /// `[horizon_start, horizon_end]`; returns each calendar's raw ICS data.
    pub async fn fetch_events(
        &self,
        calendar_url: &Url,
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<String>> {
        let body = self
            .report(
                calendar_url,
                1,
                xml::calendar_query_body(horizon_start, horizon_end),
            )
            .await?;
        let responses = xml::parse_multistatus(&body)?;

        Ok(responses.into_iter().filter_map(|r| r.calendar_data).collect())
    }
}
