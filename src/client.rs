use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Method, StatusCode, header};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::OutdoorWeather;
use crate::zone::Zone;
use crate::{Error, Result, ZoneRecord, control, scrape};

const DEFAULT_BASE_URL: &str = "https://mytotalconnectcomfort.com/portal";

const MAX_AUTH_ATTEMPTS: u32 = 100;
const MAX_ZONE_PAGES: u32 = 5;

const CREDENTIALS_REJECTED_PHRASES: [&str; 2] = [
    "The email or password provided is incorrect",
    "The email address is not in the correct format",
];
const UNAUTHORIZED_PHRASE: &str = "Unauthorized: Access is denied due to invalid credentials";

pub struct TccClientBuilder {
    username: String,
    password: String,
    base_url: String,
    backoff_unit: Duration,
}

impl TccClientBuilder {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Point the client at a different portal root (used against mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The unit the authentication backoff multiplies: attempt `i` sleeps
    /// `2^i` of these. Defaults to one second.
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn build(self) -> TccClient {
        TccClient {
            username: self.username,
            password: self.password,
            base_url: self.base_url,
            backoff_unit: self.backoff_unit,
            session: None,
            name_cache: Mutex::new(HashMap::new()),
        }
    }
}

/// An authenticated portal session: the cookie-holding HTTP context created
/// by a successful login, plus the location id derived from its response.
#[derive(Debug)]
struct Session {
    http: reqwest::Client,
    location_id: i64,
}

#[derive(Debug)]
pub struct TccClient {
    username: String,
    password: String,
    base_url: String,
    backoff_unit: Duration,
    session: Option<Session>,
    name_cache: Mutex<HashMap<i64, String>>,
}

impl TccClient {
    pub fn builder(username: impl Into<String>, password: impl Into<String>) -> TccClientBuilder {
        TccClientBuilder::new(username, password)
    }

    /// The location id discovered at login, if authenticated.
    pub fn location_id(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.location_id)
    }

    /// Log in to the portal, retrying with exponential backoff when the
    /// portal's rate limiting or redirect flakiness gets in the way.
    ///
    /// Only three failure classes are retryable: too many attempts, a
    /// missing post-login redirect, and the portal's own error redirect.
    /// Everything else (bad credentials included) propagates immediately.
    pub async fn authenticate(&mut self) -> Result<()> {
        for attempt in 0..MAX_AUTH_ATTEMPTS {
            debug!(attempt = attempt + 1, "starting authentication attempt");
            match self.try_authenticate().await {
                Ok(()) => return Ok(()),
                Err(
                    e @ (Error::TooManyAttempts(_)
                    | Error::RedirectDidNotHappen(_)
                    | Error::LoginUnexpected(_)),
                ) => {
                    let delay = backoff_delay(attempt, self.backoff_unit);
                    warn!(error = %e, delay_secs = delay.as_secs(), "unable to authenticate at this moment");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Authentication("ran out of tries".to_string()))
    }

    async fn try_authenticate(&mut self) -> Result<()> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;

        debug!(username = %self.username, "posting credentials to the portal");
        let resp = http
            .post(&self.base_url)
            .form(&[
                ("UserName", self.username.as_str()),
                ("Password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text().await?;

        if status != StatusCode::OK {
            return Err(Error::Authentication(format!(
                "status was {status} for {}",
                self.username
            )));
        }

        if CREDENTIALS_REJECTED_PHRASES.iter().any(|p| body.contains(p)) {
            return Err(Error::CredentialsInvalid(self.username.clone()));
        }

        debug!(url = %url, "resulting url from authentication");

        if url.contains("TooManyAttempts") {
            return Err(Error::TooManyAttempts(url));
        }
        if !url.contains("portal/") {
            return Err(Error::RedirectDidNotHappen(url));
        }
        if url.contains("/Error") {
            return Err(Error::LoginUnexpected(url));
        }

        let location_id = scrape::location_id(&url, &body)?;
        debug!(location_id, "location id resolved");

        self.session = Some(Session { http, location_id });
        Ok(())
    }

    /// Log out of the portal. A no-op when there is no session.
    pub async fn deauthenticate(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            debug!(username = %self.username, "logging out of the portal");
            let resp = session
                .http
                .get(format!("{}/Account/LogOff", self.base_url))
                .send()
                .await?;

            if resp.status() != StatusCode::OK {
                return Err(Error::DeAuthentication(format!(
                    "status was {} for {}",
                    resp.status(),
                    self.username
                )));
            }

            self.session = None;
        }
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NotAuthenticated)
    }

    /// Issue a request expecting a JSON body. A non-200 status or a body
    /// that does not decode classifies to `Unauthorized` or `Unexpected`.
    async fn request_json(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let session = self.session()?;

        let mut req = session
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header("X-Requested-With", "XMLHttpRequest");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        match serde_json::from_str::<Value>(&text) {
            Ok(json) if status == StatusCode::OK => Ok(json),
            _ => {
                warn!(url, status = status.as_u16(), body = %text, "unexpected response from portal");
                if status == StatusCode::UNAUTHORIZED || text.contains(UNAUTHORIZED_PHRASE) {
                    Err(Error::Unauthorized)
                } else {
                    Err(Error::Unexpected(format!(
                        "expected json data from {url}, got status {status}"
                    )))
                }
            }
        }
    }

    /// One page of GetZoneListData. `None` means the page was empty; reading
    /// past the last page yields a non-JSON response, which counts as empty.
    async fn zone_list_page(&self, location_id: i64, page: u32) -> Result<Option<Vec<Value>>> {
        let url = format!(
            "{}/Device/GetZoneListData?locationId={location_id}&page={page}",
            self.base_url
        );
        match self.request_json(Method::POST, &url, None).await {
            Ok(Value::Array(entries)) if !entries.is_empty() => Ok(Some(entries)),
            Ok(_) => Ok(None),
            Err(Error::Unexpected(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch and merge everything the portal knows about each zone: the
    /// paginated zone list, the cached display name, the CheckDataSession
    /// detail blob, and the scraped outdoor weather.
    pub async fn get_zones_info(&self) -> Result<Vec<ZoneRecord>> {
        let location_id = self.session()?.location_id;

        let mut entries: Vec<Value> = Vec::new();
        for page in 1..=MAX_ZONE_PAGES {
            debug!(location_id, page, "fetching zone list page");
            match self.zone_list_page(location_id, page).await? {
                Some(page_entries) => entries.extend(page_entries),
                None if page == 1 => return Err(Error::NoZonesFound),
                None => {
                    debug!(page, "page is empty");
                    break;
                }
            }
        }

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Object(entry) = entry else {
                return Err(Error::Unexpected("zone list entry is not an object".to_string()));
            };
            let device_id = entry
                .get("DeviceID")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::Unexpected("zone list entry has no DeviceID".to_string()))?;

            let name = self.device_name(device_id).await?;
            let detail = self.check_data_session(device_id).await?;
            let weather = self.outdoor_weather(device_id).await?;

            records.push(ZoneRecord::merge(entry, &name, detail, weather));
        }

        Ok(records)
    }

    /// A Zone view per device on the account.
    pub async fn get_all_zones(&self) -> Result<Vec<Zone<'_>>> {
        let mut zones = Vec::new();
        for record in self.get_zones_info().await? {
            zones.push(Zone::new(record, self)?);
        }
        Ok(zones)
    }

    /// A Zone view for the given display name (not device id).
    pub async fn get_zone_by_name(&self, name: &str) -> Result<Zone<'_>> {
        for record in self.get_zones_info().await? {
            if record.name() == Some(name) {
                return Zone::new(record, self);
            }
        }
        Err(Error::ZoneNameNotFound(name.to_string()))
    }

    /// Resolve a device's display name, scraping it from the control page on
    /// first sight and answering from the cache ever after.
    async fn device_name(&self, device_id: i64) -> Result<String> {
        if let Some(name) = self
            .name_cache
            .lock()
            .expect("name cache lock poisoned")
            .get(&device_id)
        {
            return Ok(name.clone());
        }

        let page = self.device_control_page(device_id).await?;
        let name = scrape::zone_name(&page).ok_or_else(|| {
            Error::Unexpected(format!("no zone name on the control page for device {device_id}"))
        })?;
        debug!(device_id, name = %name, "called portal to resolve device name");

        self.name_cache
            .lock()
            .expect("name cache lock poisoned")
            .insert(device_id, name.clone());
        Ok(name)
    }

    /// The outdoor readings for a device. Deliberately re-fetches the same
    /// control page the name scrape uses rather than sharing its body.
    async fn outdoor_weather(&self, device_id: i64) -> Result<OutdoorWeather> {
        let page = self.device_control_page(device_id).await?;
        Ok(scrape::outdoor_weather(&page, device_id))
    }

    async fn device_control_page(&self, device_id: i64) -> Result<String> {
        let session = self.session()?;
        let url = format!("{}/Device/Control/{device_id}?page=1", self.base_url);
        let resp = session.http.get(&url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    async fn check_data_session(&self, device_id: i64) -> Result<Value> {
        let url = format!("{}/Device/CheckDataSession/{device_id}", self.base_url);
        self.request_json(Method::GET, &url, None).await
    }

    /// Submit thermostat control changes the way the portal UI does, via the
    /// SubmitControlScreenChanges endpoint. Unspecified fields are sent as
    /// null, meaning "no change".
    pub async fn submit_raw_control_changes(
        &self,
        device_id: i64,
        updates: Map<String, Value>,
    ) -> Result<()> {
        let data = control::control_payload(device_id, updates)?;
        debug!(device_id, payload = %data, "posting control screen changes");

        let url = format!("{}/Device/SubmitControlScreenChanges", self.base_url);
        let resp = self.request_json(Method::POST, &url, Some(&data)).await?;

        // the endpoint answers 1 on some firmware and true on others
        let success = resp.get("success");
        let ok = success.and_then(Value::as_i64) == Some(1)
            || success.and_then(Value::as_bool) == Some(true);
        if !ok {
            return Err(Error::ControlRejected(resp.to_string()));
        }
        Ok(())
    }
}

fn backoff_delay(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let unit = Duration::from_secs(1);
        assert_eq!(backoff_delay(0, unit), Duration::from_secs(1));
        assert_eq!(backoff_delay(1, unit), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, unit), Duration::from_secs(4));
        assert_eq!(backoff_delay(10, unit), Duration::from_secs(1024));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let unit = Duration::from_secs(1);
        assert!(backoff_delay(99, unit) >= backoff_delay(31, unit));
    }

    #[test]
    fn zero_unit_never_sleeps() {
        assert_eq!(backoff_delay(50, Duration::ZERO), Duration::ZERO);
    }
}
