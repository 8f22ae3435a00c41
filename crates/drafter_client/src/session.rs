//! Authenticated Drafter session.
//!
//! Blocking reqwest client (no Tokio runtime required). Redirects are never
//! followed: draftset creation answers 303, and following it would replay
//! the request without the bearer token.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ClientConfig, Credentials};
use crate::draftset::{Draftset, Include, WireDraftset};
use crate::error::{DrafterError, Result};
use crate::job::{AsyncJob, JobStatus};

/// Drafter API session (blocking).
///
/// A `Session` only exists once authenticated. Handles returned by its
/// methods borrow it, so `authenticate` (which needs `&mut self`) cannot
/// run while any handle is alive.
pub struct Session {
    http: Client,
    config: ClientConfig,
    base: Url,
    credentials: Credentials,
    access_token: String,
}

/// What an operation accepts as a successful response.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Expect {
    Status(StatusCode),
    AnySuccess,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("client_id", &self.credentials.client_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Authenticate against the default (staging) service.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Build the HTTP client and authenticate. Fails if the token endpoint
    /// refuses the credentials.
    pub fn with_config(credentials: Credentials, mut config: ClientConfig) -> Result<Self> {
        let trimmed = config.base_url.trim_end_matches('/').len();
        config.base_url.truncate(trimmed);
        let base = Url::parse(&config.base_url).map_err(|e| {
            DrafterError::Config(format!("invalid base URL {:?}: {}", config.base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(DrafterError::Config(format!(
                "base URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let mut session = Self {
            http,
            config,
            base,
            credentials,
            access_token: String::new(),
        };
        session.authenticate()?;
        Ok(session)
    }

    /// Exchange the client credentials for a bearer token.
    ///
    /// There is no automatic refresh; call this again once the token expires.
    pub fn authenticate(&mut self) -> Result<()> {
        let request = TokenRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            audience: &self.config.audience,
            grant_type: &self.config.grant_type,
        };

        log::debug!("POST {}", self.config.token_url);
        let response = self.http.post(&self.config.token_url).json(&request).send()?;

        let status = response.status();
        let body = response.text()?;
        if status != StatusCode::OK {
            log::warn!("token endpoint returned HTTP {}", status.as_u16());
            return Err(DrafterError::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| DrafterError::Parse(format!("invalid token response: {}", e)))?;
        self.access_token = token.access_token;
        log::info!("authenticated as client {}", self.credentials.client_id);
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// List draftsets visible to the caller: owned, claimable, or both.
    pub fn list_draftsets(
        &self,
        include: Include,
        union_with_live: bool,
    ) -> Result<Vec<Draftset<'_>>> {
        let req = self
            .request(Method::GET, self.endpoint(&["v1", "draftsets"]))
            .query(&[
                ("include", include.as_str()),
                ("union-with-live", bool_param(union_with_live)),
            ]);
        let resp = self.execute(req, Expect::Status(StatusCode::OK))?;

        let records: Vec<WireDraftset> = decode_json(resp)?;
        records
            .into_iter()
            .map(|wire| Draftset::from_wire(self, wire))
            .collect()
    }

    pub fn get_draftset(&self, id: &str, union_with_live: bool) -> Result<Draftset<'_>> {
        let req = self
            .request(Method::GET, self.draftset_url(id, None))
            .query(&[("union-with-live", bool_param(union_with_live))]);
        let resp = self.execute(req, Expect::Status(StatusCode::OK))?;

        let record: WireDraftset = decode_json(resp)?;
        Draftset::from_wire(self, record)
    }

    /// Create a draftset and fetch it.
    ///
    /// The service answers 303 with the new resource in `Location`; the id is
    /// its last path segment and is fetched with an authenticated GET.
    pub fn create_draftset(
        &self,
        display_name: Option<&str>,
        description: Option<&str>,
        union_with_live: bool,
    ) -> Result<Draftset<'_>> {
        let mut query = Vec::new();
        if let Some(name) = display_name {
            query.push(("display-name", name));
        }
        if let Some(desc) = description {
            query.push(("description", desc));
        }

        let req = self
            .request(Method::POST, self.endpoint(&["v1", "draftsets"]))
            .query(&query);
        let resp = self.execute(req, Expect::Status(StatusCode::SEE_OTHER))?;

        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DrafterError::Parse("303 response without Location header".into()))?;
        let id = draftset_id_from_location(&self.base, location).ok_or_else(|| {
            DrafterError::Parse(format!("cannot read draftset id from Location {:?}", location))
        })?;

        log::info!("created draftset {}", id);
        self.get_draftset(&id, union_with_live)
    }

    /// Check once whether an async job has finished.
    ///
    /// The finished-job pointer must stay on the service's origin; the bearer
    /// token is never sent elsewhere.
    pub fn job_status(&self, job: &AsyncJob) -> Result<JobStatus> {
        let url = self.job_url(&job.finished_job)?;
        let resp = self.send(self.request(Method::GET, url))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(JobStatus::Pending),
            StatusCode::OK => JobStatus::from_finished_body(&read_body(resp)?),
            _ => Err(api_error(resp)),
        }
    }

    /// Poll until the job finishes, or `timeout` elapses.
    pub fn wait_for_job(
        &self,
        job: &AsyncJob,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<JobStatus> {
        let start = Instant::now();
        loop {
            let status = self.job_status(job)?;
            if status.is_finished() {
                return Ok(status);
            }
            if start.elapsed() > timeout {
                return Err(DrafterError::Timeout(format!(
                    "job {} did not finish within {}s",
                    job.id(),
                    timeout.as_secs()
                )));
            }
            thread::sleep(poll_interval);
        }
    }

    // ── Transport helpers ───────────────────────────────────────────

    /// Service URL built from path segments, each one percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        endpoint_url(&self.base, segments)
    }

    /// `/v1/draftset/<id>[/<action>]`
    pub(crate) fn draftset_url(&self, id: &str, action: Option<&str>) -> Url {
        let mut segments = vec!["v1", "draftset", id];
        segments.extend(action);
        self.endpoint(&segments)
    }

    fn job_url(&self, finished_job: &str) -> Result<Url> {
        job_url(&self.base, finished_job)
    }

    /// Authenticated request for a service URL.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        log::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
    }

    pub(crate) fn send(&self, req: RequestBuilder) -> Result<Response> {
        req.send().map_err(|e| DrafterError::Network(e.to_string()))
    }

    /// Send and check the status; any other status becomes `Api`.
    pub(crate) fn execute(&self, req: RequestBuilder, expect: Expect) -> Result<Response> {
        let resp = self.send(req)?;
        let ok = match expect {
            Expect::Status(code) => resp.status() == code,
            Expect::AnySuccess => resp.status().is_success(),
        };
        if ok {
            Ok(resp)
        } else {
            Err(api_error(resp))
        }
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn api_error(resp: Response) -> DrafterError {
    let status = resp.status().as_u16();
    log::warn!("{} returned HTTP {}", resp.url(), status);
    match read_body(resp) {
        Ok(body) => DrafterError::Api { status, body },
        Err(e) => e,
    }
}

pub(crate) fn read_body(resp: Response) -> Result<String> {
    resp.text()
        .map_err(|e| DrafterError::Network(format!("failed to read response body: {}", e)))
}

pub(crate) fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = read_body(resp)?;
    serde_json::from_str(&body).map_err(|e| {
        let excerpt: String = body.chars().take(200).collect();
        DrafterError::Parse(format!("{} (body: {})", e, excerpt))
    })
}

fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Resolve a finished-job pointer. Relative paths hang off the service root;
/// absolute URLs must share its origin.
fn job_url(base: &Url, finished_job: &str) -> Result<Url> {
    let url = match Url::parse(finished_job) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = finished_job.trim_start_matches('/');
            Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), path))
                .map_err(|e| DrafterError::Parse(format!("invalid job path {:?}: {}", finished_job, e)))?
        }
        Err(e) => {
            return Err(DrafterError::Parse(format!(
                "invalid job URL {:?}: {}",
                finished_job, e
            )))
        }
    };
    if url.origin() != base.origin() {
        return Err(DrafterError::Parse(format!(
            "job URL {} is not on the service origin {}",
            url,
            base.origin().ascii_serialization()
        )));
    }
    Ok(url)
}

/// Last non-empty path segment of a `Location` header, resolved against the
/// service root so relative locations work too.
fn draftset_id_from_location(base: &Url, location: &str) -> Option<String> {
    let url = base.join(location).ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}
