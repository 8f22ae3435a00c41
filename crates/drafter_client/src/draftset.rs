//! Draftset records and the lifecycle operations on them.
//!
//! A draftset moves between custody states:
//!
//! ```text
//! Unclaimed ──claim──▶ Claimed ──submit_to──▶ Submitted ──claim──▶ Claimed …
//!                         │
//!                         └──publish──▶ (published)      delete from any state
//! ```
//!
//! The wire record has no state tag; [`DraftsetState`] is derived from which
//! custody fields are present, and contradictory combinations are rejected.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{DrafterError, Result};
use crate::job::AsyncJob;
use crate::rdf::AppendData;
use crate::session::{read_body, Expect, Session};

// ── Enumerations ────────────────────────────────────────────────────

/// Resource type reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftsetKind {
    Endpoint,
    Draftset,
}

impl FromStr for DraftsetKind {
    type Err = DrafterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Endpoint" => Ok(DraftsetKind::Endpoint),
            "Draftset" => Ok(DraftsetKind::Draftset),
            other => Err(DrafterError::Integrity(format!(
                "unknown draftset type {:?} (expected Endpoint or Draftset)",
                other
            ))),
        }
    }
}

/// Role pools a draftset can be submitted to, lowest rank first.
///
/// A user may claim from any pool whose role ranks at or below their own;
/// the service enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Editor,
    Publisher,
    Manager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Editor => "editor",
            Role::Publisher => "publisher",
            Role::Manager => "manager",
        }
    }
}

impl FromStr for Role {
    type Err = DrafterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "editor" => Ok(Role::Editor),
            "publisher" => Ok(Role::Publisher),
            "manager" => Ok(Role::Manager),
            other => Err(DrafterError::invalid(format!(
                "unknown role {:?} (expected editor, publisher or manager)",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for `Session::list_draftsets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Include {
    Owned,
    Claimable,
    #[default]
    All,
}

impl Include {
    pub fn as_str(self) -> &'static str {
        match self {
            Include::Owned => "owned",
            Include::Claimable => "claimable",
            Include::All => "all",
        }
    }
}

impl FromStr for Include {
    type Err = DrafterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owned" => Ok(Include::Owned),
            "claimable" => Ok(Include::Claimable),
            "all" => Ok(Include::All),
            other => Err(DrafterError::invalid(format!(
                "include must be owned, claimable or all, got {:?}",
                other
            ))),
        }
    }
}

// ── Lifecycle state ─────────────────────────────────────────────────

/// Who a submitted draftset is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedTo {
    Role(Role),
    User(String),
}

/// Custody state, derived from the record's optional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftsetState {
    Unclaimed,
    Claimed { owner: String },
    Submitted { to: SubmittedTo, by: Option<String> },
}

impl DraftsetState {
    fn derive(
        current_owner: Option<&str>,
        claim_role: Option<&str>,
        claim_user: Option<&str>,
        submitted_by: Option<&str>,
    ) -> Result<Self> {
        match (current_owner, claim_role, claim_user) {
            (None, None, None) => Ok(DraftsetState::Unclaimed),
            (Some(owner), None, None) => Ok(DraftsetState::Claimed {
                owner: owner.to_string(),
            }),
            (None, Some(role), None) => {
                let role = role.parse::<Role>().map_err(|_| {
                    DrafterError::Integrity(format!("unknown claim-role {:?}", role))
                })?;
                Ok(DraftsetState::Submitted {
                    to: SubmittedTo::Role(role),
                    by: submitted_by.map(String::from),
                })
            }
            (None, None, Some(user)) => Ok(DraftsetState::Submitted {
                to: SubmittedTo::User(user.to_string()),
                by: submitted_by.map(String::from),
            }),
            (None, Some(_), Some(_)) => Err(DrafterError::Integrity(
                "draftset has both claim-role and claim-user".into(),
            )),
            (Some(_), _, _) => Err(DrafterError::Integrity(
                "draftset has a current-owner and a pending claim".into(),
            )),
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            DraftsetState::Claimed { owner } => Some(owner),
            _ => None,
        }
    }
}

// ── Wire record ─────────────────────────────────────────────────────

/// Draftset as the service serialises it (kebab-case keys).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct WireDraftset {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    changes: serde_json::Map<String, serde_json::Value>,
    display_name: Option<String>,
    description: Option<String>,
    current_owner: Option<String>,
    submitted_by: Option<String>,
    claim_role: Option<String>,
    claim_user: Option<String>,
}

/// Validated draftset record. Immutable: lifecycle operations return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftsetRecord {
    id: String,
    kind: DraftsetKind,
    created_at: String,
    updated_at: String,
    changes: serde_json::Map<String, serde_json::Value>,
    display_name: Option<String>,
    description: Option<String>,
    current_owner: Option<String>,
    submitted_by: Option<String>,
    claim_role: Option<String>,
    claim_user: Option<String>,
    state: DraftsetState,
}

impl TryFrom<WireDraftset> for DraftsetRecord {
    type Error = DrafterError;

    fn try_from(wire: WireDraftset) -> Result<Self> {
        let kind = wire.kind.parse::<DraftsetKind>()?;
        let state = DraftsetState::derive(
            wire.current_owner.as_deref(),
            wire.claim_role.as_deref(),
            wire.claim_user.as_deref(),
            wire.submitted_by.as_deref(),
        )
        .map_err(|e| match e {
            DrafterError::Integrity(msg) => {
                DrafterError::Integrity(format!("draftset {}: {}", wire.id, msg))
            }
            other => other,
        })?;

        Ok(Self {
            id: wire.id,
            kind,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            changes: wire.changes,
            display_name: wire.display_name,
            description: wire.description,
            current_owner: wire.current_owner,
            submitted_by: wire.submitted_by,
            claim_role: wire.claim_role,
            claim_user: wire.claim_user,
            state,
        })
    }
}

impl DraftsetRecord {
    /// Decode a record from the service's JSON representation.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let wire: WireDraftset = serde_json::from_value(value)
            .map_err(|e| DrafterError::Parse(format!("invalid draftset record: {}", e)))?;
        Self::try_from(wire)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> DraftsetKind {
        self.kind
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    /// Pending changes, exactly as the service reported them.
    pub fn changes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.changes
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn current_owner(&self) -> Option<&str> {
        self.current_owner.as_deref()
    }

    pub fn submitted_by(&self) -> Option<&str> {
        self.submitted_by.as_deref()
    }

    pub fn claim_role(&self) -> Option<&str> {
        self.claim_role.as_deref()
    }

    pub fn claim_user(&self) -> Option<&str> {
        self.claim_user.as_deref()
    }

    pub fn state(&self) -> &DraftsetState {
        &self.state
    }
}

// ── Draftset handle ─────────────────────────────────────────────────

/// A draftset bound to the session that fetched it.
///
/// Equality and `Debug` only consider the record.
#[derive(Clone)]
pub struct Draftset<'s> {
    session: &'s Session,
    record: DraftsetRecord,
}

impl fmt::Debug for Draftset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.record, f)
    }
}

impl PartialEq for Draftset<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl<'s> Draftset<'s> {
    pub(crate) fn from_wire(session: &'s Session, wire: WireDraftset) -> Result<Self> {
        Ok(Self {
            session,
            record: DraftsetRecord::try_from(wire)?,
        })
    }

    pub fn record(&self) -> &DraftsetRecord {
        &self.record
    }

    pub fn into_record(self) -> DraftsetRecord {
        self.record
    }

    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn state(&self) -> &DraftsetState {
        self.record.state()
    }

    fn url(&self, action: Option<&str>) -> Url {
        self.session.draftset_url(&self.record.id, action)
    }

    /// Fetch the current server state as a new handle.
    pub fn refresh(&self) -> Result<Draftset<'s>> {
        self.session.get_draftset(&self.record.id, false)
    }

    /// Take custody. The service decides whether the caller's role may claim.
    pub fn claim(&self) -> Result<Draftset<'s>> {
        let req = self.session.request(Method::POST, self.url(Some("claim")));
        self.session.execute(req, Expect::Status(StatusCode::OK))?;
        self.refresh()
    }

    /// Submit for review to a role pool or to one user (exactly one of them).
    pub fn submit_to(&self, role: Option<Role>, user: Option<&str>) -> Result<Draftset<'s>> {
        let user = user.filter(|u| !u.is_empty());
        if role.is_some() == user.is_some() {
            return Err(DrafterError::invalid(
                "submit_to needs exactly one of role or user",
            ));
        }

        let body = serde_json::json!({
            "role": role.map(Role::as_str),
            "user": user,
        });
        let req = self
            .session
            .request(Method::POST, self.url(Some("submit-to")))
            .json(&body);
        self.session.execute(req, Expect::Status(StatusCode::OK))?;
        self.refresh()
    }

    /// Schedule publication to live. Consumes the handle.
    pub fn publish(self, metadata: Option<&str>) -> Result<AsyncJob> {
        let req = self
            .session
            .request(Method::POST, self.url(Some("publish")))
            .query(&metadata_query(metadata));
        let resp = self.session.execute(req, Expect::AnySuccess)?;
        log::info!("publish scheduled for draftset {}", self.record.id);
        AsyncJob::from_body(&read_body(resp)?)
    }

    /// Delete the draftset. Returns `true` once the service accepts (202);
    /// every other outcome is an error.
    pub fn delete(self, metadata: Option<&str>) -> Result<bool> {
        let req = self
            .session
            .request(Method::DELETE, self.url(None))
            .query(&metadata_query(metadata));
        self.session.execute(req, Expect::Status(StatusCode::ACCEPTED))?;
        log::info!("deleted draftset {}", self.record.id);
        Ok(true)
    }

    /// Upload an RDF file as-is.
    ///
    /// All options are validated before the file is opened.
    pub fn append_data(&self, path: impl AsRef<Path>, opts: &AppendData) -> Result<AsyncJob> {
        let upload = opts.validate()?;
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| DrafterError::Io(format!("cannot read {}: {}", path.display(), e)))?;

        let mut req = self
            .session
            .request(Method::PUT, self.url(Some("data")))
            .header(CONTENT_TYPE, upload.format.mime_type())
            .query(&upload.query());
        if let Some(encoding) = upload.content_encoding {
            req = req.header(CONTENT_ENCODING, encoding.as_str());
        }

        log::debug!(
            "uploading {} bytes of {} to draftset {}",
            data.len(),
            upload.format,
            self.record.id
        );
        let resp = self.session.execute(req.body(data), Expect::AnySuccess)?;
        AsyncJob::from_body(&read_body(resp)?)
    }
}

fn metadata_query(metadata: Option<&str>) -> Vec<(&'static str, &str)> {
    metadata.map(|m| vec![("metadata", m)]).unwrap_or_default()
}
