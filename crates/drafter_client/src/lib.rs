//! Drafter API client.
//!
//! Authenticates with OAuth2 client credentials, then lists, fetches and
//! creates draftsets and drives their lifecycle: claim, submit, publish,
//! delete, append data.
//!
//! Blocking, no retries, no automatic token refresh.
//!
//! ```no_run
//! use drafter_client::{AppendData, Credentials, Role, Session};
//!
//! # fn main() -> drafter_client::Result<()> {
//! let session = Session::new(Credentials::resolve()?)?;
//! let draftset = session.create_draftset(Some("Quarterly stats"), None, false)?;
//! let draftset = draftset.claim()?;
//! draftset.append_data("obs.ttl", &AppendData::with_extension(".ttl").graph("http://example.org/g"))?;
//! let draftset = draftset.submit_to(Some(Role::Publisher), None)?;
//! # let _ = draftset;
//! # Ok(())
//! # }
//! ```

mod config;
mod draftset;
mod error;
mod job;
mod rdf;
mod session;

pub use config::{
    ClientConfig, Credentials, credentials_file_path, load_credentials, save_credentials,
    DEFAULT_AUDIENCE, DEFAULT_BASE_URL, DEFAULT_GRANT_TYPE, DEFAULT_TOKEN_URL,
};
pub use draftset::{
    Draftset, DraftsetKind, DraftsetRecord, DraftsetState, Include, Role, SubmittedTo,
};
pub use error::{DrafterError, Result};
pub use job::{AsyncJob, JobStatus};
pub use rdf::{AppendData, ContentEncoding, RdfFormat, Upload};
pub use session::Session;
