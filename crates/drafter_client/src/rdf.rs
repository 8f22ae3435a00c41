//! RDF serialisations accepted by the data endpoint, and upload validation.

use std::fmt;
use std::path::Path;

use crate::error::{DrafterError, Result};

/// RDF serialisation formats the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdfFormat {
    TriG,
    Turtle,
    NQuads,
    TriX,
    NTriples,
    RdfXml,
}

impl RdfFormat {
    pub const ALL: [RdfFormat; 6] = [
        RdfFormat::TriG,
        RdfFormat::Turtle,
        RdfFormat::NQuads,
        RdfFormat::TriX,
        RdfFormat::NTriples,
        RdfFormat::RdfXml,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            RdfFormat::TriG => ".trig",
            RdfFormat::Turtle => ".ttl",
            RdfFormat::NQuads => ".nq",
            RdfFormat::TriX => ".trix",
            RdfFormat::NTriples => ".nt",
            RdfFormat::RdfXml => ".rdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            RdfFormat::TriG => "application/trig",
            RdfFormat::Turtle => "text/turtle",
            RdfFormat::NQuads => "application/n-quads",
            RdfFormat::TriX => "application/trix",
            RdfFormat::NTriples => "application/n-triples",
            RdfFormat::RdfXml => "application/rdf+xml",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.mime_type() == mime)
    }

    /// Quad formats carry a graph per statement.
    pub fn is_quads(self) -> bool {
        matches!(self, RdfFormat::TriG | RdfFormat::NQuads)
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Declared `Content-Encoding` of pre-compressed uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    XGzip,
}

impl ContentEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::XGzip => "x-gzip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gzip" => Some(ContentEncoding::Gzip),
            "x-gzip" => Some(ContentEncoding::XGzip),
            _ => None,
        }
    }
}

/// Options for `Draftset::append_data`.
///
/// Fields stay as plain strings so every rule is checked in one place,
/// in a fixed order, by [`AppendData::validate`].
#[derive(Debug, Clone, Default)]
pub struct AppendData {
    /// File extension including the dot, e.g. `.ttl`
    pub extension: Option<String>,
    /// MIME type, e.g. `text/turtle`
    pub content_type: Option<String>,
    /// Target graph. Required for triple formats; overrides graphs in quads.
    pub graph: Option<String>,
    pub metadata: Option<String>,
    /// `gzip` or `x-gzip`. The body is sent as-is.
    pub content_encoding: Option<String>,
}

impl AppendData {
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
            ..Self::default()
        }
    }

    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    /// Format taken from the file's extension.
    pub fn for_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                DrafterError::invalid(format!("{} has no file extension", path.display()))
            })?;
        Ok(Self::with_extension(format!(".{}", ext)))
    }

    pub fn graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    /// Check every precondition and resolve the upload plan.
    ///
    /// Rules run in order: extension known, content type known, at least one
    /// of them given and both agreeing, triples have a graph, encoding known.
    /// Nothing here touches the file or the network.
    pub fn validate(&self) -> Result<Upload> {
        let extension = self.extension.as_deref().filter(|s| !s.is_empty());
        let content_type = self.content_type.as_deref().filter(|s| !s.is_empty());

        let from_ext = match extension {
            Some(ext) => Some(RdfFormat::from_extension(ext).ok_or_else(|| {
                DrafterError::invalid(format!(
                    "unsupported extension {:?} (expected one of .trig .ttl .nq .trix .nt .rdf)",
                    ext
                ))
            })?),
            None => None,
        };

        let from_mime = match content_type {
            Some(mime) => Some(RdfFormat::from_mime_type(mime).ok_or_else(|| {
                DrafterError::invalid(format!("unsupported content type {:?}", mime))
            })?),
            None => None,
        };

        let format = match (from_ext, from_mime) {
            (Some(a), Some(b)) if a != b => {
                return Err(DrafterError::invalid(format!(
                    "extension {} implies {}, but content type {} was given",
                    a.extension(),
                    a.mime_type(),
                    b.mime_type()
                )));
            }
            (Some(f), _) | (None, Some(f)) => f,
            (None, None) => {
                return Err(DrafterError::invalid(
                    "one of extension or content type is required",
                ));
            }
        };

        let graph = self.graph.clone().filter(|g| !g.is_empty());
        if graph.is_none() && !format.is_quads() {
            return Err(DrafterError::invalid(format!(
                "graph is required for triple format {}",
                format.mime_type()
            )));
        }

        let content_encoding = match self.content_encoding.as_deref() {
            Some(enc) => Some(ContentEncoding::parse(enc).ok_or_else(|| {
                DrafterError::invalid(format!(
                    "unsupported content encoding {:?} (expected gzip or x-gzip)",
                    enc
                ))
            })?),
            None => None,
        };

        Ok(Upload {
            format,
            graph,
            metadata: self.metadata.clone(),
            content_encoding,
        })
    }
}

/// A validated upload: what goes into the PUT headers and query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub format: RdfFormat,
    pub graph: Option<String>,
    pub metadata: Option<String>,
    pub content_encoding: Option<ContentEncoding>,
}

impl Upload {
    pub(crate) fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = Vec::new();
        if let Some(graph) = &self.graph {
            query.push(("graph", graph.as_str()));
        }
        if let Some(metadata) = &self.metadata {
            query.push(("metadata", metadata.as_str()));
        }
        query
    }
}
