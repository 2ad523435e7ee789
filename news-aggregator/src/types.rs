use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a source identifier.
pub const MAX_SOURCE_LEN: usize = 20;

/// Short identifier for a news publisher, e.g. `bbc-world`.
///
/// Restricted to letters, digits, `-` and `_`, at most
/// [`MAX_SOURCE_LEN`] characters, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Source(String);

impl Source {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(AggregatorError::InvalidSource("empty name".to_string()));
        }
        if name.len() > MAX_SOURCE_LEN {
            return Err(AggregatorError::InvalidSource(format!(
                "{} exceeds {} characters",
                name, MAX_SOURCE_LEN
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AggregatorError::InvalidSource(format!(
                "{} contains characters outside [A-Za-z0-9_-]",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Source {
    type Error = AggregatorError;

    fn try_from(value: String) -> Result<Self> {
        Source::new(value)
    }
}

impl From<Source> for String {
    fn from(value: Source) -> Self {
        value.0
    }
}

/// Payload format of a [`Resource`].
///
/// `Unknown` is a sentinel used only to report parsing failure; it is
/// never registered in the parser factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    Rss,
    Json,
    Html,
    Unknown,
}

impl Format {
    /// Parses a user-supplied format value, case-insensitively.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "rss" => Ok(Format::Rss),
            "json" => Ok(Format::Json),
            "html" => Ok(Format::Html),
            other => Err(AggregatorError::InvalidConfiguration(format!(
                "unsupported format: {}",
                other
            ))),
        }
    }

    /// Snapshot file extension for payloads of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Rss => "xml",
            Format::Json => "json",
            Format::Html => "html",
            Format::Unknown => "",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Rss => "RSS",
            Format::Json => "JSON",
            Format::Html => "HTML",
            Format::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Opaque non-empty payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content(Vec<u8>);

impl Content {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(AggregatorError::InvalidConfiguration(
                "empty content".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Raw payload tagged with its source and format.
///
/// All three fields are non-empty by construction and immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    source: Source,
    format: Format,
    content: Content,
}

impl Resource {
    pub fn new(source: Source, format: Format, content: Content) -> Self {
        Self {
            source,
            format,
            content,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn content(&self) -> &[u8] {
        self.content.as_bytes()
    }
}

/// Normalized news item produced by the parsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub creation_date: DateTime<Utc>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Article {
    pub fn builder() -> ArticleBuilder {
        ArticleBuilder::default()
    }

    /// Human-readable creation date, RFC822 in the local time zone.
    pub fn human_date(&self) -> String {
        self.creation_date.with_timezone(&Local).to_rfc2822()
    }
}

/// Builder enforcing the article invariants at `build` time.
#[derive(Debug, Default)]
pub struct ArticleBuilder {
    title: Option<String>,
    description: Option<String>,
    creation_date: Option<DateTime<Utc>>,
    source: Option<String>,
    author: Option<String>,
    link: Option<String>,
}

impl ArticleBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Returns the article, or the first violated invariant.
    pub fn build(self) -> Result<Article> {
        let title = match self.title {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AggregatorError::MissingTitle),
        };
        let description = match self.description {
            Some(d) if !d.is_empty() => d,
            _ => return Err(AggregatorError::MissingDescription),
        };
        let creation_date = match self.creation_date {
            Some(d) if d.timestamp() != 0 || d.timestamp_subsec_nanos() != 0 => d,
            _ => return Err(AggregatorError::MissingDate),
        };
        let source = match self.source {
            Some(s) if !s.is_empty() => s,
            _ => return Err(AggregatorError::MissingSource),
        };
        Ok(Article {
            title,
            description,
            creation_date,
            source,
            author: self.author.filter(|a| !a.is_empty()),
            link: self.link.filter(|l| !l.is_empty()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("article is missing a title")]
    MissingTitle,

    #[error("article is missing a description")]
    MissingDescription,

    #[error("article is missing a creation date")]
    MissingDate,

    #[error("article is missing a source")]
    MissingSource,

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unparseable date: {0}")]
    UnparseableDate(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("no parser registered for {format}/{source_name}")]
    NoParserForKey { format: Format, source_name: String },

    #[error("no articles found")]
    NoArticlesFound,

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("invalid source name: {0}")]
    InvalidSource(String),

    #[error("storage I/O: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("remote fetch: {0}")]
    RemoteFetch(String),

    #[error("{0} sources cannot be refreshed remotely")]
    FormatNotRemotelyRefreshable(Format),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("dictionary serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
