//! Typed errors for the deck crawler library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the
//! orchestration layer can match on failure kinds when it degrades a
//! failing unit to a skip.
//!
//! Two steady-state conditions deliberately have no variants here: a
//! card name absent from the identity table (the name passes through
//! unchanged) and a deck matching no classification rule (it gets the
//! sentinel label). Both are normal outcomes, not failures.

use thiserror::Error;

/// Errors raised while fetching rendered page content.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Named page region missing from the rendered document
    #[error("region {region:?} not found at {url}")]
    MissingRegion { region: String, url: String },

    /// Rendering did not finish in time
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Errors raised while parsing rendered deck-page sections.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Section text does not start with a `name (count)` heading line
    #[error("missing section heading: {snippet}")]
    MissingHeading { snippet: String },

    /// Heading names none of the five known categories
    #[error("unknown section heading: {heading}")]
    UnknownSection { heading: String },

    /// Same category rendered twice on one page
    #[error("duplicate section: {heading}")]
    DuplicateSection { heading: String },

    /// Line did not match the `name count` grammar
    #[error("malformed card line: {line}")]
    MalformedLine { line: String },

    /// Pokemon section line count not divisible by four
    #[error("ragged pokemon block: {lines} lines")]
    RaggedPokemonBlock { lines: usize },

    /// Sum of parsed copies disagrees with the declared heading count
    #[error("{section} section declares {declared} cards but {parsed} were parsed")]
    CountMismatch {
        section: String,
        declared: u32,
        parsed: u32,
    },
}

/// Errors raised while loading identity tables or rule sets.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON for the expected shape
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// One card name lists the same print code in two code groups
    #[error("code {code} appears in two code groups for {name}")]
    OverlappingCodeGroups { name: String, code: String },
}

/// Umbrella error for one crawl unit (one deck page, fetch through classify).
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Fetch stage failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Parse stage failed
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for parse operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for whole crawl units.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
