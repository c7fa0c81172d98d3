//! Error taxonomy for the rowxml pipeline
//!
//! Every stage returns `PipelineError`. The first failing stage aborts the run;
//! nothing is retried or swallowed.

/// Structural transform failures (source document violates a rule's shape)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Matched element has no child to promote
    MissingChild {
        element: String,
        child: String,
        position: usize,
    },
    /// Matched element has more than one candidate child
    AmbiguousChild {
        element: String,
        child: String,
        position: usize,
        count: usize,
    },
    /// Child to promote carries element content of its own
    NestedChild {
        element: String,
        child: String,
        position: usize,
    },
    /// Matched element already has the target attribute
    AttributeConflict {
        element: String,
        attribute: String,
        position: usize,
    },
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::MissingChild { element, child, position } => write!(
                f,
                "<{}> #{} has no <{}> child",
                element, position, child
            ),
            TransformError::AmbiguousChild { element, child, position, count } => write!(
                f,
                "<{}> #{} has {} <{}> children, expected exactly one",
                element, position, count, child
            ),
            TransformError::NestedChild { element, child, position } => write!(
                f,
                "<{}> #{}: <{}> contains nested elements",
                element, position, child
            ),
            TransformError::AttributeConflict { element, attribute, position } => write!(
                f,
                "<{}> #{} already has attribute '{}'",
                element, position, attribute
            ),
        }
    }
}

impl std::error::Error for TransformError {}

#[derive(Debug)]
pub enum PipelineError {
    /// Row source unreachable or transactional failure (already rolled back)
    Source(String),
    /// Document could not be serialized
    Encoding(String),
    Transform(TransformError),
    /// Malformed document or unparseable integer text
    Parse(String),
    /// Malformed path expression
    Query(String),
    /// The two aggregators disagree
    Consistency { streaming: i64, query: i64 },
    Config(String),
    Io(std::io::Error),
    /// Blocking aggregator task failed to join
    Runtime(String),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::Source(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<TransformError> for PipelineError {
    fn from(err: TransformError) -> Self {
        PipelineError::Transform(err)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Source(e) => write!(f, "Row source error: {}", e),
            PipelineError::Encoding(e) => write!(f, "Encoding error: {}", e),
            PipelineError::Transform(e) => write!(f, "Transform error: {}", e),
            PipelineError::Parse(e) => write!(f, "Parse error: {}", e),
            PipelineError::Query(e) => write!(f, "Query error: {}", e),
            PipelineError::Consistency { streaming, query } => write!(
                f,
                "Consistency error: streaming sum {} != tree-query sum {}",
                streaming, query
            ),
            PipelineError::Config(e) => write!(f, "Configuration error: {}", e),
            PipelineError::Io(e) => write!(f, "IO error: {}", e),
            PipelineError::Runtime(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Transform(e) => Some(e),
            PipelineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_display() {
        let err = TransformError::AmbiguousChild {
            element: "entry".to_string(),
            child: "field".to_string(),
            position: 3,
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "<entry> #3 has 2 <field> children, expected exactly one"
        );

        let wrapped: PipelineError = err.into();
        assert!(wrapped.to_string().starts_with("Transform error:"));
    }

    #[test]
    fn test_consistency_display_names_both_sums() {
        let err = PipelineError::Consistency { streaming: 55, query: 54 };
        let msg = err.to_string();
        assert!(msg.contains("55"));
        assert!(msg.contains("54"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_source() {
        let err: PipelineError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, PipelineError::Source(_)));
    }
}
