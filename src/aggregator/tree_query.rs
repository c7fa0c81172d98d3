//! Whole-tree aggregation through a path query

use super::path::PathQuery;
use super::{accumulate, parse_value};
use crate::document::read_document;
use crate::error::PipelineResult;
use std::io::BufRead;

/// Load the full document, select with `query`, sum the matches in document order
///
/// Elements the query does not select contribute nothing: an `entry` without a
/// `field` attribute is skipped here. `sum_streaming` rejects that shape, so a
/// full run fails on it before the two sums are compared.
pub fn sum_by_query<R: BufRead>(input: R, query: &PathQuery) -> PipelineResult<i64> {
    let doc = read_document(input)?;
    let matches = query.evaluate(&doc);

    let mut total: i64 = 0;
    for raw in &matches {
        total = accumulate(total, parse_value(raw)?)?;
    }

    log::debug!("🌳 Tree-query pass: {} matches for {}, sum={}", matches.len(), query, total);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FIELD_QUERY;
    use crate::error::PipelineError;

    fn default_query() -> PathQuery {
        PathQuery::compile(DEFAULT_FIELD_QUERY).unwrap()
    }

    #[test]
    fn test_sums_field_attributes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<entries>
  <entry field="5"/>
  <entry id="a" field="6"/>
</entries>
"#;
        assert_eq!(sum_by_query(xml.as_bytes(), &default_query()).unwrap(), 11);
    }

    #[test]
    fn test_empty_root_sums_to_zero() {
        assert_eq!(sum_by_query("<entries/>".as_bytes(), &default_query()).unwrap(), 0);
    }

    #[test]
    fn test_malformed_document_fails() {
        let err = sum_by_query("<entries><entry field=\"1\">".as_bytes(), &default_query()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_bad_value_fails() {
        let xml = r#"<entries><entry field="x"/></entries>"#;
        assert!(matches!(
            sum_by_query(xml.as_bytes(), &default_query()),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_entry_without_field_is_skipped() {
        let xml = r#"<entries><entry field="1"/><entry id="7"/><entry/></entries>"#;
        assert_eq!(sum_by_query(xml.as_bytes(), &default_query()).unwrap(), 1);
        assert!(matches!(
            crate::aggregator::sum_streaming(xml.as_bytes()),
            Err(PipelineError::Parse(_))
        ));
    }

    #[test]
    fn test_element_query_on_source_shape() {
        let xml = "<entries><entry><field>2</field></entry><entry><field>40</field></entry></entries>";
        let query = PathQuery::compile("//entries/entry/field").unwrap();
        assert_eq!(sum_by_query(xml.as_bytes(), &query).unwrap(), 42);
    }
}
