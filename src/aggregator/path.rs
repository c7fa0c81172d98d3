//! Compiled path expressions over `Document`
//!
//! Supported grammar (an abbreviated-XPath subset):
//!
//! ```text
//! path      := ('/' | '//')? step (('/' | '//') step)* (('/' | '//') attr)?
//!            | ('/' | '//')? attr
//! step      := name | '*'
//! attr      := '@' (name | '*')
//! ```
//!
//! `//` selects descendants at any depth, so `//entries/entry/@field` matches
//! however deeply `entries` is wrapped.

use crate::document::codec::is_xml_name;
use crate::document::{Document, Element};
use crate::error::{PipelineError, PipelineResult};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Named(String),
}

impl NameTest {
    fn parse(raw: &str, expr: &str) -> PipelineResult<Self> {
        if raw == "*" {
            return Ok(NameTest::Any);
        }

        if is_xml_name(raw) {
            Ok(NameTest::Named(raw.to_string()))
        } else {
            Err(PipelineError::Query(format!(
                "invalid name test {:?} in {:?}",
                raw, expr
            )))
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Named(n) => n == name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
}

/// A validated path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    expr: String,
    steps: Vec<Step>,
    attribute: Option<Step>,
}

impl PathQuery {
    /// Compile `expr`; malformed expressions are a `QueryError`
    pub fn compile(expr: &str) -> PipelineResult<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::Query("empty path expression".to_string()));
        }

        let (mut axis, mut rest) = if let Some(r) = trimmed.strip_prefix("//") {
            (Axis::Descendant, r)
        } else if let Some(r) = trimmed.strip_prefix('/') {
            (Axis::Child, r)
        } else {
            (Axis::Child, trimmed)
        };

        let mut steps = Vec::new();
        let mut attribute = None;

        loop {
            let (segment, remainder) = match rest.find('/') {
                Some(i) => (&rest[..i], Some(&rest[i..])),
                None => (rest, None),
            };

            if segment.is_empty() {
                return Err(PipelineError::Query(format!("empty step in {:?}", expr)));
            }

            if let Some(name) = segment.strip_prefix('@') {
                if remainder.is_some() {
                    return Err(PipelineError::Query(format!(
                        "attribute step must be last in {:?}",
                        expr
                    )));
                }
                attribute = Some(Step {
                    axis,
                    test: NameTest::parse(name, expr)?,
                });
                break;
            }

            steps.push(Step {
                axis,
                test: NameTest::parse(segment, expr)?,
            });

            match remainder {
                None => break,
                Some(r) => {
                    (axis, rest) = match r.strip_prefix("//") {
                        Some(after) => (Axis::Descendant, after),
                        None => (Axis::Child, &r[1..]),
                    };
                }
            }
        }

        Ok(Self {
            expr: trimmed.to_string(),
            steps,
            attribute,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// String values of every match, in document order
    ///
    /// Attribute matches yield the attribute value; element matches yield their text.
    pub fn evaluate<'d>(&self, doc: &'d Document) -> Vec<Cow<'d, str>> {
        let flat = Flattened::new(&doc.root);

        // None is the document node itself
        let mut context: Option<Vec<usize>> = None;

        for step in &self.steps {
            let candidates = match step.axis {
                Axis::Child => flat.children(context.as_deref()),
                Axis::Descendant => flat.descendants(context.as_deref(), false),
            };
            context = Some(
                candidates
                    .into_iter()
                    .filter(|&i| step.test.matches(&flat.nodes[i].name))
                    .collect(),
            );
        }

        match &self.attribute {
            Some(step) => {
                let owners = match step.axis {
                    Axis::Child => context.unwrap_or_default(),
                    Axis::Descendant => flat.descendants(context.as_deref(), true),
                };
                owners
                    .into_iter()
                    .flat_map(|i| {
                        let owner: &'d Element = flat.nodes[i];
                        owner
                            .attributes
                            .iter()
                            .filter(|(key, _)| step.test.matches(key))
                            .map(|(_, value)| Cow::Borrowed(value.as_str()))
                    })
                    .collect()
            }
            None => context
                .unwrap_or_default()
                .into_iter()
                .map(|i| Cow::Owned(flat.nodes[i].text()))
                .collect(),
        }
    }
}

impl std::fmt::Display for PathQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expr)
    }
}

/// Elements in document (pre-)order with subtree sizes
struct Flattened<'d> {
    nodes: Vec<&'d Element>,
    /// Elements in the subtree rooted at each node, itself included
    sizes: Vec<usize>,
}

impl<'d> Flattened<'d> {
    fn new(root: &'d Element) -> Self {
        let mut flat = Self {
            nodes: Vec::new(),
            sizes: Vec::new(),
        };
        flat.push(root);
        flat
    }

    fn push(&mut self, element: &'d Element) -> usize {
        let index = self.nodes.len();
        self.nodes.push(element);
        self.sizes.push(1);

        let mut size = 1;
        for child in element.child_elements() {
            size += self.push(child);
        }
        self.sizes[index] = size;
        size
    }

    fn children(&self, context: Option<&[usize]>) -> Vec<usize> {
        let Some(context) = context else {
            return vec![0];
        };

        let mut out = Vec::new();
        for &parent in context {
            let end = parent + self.sizes[parent];
            let mut child = parent + 1;
            while child < end {
                out.push(child);
                child += self.sizes[child];
            }
        }
        sorted_unique(out)
    }

    fn descendants(&self, context: Option<&[usize]>, include_self: bool) -> Vec<usize> {
        let Some(context) = context else {
            return (0..self.nodes.len()).collect();
        };

        let offset = usize::from(!include_self);
        let mut out = Vec::new();
        for &node in context {
            out.extend(node + offset..node + self.sizes[node]);
        }
        sorted_unique(out)
    }
}

fn sorted_unique(mut indices: Vec<usize>) -> Vec<usize> {
    indices.sort_unstable();
    indices.dedup();
    indices
}
