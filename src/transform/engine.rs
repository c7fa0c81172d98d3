//! Rule interpreter
//!
//! Walks the document once and rebuilds it, applying whichever `PromoteRule`
//! names each element. The input tree is never mutated.

use super::ruleset::TransformRuleSet;
use crate::document::{Document, Element, Node};
use crate::error::TransformError;
use std::collections::HashMap;

/// Apply `rules` to `doc`, returning the restructured copy
pub fn apply(doc: &Document, rules: &TransformRuleSet) -> Result<Document, TransformError> {
    let mut rewriter = Rewriter {
        rules,
        seen: HashMap::new(),
    };
    let root = rewriter.rewrite(&doc.root)?;

    log::debug!(
        "🔁 Rule set '{}' applied ({} elements rewritten)",
        rules.name,
        rewriter.seen.values().sum::<usize>()
    );
    Ok(Document::new(root))
}

struct Rewriter<'r> {
    rules: &'r TransformRuleSet,
    /// 1-based position of the last matched element, per element name
    seen: HashMap<&'r str, usize>,
}

impl<'r> Rewriter<'r> {
    fn rewrite(&mut self, element: &Element) -> Result<Element, TransformError> {
        let rules = self.rules;
        let Some(rule) = rules.rule_for(&element.name) else {
            return self.copy(element);
        };

        let position = {
            let counter = self.seen.entry(rule.element.as_str()).or_insert(0);
            *counter += 1;
            *counter
        };

        let count = element
            .child_elements()
            .filter(|child| child.name == rule.promote_child)
            .count();

        match count {
            0 => {
                return Err(TransformError::MissingChild {
                    element: rule.element.clone(),
                    child: rule.promote_child.clone(),
                    position,
                })
            }
            1 => {}
            count => {
                return Err(TransformError::AmbiguousChild {
                    element: rule.element.clone(),
                    child: rule.promote_child.clone(),
                    position,
                    count,
                })
            }
        }

        if element.attribute(&rule.as_attribute).is_some() {
            return Err(TransformError::AttributeConflict {
                element: rule.element.clone(),
                attribute: rule.as_attribute.clone(),
                position,
            });
        }

        let mut out = Element {
            name: element.name.clone(),
            attributes: element.attributes.clone(),
            children: Vec::with_capacity(element.children.len().saturating_sub(1)),
        };

        for child in &element.children {
            match child {
                Node::Element(e) if e.name == rule.promote_child => {
                    if e.child_elements().next().is_some() {
                        return Err(TransformError::NestedChild {
                            element: rule.element.clone(),
                            child: rule.promote_child.clone(),
                            position,
                        });
                    }
                    out.attributes.push((rule.as_attribute.clone(), e.text()));
                }
                Node::Element(e) => out.children.push(Node::Element(self.rewrite(e)?)),
                Node::Text(t) => out.children.push(Node::Text(t.clone())),
            }
        }

        Ok(out)
    }

    fn copy(&mut self, element: &Element) -> Result<Element, TransformError> {
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(match child {
                Node::Element(e) => Node::Element(self.rewrite(e)?),
                Node::Text(t) => Node::Text(t.clone()),
            });
        }

        Ok(Element {
            name: element.name.clone(),
            attributes: element.attributes.clone(),
            children,
        })
    }
}
