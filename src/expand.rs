//! # Partial Expansion
//!
//! Replaces `include` elements with positioned copies of the referenced
//! partial's elements. Nested includes are expanded as well; a partial that
//! reaches itself again is rejected.

use crate::error::FolioError;
use crate::template::{Element, Template};

/// Combine two optional conditions with `&&`.
pub fn conjoin(outer: Option<&str>, inner: Option<&str>) -> Option<String> {
    match (outer, inner) {
        (Some(a), Some(b)) => Some(format!("({}) && ({})", a, b)),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

/// The template's elements with every include inlined.
///
/// Unknown partial names contribute nothing.
pub fn expand_includes(template: &Template) -> Result<Vec<Element>, FolioError> {
    let mut out = Vec::with_capacity(template.elements.len());
    let mut stack = Vec::new();
    expand_into(&template.elements, template, &mut stack, &mut out)?;
    Ok(out)
}

fn expand_into<'a>(
    elements: &'a [Element],
    template: &'a Template,
    stack: &mut Vec<&'a str>,
    out: &mut Vec<Element>,
) -> Result<(), FolioError> {
    for element in elements {
        let Element::Include(include) = element else {
            out.push(element.clone());
            continue;
        };
        let name = include.reference.as_str();
        let Some(partial) = template.partials.get(name) else {
            tracing::debug!(include = %include.base.id, partial = name, "unknown partial skipped");
            continue;
        };
        if stack.contains(&name) {
            return Err(FolioError::CyclicPartial(name.to_string()));
        }

        stack.push(name);
        let mut children = Vec::with_capacity(partial.elements.len());
        expand_into(&partial.elements, template, stack, &mut children)?;
        stack.pop();

        let outer = &include.base;
        for mut child in children {
            let base = child.base_mut();
            base.id = format!("{}__{}", outer.id, base.id);
            base.x += outer.x;
            base.y += outer.y;
            if base.region.is_none() {
                base.region = outer.region;
            }
            base.visible_if = conjoin(outer.condition(), base.condition());
            out.push(child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Region;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn template(elements: serde_json::Value, partials: serde_json::Value) -> Template {
        Template::from_value(json!({
            "page": {"width": 595, "height": 842},
            "elements": elements,
            "partials": partials
        }))
        .unwrap()
    }

    #[test]
    fn test_include_inlines_partial() {
        let t = template(
            json!([
                {"type": "text", "id": "title", "text": "Invoice"},
                {"type": "include", "id": "bill", "ref": "address", "x": 100, "y": 50,
                 "region": "header", "visibleIf": "exists(customer)"},
                {"type": "include", "id": "ship", "ref": "address", "x": 300, "y": 50}
            ]),
            json!({"address": {"elements": [
                {"type": "text", "id": "street", "x": 5, "y": 10, "text": "{{customer.street}}",
                 "visibleIf": "exists(customer.street)"},
                {"type": "line", "id": "rule", "region": "footer"}
            ]}}),
        );
        let out = expand_includes(&t).unwrap();
        let ids: Vec<_> = out.iter().map(|e| e.id()).collect();
        assert_eq!(
            ids,
            vec!["title", "bill__street", "bill__rule", "ship__street", "ship__rule"]
        );

        let street = out[1].base();
        assert_eq!((street.x, street.y), (105.0, 60.0));
        assert_eq!(street.region(), Region::Header);
        assert_eq!(
            street.visible_if.as_deref(),
            Some("(exists(customer)) && (exists(customer.street))")
        );
        // child region wins over the include's
        assert_eq!(out[2].base().region(), Region::Footer);
        assert_eq!(out[3].base().visible_if.as_deref(), Some("exists(customer.street)"));
        assert_eq!(out[4].base().visible_if, None);
    }

    #[test]
    fn test_unknown_partial_contributes_nothing() {
        let t = template(
            json!([{"type": "include", "id": "x", "ref": "nope"}, {"type": "box", "id": "b"}]),
            json!({}),
        );
        let out = expand_includes(&t).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), "b");
    }

    #[test]
    fn test_nested_includes_compose() {
        let t = template(
            json!([{"type": "include", "id": "outer", "ref": "a", "x": 10, "y": 10}]),
            json!({
                "a": {"elements": [{"type": "include", "id": "mid", "ref": "b", "x": 1, "y": 2}]},
                "b": {"elements": [{"type": "box", "id": "leaf", "x": 100, "y": 100}]}
            }),
        );
        let out = expand_includes(&t).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), "outer__mid__leaf");
        assert_eq!((out[0].base().x, out[0].base().y), (111.0, 112.0));
    }

    #[test]
    fn test_cyclic_partial_rejected() {
        let t = template(
            json!([{"type": "include", "id": "root", "ref": "a"}]),
            json!({
                "a": {"elements": [{"type": "include", "id": "i", "ref": "b"}]},
                "b": {"elements": [{"type": "include", "id": "j", "ref": "a"}]}
            }),
        );
        match expand_includes(&t) {
            Err(FolioError::CyclicPartial(name)) => assert_eq!(name, "a"),
            other => panic!("expected cyclic error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_same_partial_twice_in_sequence_is_not_a_cycle() {
        let t = template(
            json!([{"type": "include", "id": "root", "ref": "a"}]),
            json!({
                "a": {"elements": [
                    {"type": "include", "id": "i1", "ref": "b"},
                    {"type": "include", "id": "i2", "ref": "b"}
                ]},
                "b": {"elements": [{"type": "box", "id": "leaf"}]}
            }),
        );
        assert_eq!(expand_includes(&t).unwrap().len(), 2);
    }
}
