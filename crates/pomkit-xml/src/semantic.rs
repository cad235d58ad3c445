use crate::tree::{NodeId, XmlTree};

/// Whether two documents carry the same content.
///
/// Whitespace-only text, comments and attribute order are ignored, as are
/// namespace declarations; element names are compared by namespace and local name.
pub fn semantically_equal(left: &XmlTree, right: &XmlTree) -> bool {
    match (left.root_element(), right.root_element()) {
        (Some(l), Some(r)) => elements_equal(left, l, right, r),
        (None, None) => true,
        _ => false,
    }
}

fn elements_equal(left: &XmlTree, l: NodeId, right: &XmlTree, r: NodeId) -> bool {
    let (Some(le), Some(re)) = (left.element(l), right.element(r)) else {
        return false;
    };
    if le.local_name() != re.local_name() || left.namespace_uri(l) != right.namespace_uri(r) {
        return false;
    }

    let mut l_attrs = significant_attributes(le.attributes());
    let mut r_attrs = significant_attributes(re.attributes());
    l_attrs.sort();
    r_attrs.sort();
    if l_attrs != r_attrs {
        return false;
    }

    if content_text(left, l) != content_text(right, r) {
        return false;
    }

    let l_children: Vec<_> = left.child_elements(l).collect();
    let r_children: Vec<_> = right.child_elements(r).collect();
    l_children.len() == r_children.len()
        && l_children
            .iter()
            .zip(&r_children)
            .all(|(lc, rc)| elements_equal(left, *lc, right, *rc))
}

fn significant_attributes(attributes: &[(String, String)]) -> Vec<(&str, &str)> {
    attributes
        .iter()
        .filter(|(k, _)| k != "xmlns" && !k.starts_with("xmlns:"))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn content_text(tree: &XmlTree, id: NodeId) -> String {
    tree.text(id).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equal(a: &str, b: &str) -> bool {
        semantically_equal(&XmlTree::parse(a).unwrap(), &XmlTree::parse(b).unwrap())
    }

    #[test]
    fn whitespace_comments_and_attribute_order_do_not_matter() {
        assert!(equal(
            "<a x='1' y='2'>\n  <!-- hi -->\n  <b> v </b>\n</a>",
            "<a y=\"2\" x=\"1\"><b>v</b></a>",
        ));
        assert!(equal("<a><b></b></a>", "<a><b/></a>"));
    }

    #[test]
    fn content_changes_are_detected() {
        assert!(!equal("<a><b>1</b></a>", "<a><b>2</b></a>"));
        assert!(!equal("<a><b/></a>", "<a><b/><c/></a>"));
        assert!(!equal("<a x='1'/>", "<a x='2'/>"));
    }

    #[test]
    fn prefixes_resolve_to_namespaces() {
        assert!(equal(
            "<p:a xmlns:p='urn:x'><p:b/></p:a>",
            "<a xmlns='urn:x'><b/></a>",
        ));
    }
}
