//! Tenant namespace used to partition uploaded documents and PDF viewer requests.

/// Canonical organization name: trimmed, lowercased, no leading or trailing
/// dots. Blank input has no namespace.
pub fn normalize(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    let name = name.trim_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Storage prefix for a document inside an organization.
pub fn namespaced_path(organization: Option<&str>, filename: &str) -> String {
    match organization.and_then(normalize) {
        Some(org) => format!("{org}/{filename}"),
        None => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_canonicalized() {
        assert_eq!(normalize("  ACME.Corp.. ").as_deref(), Some("acme.corp"));
        assert_eq!(normalize("..."), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn paths_gain_a_prefix_only_with_an_organization() {
        assert_eq!(namespaced_path(Some("Acme"), "a.pdf"), "acme/a.pdf");
        assert_eq!(namespaced_path(Some(""), "a.pdf"), "a.pdf");
        assert_eq!(namespaced_path(None, "a.pdf"), "a.pdf");
    }
}
