//! Translation between OpenID Connect scopes and GitHub OAuth scopes.

/// Mapped scope pairs, OIDC name first.
const SCOPE_MAP: [(&str, &str); 3] = [
    ("profile", "profile"),
    ("email", "user:email"),
    ("groups", "read:org"),
];

/// Target vocabulary for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFormat {
    OpenId,
    GitHub,
}

/// Split a space-delimited scope string into its members.
pub fn scope_to_list(scope: &str) -> Vec<String> {
    scope
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Join scopes into a space-delimited string.
pub fn list_to_scope(scopes: &[String]) -> String {
    scopes.join(" ")
}

/// Convert scopes to the target vocabulary.
///
/// Input is deduplicated; unknown scopes are dropped. `openid` has no GitHub
/// equivalent and disappears when converting outward.
pub fn convert_scopes(scopes: &[String], to_format: ScopeFormat) -> Vec<String> {
    let mut converted = Vec::new();
    for (oidc, github) in SCOPE_MAP {
        let (from, to) = match to_format {
            ScopeFormat::GitHub => (oidc, github),
            ScopeFormat::OpenId => (github, oidc),
        };
        if scopes.iter().any(|s| s == from) && !converted.contains(&to.to_string()) {
            converted.push(to.to_string());
        }
    }
    converted
}

/// Convert scopes and join them into a space-delimited string.
pub fn convert_scopes_to_string(scopes: &[String], to_format: ScopeFormat) -> String {
    list_to_scope(&convert_scopes(scopes, to_format))
}
