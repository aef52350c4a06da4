//! WebFinger host matching.
//!
//! Allowed hosts are DNS names, optionally with a leading `*` label. A
//! wildcard entry answers for its parent domain and every subdomain of it.

/// A parsed DNS name: lowercased labels, no trailing dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsName {
    labels: Vec<String>,
}

/// DNS name parse errors.
#[derive(Debug, thiserror::Error)]
pub enum DnsNameError {
    #[error("empty name")]
    Empty,
    #[error("empty label")]
    EmptyLabel,
    #[error("label '{0}' contains invalid characters")]
    InvalidLabel(String),
    #[error("'*' is only permitted as the leftmost label")]
    MisplacedWildcard,
}

impl DnsName {
    /// Parse a textual DNS name such as `dept.example.com` or `*.example.com`.
    pub fn parse(name: &str) -> Result<Self, DnsNameError> {
        let name = name.trim().trim_end_matches('.').to_lowercase();
        if name.is_empty() {
            return Err(DnsNameError::Empty);
        }

        let labels: Vec<String> = name.split('.').map(|l| l.to_string()).collect();
        for (index, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(DnsNameError::EmptyLabel);
            }
            if label == "*" {
                if index != 0 {
                    return Err(DnsNameError::MisplacedWildcard);
                }
                continue;
            }
            if !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(DnsNameError::InvalidLabel(label.clone()));
            }
        }

        Ok(DnsName { labels })
    }

    /// Whether the leftmost label is `*`.
    pub fn is_wildcard(&self) -> bool {
        self.labels.first().is_some_and(|l| l == "*")
    }

    /// Number of labels after the wildcard, or all labels for plain names.
    pub fn label_count(&self) -> usize {
        if self.is_wildcard() {
            self.labels.len() - 1
        } else {
            self.labels.len()
        }
    }

    /// Whether this allow-list entry covers `host`.
    ///
    /// Plain entries match exactly. Wildcard entries match their parent
    /// domain and any subdomain of it.
    pub fn matches(&self, host: &DnsName) -> bool {
        if !self.is_wildcard() {
            return self.labels == host.labels;
        }

        let parent = &self.labels[1..];
        host.labels.len() >= parent.len() && host.labels[host.labels.len() - parent.len()..] == *parent
    }
}

impl std::fmt::Display for DnsName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.labels.join("."))
    }
}

/// Check a host against the configured allow-list.
pub fn host_is_allowed(host: &DnsName, allowed: &[DnsName]) -> bool {
    allowed.iter().any(|entry| entry.matches(host))
}

/// Split an `acct:` resource into its validated email parts.
///
/// Returns the (local, domain) pair. The local part must be non-empty and
/// the domain must parse as a DNS name.
pub fn parse_acct_resource(resource: &str) -> Result<(String, DnsName), String> {
    let email = resource
        .strip_prefix("acct:")
        .ok_or_else(|| "resource must start with 'acct:'".to_string())?;

    let (local, domain) = email
        .rsplit_once('@')
        .ok_or_else(|| "resource must be an email address".to_string())?;

    if local.is_empty() || local.chars().any(|c| c.is_whitespace()) {
        return Err("resource has an invalid local part".to_string());
    }

    let domain = DnsName::parse(domain).map_err(|e| format!("invalid domain: {}", e))?;
    if domain.is_wildcard() {
        return Err("resource domains cannot contain wildcards".to_string());
    }

    Ok((local.to_string(), domain))
}
