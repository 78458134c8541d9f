// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Admission of untrusted hyperlinks.
//!
//! Two independent policies exist: [`LinkPolicy`] gates every link mark
//! (manual links, pasted `<a>` elements, markdown links) and
//! [`AutolinkPolicy`] decides whether a typed URL-like word becomes a link.
//! Each has its own domain denylist. Both fail closed: anything that does
//! not parse as a URL is rejected.

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").unwrap());

static BARE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(www\.)?[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}(?::\d+)?(?:[/?#]\S*)?$")
        .unwrap()
});

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LinkRejection {
    #[error("link is empty")]
    Empty,
    #[error("`{0}` is not a valid URL")]
    Unparseable(String),
    #[error("protocol `{0}` is not allowed")]
    DisallowedProtocol(String),
    #[error("domain `{0}` is not allowed")]
    DeniedDomain(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkAdmission {
    Accepted { href: String, protocol: String },
    Rejected(LinkRejection),
}

impl LinkAdmission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LinkAdmission::Accepted { .. })
    }
}

/// Scheme handling shared by both policies.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProtocolRules {
    pub default_protocol: String,
    pub allowed_protocols: Vec<String>,
    pub denied_protocols: Vec<String>,
}

impl Default for ProtocolRules {
    fn default() -> Self {
        Self {
            default_protocol: "https".to_owned(),
            allowed_protocols: [
                "http", "https", "ftp", "ftps", "mailto", "tel", "callto", "sms",
                "cid", "xmpp",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            denied_protocols: ["javascript", "data", "vbscript", "file"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ProtocolRules {
    fn normalize(&self, candidate: &str) -> Result<Url, LinkRejection> {
        let cleaned: String = candidate
            .chars()
            .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
            .collect();
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Err(LinkRejection::Empty);
        }

        let explicit_scheme = SCHEME
            .captures(cleaned)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|scheme| !scheme.contains('.'));
        let with_scheme = match explicit_scheme {
            Some(_) => cleaned.to_owned(),
            None if cleaned.starts_with("//") => {
                format!("{}:{cleaned}", self.default_protocol)
            }
            None => format!("{}://{cleaned}", self.default_protocol),
        };

        let url = Url::parse(&with_scheme)
            .map_err(|_| LinkRejection::Unparseable(cleaned.to_owned()))?;
        let scheme = url.scheme().to_ascii_lowercase();
        if self.denied_protocols.iter().any(|p| p.eq_ignore_ascii_case(&scheme))
            || !self
                .allowed_protocols
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&scheme))
        {
            return Err(LinkRejection::DisallowedProtocol(scheme));
        }
        Ok(url)
    }
}

fn check_domain(url: &Url, denied: &[String]) -> Result<(), LinkRejection> {
    let Some(host) = url.host_str() else {
        return Ok(());
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let blocked = denied.iter().any(|d| {
        let d = d.trim().trim_start_matches("*.").to_ascii_lowercase();
        !d.is_empty() && (host == d || host.ends_with(&format!(".{d}")))
    });
    if blocked {
        Err(LinkRejection::DeniedDomain(host))
    } else {
        Ok(())
    }
}

fn admit(
    rules: &ProtocolRules,
    denied_domains: &[String],
    candidate: &str,
) -> LinkAdmission {
    let result = rules
        .normalize(candidate)
        .and_then(|url| check_domain(&url, denied_domains).map(|_| url));
    match result {
        Ok(url) => LinkAdmission::Accepted {
            protocol: url.scheme().to_owned(),
            href: url.to_string(),
        },
        Err(reason) => {
            tracing::debug!(candidate, %reason, "link rejected");
            LinkAdmission::Rejected(reason)
        }
    }
}

/// Gate for every link mark entering the document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkPolicy {
    #[serde(flatten)]
    pub protocols: ProtocolRules,
    pub denied_domains: Vec<String>,
}

impl LinkPolicy {
    pub fn admit(&self, candidate: &str) -> LinkAdmission {
        admit(&self.protocols, &self.denied_domains, candidate)
    }
}

/// Decides whether a typed word is turned into a link automatically.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AutolinkPolicy {
    pub enabled: bool,
    #[serde(flatten)]
    pub protocols: ProtocolRules,
    pub denied_domains: Vec<String>,
}

impl Default for AutolinkPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            protocols: ProtocolRules::default(),
            denied_domains: Vec::new(),
        }
    }
}

/// A URL-like word found in text, as character offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutolinkCandidate {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl AutolinkPolicy {
    pub fn admit(&self, candidate: &str) -> LinkAdmission {
        if !self.enabled {
            return LinkAdmission::Rejected(LinkRejection::Empty);
        }
        let candidate = if is_email(candidate) {
            format!("mailto:{candidate}")
        } else {
            candidate.to_owned()
        };
        admit(&self.protocols, &self.denied_domains, &candidate)
    }

    /// Words in `text` that look like links and are followed by whitespace,
    /// so a word still being typed is left alone.
    pub fn find_candidates(&self, text: &str) -> Vec<AutolinkCandidate> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i].is_whitespace() {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            if i == chars.len() {
                break;
            }
            let mut end = i;
            while end > start && matches!(chars[end - 1], '.' | ',' | ';' | ':' | '!' | '?' | ')') {
                end -= 1;
            }
            let word: String = chars[start..end].iter().collect();
            if looks_like_link(&word) {
                out.push(AutolinkCandidate {
                    start,
                    end,
                    text: word,
                });
            }
        }
        out
    }
}

fn is_email(word: &str) -> bool {
    word.contains('@') && !word.contains(':') && EmailAddress::is_valid(word)
}

fn looks_like_link(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("ftp://")
        || BARE_DOMAIN.is_match(word)
        || is_email(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted_href(admission: LinkAdmission) -> String {
        match admission {
            LinkAdmission::Accepted { href, .. } => href,
            LinkAdmission::Rejected(reason) => panic!("rejected: {reason}"),
        }
    }

    #[test]
    fn javascript_is_rejected_on_both_paths() {
        let manual = LinkPolicy::default();
        let auto = AutolinkPolicy::default();
        for candidate in ["javascript:alert(1)", "  JavaScript:alert(1)", "java\tscript:alert(1)"] {
            assert!(matches!(
                manual.admit(candidate),
                LinkAdmission::Rejected(LinkRejection::DisallowedProtocol(_))
            ));
            assert!(!auto.admit(candidate).is_accepted());
        }
    }

    #[test]
    fn bare_hosts_get_the_default_protocol() {
        let policy = LinkPolicy::default();
        assert_eq!(accepted_href(policy.admit("example.com/a")), "https://example.com/a");
        assert_eq!(
            accepted_href(policy.admit("example.com:8080/x")),
            "https://example.com:8080/x"
        );
    }

    #[test]
    fn protocol_is_reported() {
        let admission = LinkPolicy::default().admit("mailto:someone@example.com");
        assert_eq!(
            admission,
            LinkAdmission::Accepted {
                href: "mailto:someone@example.com".to_owned(),
                protocol: "mailto".to_owned(),
            }
        );
    }

    #[test]
    fn unparseable_input_fails_closed() {
        let policy = LinkPolicy::default();
        assert!(matches!(
            policy.admit("http://[::1"),
            LinkAdmission::Rejected(LinkRejection::Unparseable(_))
        ));
        assert_eq!(policy.admit("   "), LinkAdmission::Rejected(LinkRejection::Empty));
    }

    #[test]
    fn domain_denylists_are_independent() {
        let manual = LinkPolicy {
            denied_domains: vec!["evil.test".to_owned()],
            ..LinkPolicy::default()
        };
        let auto = AutolinkPolicy {
            denied_domains: vec!["spam.test".to_owned()],
            ..AutolinkPolicy::default()
        };
        assert!(!manual.admit("https://cdn.evil.test/x").is_accepted());
        assert!(manual.admit("https://spam.test").is_accepted());
        assert!(auto.admit("https://evil.test").is_accepted());
        assert!(!auto.admit("spam.test").is_accepted());
        assert!(manual.admit("https://notevil.test").is_accepted());
    }

    #[test]
    fn candidates_need_a_trailing_space() {
        let policy = AutolinkPolicy::default();
        let found = policy.find_candidates("see www.example.com, or me@example.org now");
        let words: Vec<&str> = found.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(words, vec!["www.example.com", "me@example.org"]);
        assert_eq!(found[0].start, 4);
        assert!(policy.find_candidates("typing example.com").is_empty());
    }

    #[test]
    fn emails_become_mailto() {
        let admission = AutolinkPolicy::default().admit("me@example.org");
        assert_eq!(accepted_href(admission), "mailto:me@example.org");
    }
}
