//! Focus mode: which domains to block and the browser rules that do it.

use serde::Serialize;

/// Domains blocked while focus mode is on.
pub const DISTRACTING_DOMAINS: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "reddit.com",
    "tiktok.com",
    "youtube.com",
    "netflix.com",
    "twitch.tv",
    "spotify.com",
    "hulu.com",
    "disneyplus.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockDecision {
    Allow,
    Block,
}

/// Decides whether `domain` is blocked. Subdomains of a listed domain are
/// blocked too; nothing is blocked while focus mode is off.
pub fn decide(domain: &str, focus_mode_enabled: bool) -> BlockDecision {
    if focus_mode_enabled && is_listed(domain) {
        BlockDecision::Block
    } else {
        BlockDecision::Allow
    }
}

/// Decision per domain, in input order.
pub fn decisions<'a, I>(domains: I, focus_mode_enabled: bool) -> Vec<(&'a str, BlockDecision)>
where
    I: IntoIterator<Item = &'a str>,
{
    domains
        .into_iter()
        .map(|domain| (domain, decide(domain, focus_mode_enabled)))
        .collect()
}

fn is_listed(domain: &str) -> bool {
    DISTRACTING_DOMAINS.iter().any(|listed| {
        domain == *listed
            || domain
                .strip_suffix(listed)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// A declarative network blocking rule, serialized in the shape browsers
/// accept for dynamic rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<String>,
}

/// Rules to install for the current toggle. Empty when disabled, so the
/// caller replaces whatever was installed before with exactly this set.
pub fn block_rules(focus_mode_enabled: bool) -> Vec<BlockRule> {
    if !focus_mode_enabled {
        return Vec::new();
    }
    (1..)
        .zip(DISTRACTING_DOMAINS)
        .map(|(id, domain)| BlockRule {
            id,
            priority: 1,
            action: RuleAction {
                kind: "block".to_string(),
            },
            condition: RuleCondition {
                url_filter: format!("*://*.{domain}/*"),
                resource_types: vec!["main_frame".to_string()],
            },
        })
        .collect()
}
