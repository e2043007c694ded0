// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Subscription-proof checks for links posted in gated rooms.
//!
//! Each rule matches on the link's host and, when it names a marker, fails
//! for links that do not contain it. A rule without a marker inspects
//! matching links but never fails them.

use std::collections::BTreeSet;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{MIN_PROOF_LINKS, expand_env_vars};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofRule {
    pub label: String,
    pub domain: String,
    #[serde(default)]
    pub required_marker: Option<String>,
}

impl ProofRule {
    pub fn new(label: &str, domain: &str, required_marker: Option<&str>) -> Self {
        Self {
            label: label.to_string(),
            domain: domain.to_string(),
            required_marker: required_marker.map(ToOwned::to_owned),
        }
    }

    fn applies_to(&self, host: &str) -> bool {
        host.contains(self.domain.as_str())
    }

    fn fails(&self, link: &str) -> bool {
        self.required_marker
            .as_deref()
            .is_some_and(|marker| !link.contains(marker))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofRules {
    #[serde(default = "ProofRules::default_min_links")]
    pub min_links: usize,
    #[serde(default = "ProofRules::default_rules")]
    pub rules: Vec<ProofRule>,
}

impl Default for ProofRules {
    fn default() -> Self {
        Self {
            min_links: Self::default_min_links(),
            rules: Self::default_rules(),
        }
    }
}

impl ProofRules {
    fn default_min_links() -> usize {
        MIN_PROOF_LINKS
    }

    fn default_rules() -> Vec<ProofRule> {
        vec![
            ProofRule::new("Telegram", "t.me", Some("@")),
            ProofRule::new("YouTube", "youtube.com", Some("@")),
            // TODO: instagram proofs are accepted unchecked until the profile marker is agreed.
            ProofRule::new("Instagram", "instagram.com", None),
        ]
    }

    /// Parses a YAML rule file after expanding `${VAR}` references.
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded = expand_env_vars(raw);
        serde_yaml::from_str::<Self>(&expanded).context("invalid proof rules yaml")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub passed: bool,
    pub failed_requirements: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofVerdict {
    /// Too few links to be a proof submission; rules were not evaluated.
    InsufficientProofs { found: usize },
    Checked(ValidationResult),
}

#[derive(Debug, Clone, Default)]
pub struct ProofValidator {
    rules: ProofRules,
}

impl ProofValidator {
    pub fn new(rules: ProofRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ProofRules {
        &self.rules
    }

    /// Pulls the link tokens out of free chat text and validates them.
    pub fn validate_text(&self, text: &str) -> ProofVerdict {
        let links: Vec<&str> = extract_links(text).collect();
        self.validate(&links)
    }

    pub fn validate(&self, links: &[&str]) -> ProofVerdict {
        if links.len() < self.rules.min_links {
            return ProofVerdict::InsufficientProofs { found: links.len() };
        }

        let mut failed_requirements = BTreeSet::new();
        for link in links {
            let host = link_host(link);
            for rule in &self.rules.rules {
                if rule.applies_to(&host) && rule.fails(link) {
                    failed_requirements.insert(rule.label.clone());
                }
            }
        }

        ProofVerdict::Checked(ValidationResult {
            passed: failed_requirements.is_empty(),
            failed_requirements,
        })
    }
}

pub fn extract_links(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .filter(|token| token.starts_with("http"))
}

fn link_host(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(ToOwned::to_owned))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(verdict: ProofVerdict) -> ValidationResult {
        match verdict {
            ProofVerdict::Checked(result) => result,
            other => panic!("expected checked verdict, got {other:?}"),
        }
    }

    fn labels(result: &ValidationResult) -> Vec<&str> {
        result
            .failed_requirements
            .iter()
            .map(String::as_str)
            .collect()
    }

    const FILLER: [&str; 3] = [
        "https://example.com/a",
        "https://example.com/b",
        "https://example.com/c",
    ];

    fn with_filler(link: &'static str) -> Vec<&'static str> {
        let mut links = FILLER.to_vec();
        links.push(link);
        links
    }

    #[test]
    fn fewer_than_four_links_are_not_evaluated() {
        let validator = ProofValidator::default();
        let verdict = validator.validate_text("look https://t.me/x https://youtube.com/y https://t.me/z");
        assert_eq!(verdict, ProofVerdict::InsufficientProofs { found: 3 });
    }

    #[test]
    fn telegram_without_marker_fails() {
        let result = checked(ProofValidator::default().validate(&with_filler("https://t.me/x")));
        assert!(!result.passed);
        assert_eq!(labels(&result), vec!["Telegram"]);
    }

    #[test]
    fn telegram_with_marker_passes() {
        let result = checked(ProofValidator::default().validate(&with_filler("https://t.me/@sponsor")));
        assert!(result.passed);
    }

    #[test]
    fn youtube_without_marker_fails() {
        let result = checked(
            ProofValidator::default().validate(&with_filler("https://www.youtube.com/channel/x")),
        );
        assert_eq!(labels(&result), vec!["YouTube"]);
    }

    #[test]
    fn youtube_with_marker_passes() {
        let result = checked(ProofValidator::default().validate(&with_filler("https://youtube.com/@y")));
        assert!(result.passed);
    }

    #[test]
    fn instagram_never_fails() {
        let result = checked(ProofValidator::default().validate(&with_filler("https://instagram.com/z")));
        assert!(result.passed);
        assert!(result.failed_requirements.is_empty());
    }

    #[test]
    fn mixed_batch_reports_only_rules_that_fail() {
        let result = checked(ProofValidator::default().validate(&[
            "https://t.me/x",
            "https://youtube.com/@y",
            "https://instagram.com/z",
            "https://example.com/w",
        ]));
        assert!(!result.passed);
        assert_eq!(labels(&result), vec!["Telegram"]);
    }

    #[test]
    fn duplicate_failures_collapse() {
        let result = checked(ProofValidator::default().validate(&[
            "https://t.me/a",
            "https://t.me/b",
            "https://youtube.com/c",
            "https://youtube.com/d",
        ]));
        assert_eq!(labels(&result), vec!["Telegram", "YouTube"]);
    }

    #[test]
    fn domain_in_path_does_not_trigger_rule() {
        let result = checked(ProofValidator::default().validate(&with_filler("https://example.com/t.me")));
        assert!(result.passed);
    }

    #[test]
    fn extract_links_keeps_only_http_tokens() {
        let links: Vec<&str> =
            extract_links("proofs: https://t.me/@a http://x.org ftp://no plain").collect();
        assert_eq!(links, vec!["https://t.me/@a", "http://x.org"]);
    }

    #[test]
    fn rules_load_from_yaml_with_defaults() {
        let rules = ProofRules::from_yaml_str(
            "rules:\n  - label: Telegram\n    domain: t.me\n    required_marker: sponsor\n",
        )
        .unwrap();
        assert_eq!(rules.min_links, MIN_PROOF_LINKS);
        assert_eq!(rules.rules.len(), 1);

        let validator = ProofValidator::new(rules);
        let result = checked(validator.validate(&with_filler("https://t.me/sponsor_channel")));
        assert!(result.passed);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(ProofRules::from_yaml_str("rules: [unterminated").is_err());
    }
}
