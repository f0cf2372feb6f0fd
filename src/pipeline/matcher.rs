// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Rule matching
//!
//! Rules are kept in declaration order and the first rule whose `test` (and
//! `include`, if any) matches and whose `exclude` does not wins. Matching is
//! a pure function of the identifier and the rule list.

use regex::Regex;
use std::sync::Arc;

use super::NamingTemplate;
use crate::config::{AmbiguityPolicy, MatchingConfig, PipelineConfig, RuleConfig, UnmatchedPolicy};
use crate::errors::AssetflowError;
use crate::transforms::{build_step, Transform};

/// A compiled pattern-to-chain binding
pub struct Rule {
    name: String,
    test: Regex,
    include: Option<Regex>,
    exclude: Option<Regex>,
    steps: Vec<Arc<dyn Transform>>,
    filename: Option<NamingTemplate>,
}

impl Rule {
    /// Create a rule matching identifiers against `test`
    pub fn new(name: impl Into<String>, test: &str) -> Result<Self, AssetflowError> {
        let name = name.into();
        let test = compile(&name, test)?;
        Ok(Self {
            name,
            test,
            include: None,
            exclude: None,
            steps: Vec::new(),
            filename: None,
        })
    }

    /// Also require `pattern` to match
    pub fn include(mut self, pattern: &str) -> Result<Self, AssetflowError> {
        self.include = Some(compile(&self.name, pattern)?);
        Ok(self)
    }

    /// Veto the rule when `pattern` matches
    pub fn exclude(mut self, pattern: &str) -> Result<Self, AssetflowError> {
        self.exclude = Some(compile(&self.name, pattern)?);
        Ok(self)
    }

    /// Append a step to the chain
    pub fn step(mut self, step: Arc<dyn Transform>) -> Self {
        self.steps.push(step);
        self
    }

    /// Override the default naming template
    pub fn filename(mut self, template: NamingTemplate) -> Self {
        self.filename = Some(template);
        self
    }

    /// Compile a rule from config
    pub fn from_config(
        index: usize,
        rule: &RuleConfig,
        config: &PipelineConfig,
    ) -> Result<Self, AssetflowError> {
        let name = rule.display_name(index);
        if rule.steps.is_empty() {
            return Err(AssetflowError::InvalidConfig {
                reason: format!("rule '{}' has no steps", name),
                help: Some("Use '{ step: file }' to emit assets unchanged".into()),
            });
        }

        let mut compiled = Self::new(name, &rule.test)?;
        if let Some(include) = &rule.include {
            compiled = compiled.include(include)?;
        }
        if let Some(exclude) = &rule.exclude {
            compiled = compiled.exclude(exclude)?;
        }
        for step in rule.steps.as_slice() {
            compiled = compiled.step(build_step(step, config)?);
        }
        if let Some(filename) = &rule.filename {
            compiled = compiled.filename(NamingTemplate::parse(filename)?);
        }
        Ok(compiled)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Arc<dyn Transform>] {
        &self.steps
    }

    /// Rule-specific naming template, if any
    pub fn naming(&self) -> Option<&NamingTemplate> {
        self.filename.as_ref()
    }

    /// Whether this rule applies to an identifier
    pub fn matches(&self, id: &str) -> bool {
        if self.exclude.as_ref().is_some_and(|re| re.is_match(id)) {
            return false;
        }
        self.test.is_match(id) && self.include.as_ref().map_or(true, |re| re.is_match(id))
    }

    /// Fingerprints of every step, in order
    pub fn fingerprints(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.fingerprint()).collect()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("test", &self.test.as_str())
            .field("include", &self.include.as_ref().map(Regex::as_str))
            .field("exclude", &self.exclude.as_ref().map(Regex::as_str))
            .field("steps", &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("filename", &self.filename.as_ref().map(NamingTemplate::as_str))
            .finish()
    }
}

fn compile(rule: &str, pattern: &str) -> Result<Regex, AssetflowError> {
    Regex::new(pattern).map_err(|e| AssetflowError::InvalidPattern {
        rule: rule.to_string(),
        pattern: pattern.to_string(),
        error: e.to_string(),
    })
}

/// First rule in `rules` that applies to `id`
pub fn match_rule<'a>(id: &str, rules: &'a [Rule]) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(id))
}

/// Ordered rule list plus match policy
#[derive(Debug, Default)]
pub struct RuleMatcher {
    rules: Vec<Rule>,
    policy: MatchingConfig,
}

impl RuleMatcher {
    pub fn new(rules: Vec<Rule>, policy: MatchingConfig) -> Self {
        Self { rules, policy }
    }

    /// Compile every rule of a config
    pub fn from_config(config: &PipelineConfig) -> Result<Self, AssetflowError> {
        let rules = config
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| Rule::from_config(i, rule, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules, config.matching))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn policy(&self) -> MatchingConfig {
        self.policy
    }

    /// All rules that apply to `id`, in declaration order
    pub fn candidates(&self, id: &str) -> Vec<&Rule> {
        self.rules.iter().filter(|rule| rule.matches(id)).collect()
    }

    /// Select the rule for an asset according to the match policy
    ///
    /// `Ok(None)` means no rule applies and the policy allows it.
    pub fn find(&self, id: &str) -> Result<Option<&Rule>, AssetflowError> {
        let found = match self.policy.ambiguous {
            AmbiguityPolicy::First => match_rule(id, &self.rules),
            AmbiguityPolicy::Error => {
                let candidates = self.candidates(id);
                if candidates.len() > 1 {
                    return Err(AssetflowError::AmbiguousMatch {
                        asset: id.to_string(),
                        rules: candidates.iter().map(|r| r.name.clone()).collect(),
                    });
                }
                candidates.into_iter().next()
            }
        };

        match (found, self.policy.unmatched) {
            (None, UnmatchedPolicy::Error) => Err(AssetflowError::NoMatchingRule {
                asset: id.to_string(),
            }),
            (found, _) => Ok(found),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::FileStep;

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new("images", r"\.(png|jpe?g|gif|ico)$").unwrap(),
            Rule::new("styles", r"\.css$")
                .unwrap()
                .include("app/")
                .unwrap(),
            Rule::new("scripts", r"\.jsx?$")
                .unwrap()
                .exclude("node_modules")
                .unwrap(),
            Rule::new("fallback", ".*").unwrap(),
        ]
    }

    #[test]
    fn test_earlier_rule_wins() {
        let rules = rules();
        assert_eq!(match_rule("theme/sprite.png", &rules).unwrap().name(), "images");
        assert_eq!(match_rule("README.md", &rules).unwrap().name(), "fallback");
    }

    #[test]
    fn test_matching_is_deterministic() {
        let rules = rules();
        for id in ["app/main.jsx", "app/a.css", "x.mp3", "node_modules/react/index.js"] {
            let first = match_rule(id, &rules).map(Rule::name);
            let second = match_rule(id, &rules).map(Rule::name);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_exclude_overrides_include() {
        let rule = Rule::new("scripts", r"\.js$")
            .unwrap()
            .include("app/")
            .unwrap()
            .exclude("vendor")
            .unwrap();

        assert!(rule.matches("app/main.js"));
        assert!(!rule.matches("app/vendor/lib.js"));
        assert!(!rule.matches("lib/main.js"));
    }

    #[test]
    fn test_excluded_asset_falls_through() {
        let rules = rules();
        assert_eq!(
            match_rule("node_modules/react/index.js", &rules).unwrap().name(),
            "fallback"
        );
        assert_eq!(match_rule("lib/other.css", &rules).unwrap().name(), "fallback");
    }

    #[test]
    fn test_unmatched_policy() {
        let strict = RuleMatcher::new(
            vec![Rule::new("json", r"\.json$").unwrap()],
            MatchingConfig {
                unmatched: UnmatchedPolicy::Error,
                ambiguous: AmbiguityPolicy::First,
            },
        );
        assert!(matches!(
            strict.find("a.txt"),
            Err(AssetflowError::NoMatchingRule { .. })
        ));

        let lenient = RuleMatcher::new(
            vec![Rule::new("json", r"\.json$").unwrap()],
            MatchingConfig::default(),
        );
        assert!(lenient.find("a.txt").unwrap().is_none());
    }

    #[test]
    fn test_ambiguity_policy() {
        let matcher = RuleMatcher::new(
            rules(),
            MatchingConfig {
                unmatched: UnmatchedPolicy::Passthrough,
                ambiguous: AmbiguityPolicy::Error,
            },
        );

        match matcher.find("sprite.png") {
            Err(AssetflowError::AmbiguousMatch { rules, .. }) => {
                assert_eq!(rules, vec!["images", "fallback"]);
            }
            other => panic!("expected ambiguity error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Rule::new("broken", "(").unwrap_err();
        assert!(matches!(err, AssetflowError::InvalidPattern { .. }));
    }

    #[test]
    fn test_rule_debug_lists_steps() {
        let rule = Rule::new("images", r"\.png$").unwrap().step(Arc::new(FileStep));
        assert!(format!("{rule:?}").contains("file"));
        assert_eq!(rule.fingerprints(), vec!["file"]);
    }
}
