pub mod projection;

use crate::error::{Error, Result};
use crate::mapping::{PositionMap, SourceText};
use crate::page::{MediaWikiContent, PageFetcher};
use crate::parser::{MarkupFilter, PlainTextMapping};
use crate::Config;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

pub use projection::RuleMatchApplication;

/// A problem reported by a rule engine, in plain-text coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Zero-based char offset of the first matched char
    pub start: usize,
    /// Zero-based char offset just past the match
    pub end: usize,
    pub message: String,
    /// Suggested replacements, best first
    pub suggestions: Vec<String>,
}

impl RuleMatch {
    pub fn new(start: usize, end: usize, message: impl Into<String>) -> Self {
        Self {
            start,
            end,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }
}

/// The language checker the plain text is handed to.
pub trait RuleEngine {
    /// Check `plain_text` with the rule set selected by `language`
    fn check(&self, plain_text: &str, language: &str) -> anyhow::Result<Vec<RuleMatch>>;
}

impl<F> RuleEngine for F
where
    F: Fn(&str, &str) -> anyhow::Result<Vec<RuleMatch>>,
{
    fn check(&self, plain_text: &str, language: &str) -> anyhow::Result<Vec<RuleMatch>> {
        self(plain_text, language)
    }
}

/// A rule match with one application per suggested replacement.
#[derive(Debug, Clone)]
pub struct AppliedRuleMatch {
    pub rule_match: RuleMatch,
    pub applications: Vec<RuleMatchApplication>,
}

#[derive(Debug, Clone)]
pub struct QuickCheckResult {
    pub url: String,
    pub original_text: Arc<SourceText>,
    pub plain_text: String,
    pub position_map: PositionMap,
    /// Passed through from the page metadata unparsed
    pub last_edit_timestamp: String,
    /// Configured number of context chars for snippets
    pub context_size: usize,
    pub applied_rule_matches: Vec<AppliedRuleMatch>,
}

/// Checks wiki pages: filters markup to plain text, runs the rule engine and
/// projects its matches back onto the markup.
pub struct WikiQuickCheck {
    filter: MarkupFilter,
    language: String,
    context_size: usize,
}

impl Default for WikiQuickCheck {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl WikiQuickCheck {
    pub fn new(config: &Config) -> Self {
        Self {
            filter: MarkupFilter::new(config),
            language: config.language.clone(),
            context_size: config.context_size,
        }
    }

    /// Build from the layered configuration files, see [`Config::load`]
    pub fn from_config_files(explicit: Option<&Path>) -> Result<Self> {
        let config = Config::load(explicit).map_err(Error::Config)?;
        tracing::debug!(
            language = %config.language,
            context_size = config.context_size,
            "loaded configuration"
        );
        Ok(Self::new(&config))
    }

    pub fn filter(&self) -> &MarkupFilter {
        &self.filter
    }

    /// The configured rule set selector, handed to the engine on every check
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn plain_text(&self, markup: &str) -> String {
        self.filter.filter(markup).plain_text
    }

    pub fn plain_text_mapping(&self, markup: &str) -> PlainTextMapping {
        self.filter.filter(markup)
    }

    /// Filter `content`, run `engine` with the configured language over the
    /// plain text and project every match back onto the markup
    pub fn check_markup(
        &self,
        url: &str,
        content: &MediaWikiContent,
        engine: &dyn RuleEngine,
    ) -> Result<QuickCheckResult> {
        let PlainTextMapping {
            plain_text,
            position_map,
        } = self.filter.filter(&content.content);
        let original_text = Arc::new(SourceText::new(content.content.as_str()));
        let shared_plain: Arc<str> = Arc::from(plain_text.as_str());

        let rule_matches = engine
            .check(&plain_text, &self.language)
            .map_err(Error::RuleEngine)?;

        let mut applied_rule_matches = Vec::with_capacity(rule_matches.len());
        for rule_match in rule_matches {
            let replacements: Vec<Option<String>> = if rule_match.suggestions.is_empty() {
                vec![None]
            } else {
                rule_match.suggestions.iter().cloned().map(Some).collect()
            };

            let applications = replacements
                .into_iter()
                .map(|replacement| {
                    RuleMatchApplication::new(
                        Arc::clone(&original_text),
                        Arc::clone(&shared_plain),
                        &position_map,
                        &rule_match,
                        replacement,
                    )
                })
                .collect::<Result<Vec<_>>>()?;

            applied_rule_matches.push(AppliedRuleMatch {
                rule_match,
                applications,
            });
        }

        tracing::debug!(
            url,
            language = %self.language,
            matches = applied_rule_matches.len(),
            applications = applied_rule_matches
                .iter()
                .map(|applied| applied.applications.len())
                .sum::<usize>(),
            "checked page"
        );

        Ok(QuickCheckResult {
            url: url.to_string(),
            original_text,
            plain_text,
            position_map,
            last_edit_timestamp: content.timestamp.clone(),
            context_size: self.context_size,
            applied_rule_matches,
        })
    }

    /// Fetch the page at `url` and check it. A missing page is reported as
    /// [`Error::PageNotFound`] straight from the fetcher.
    pub fn check_page(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
        engine: &dyn RuleEngine,
    ) -> Result<QuickCheckResult> {
        let content = fetcher.fetch(url)?;
        self.check_markup(url, &content, engine)
    }

    /// Check independent pages in parallel, one result per page in input order
    pub fn check_pages<E>(
        &self,
        pages: &[(String, MediaWikiContent)],
        engine: &E,
    ) -> Vec<Result<QuickCheckResult>>
    where
        E: RuleEngine + Sync,
    {
        pages
            .par_iter()
            .map(|(url, content)| self.check_markup(url, content, engine))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_matches(_: &str, _: &str) -> anyhow::Result<Vec<RuleMatch>> {
        Ok(Vec::new())
    }

    #[test]
    fn test_rule_match_builder() {
        let rule_match = RuleMatch::new(1, 4, "Tippfehler").with_suggestions(["ab", "cd"]);
        assert_eq!(rule_match.suggestions, vec!["ab", "cd"]);
        assert_eq!(rule_match.message, "Tippfehler");
    }

    #[test]
    fn test_one_application_per_suggestion() {
        let check = WikiQuickCheck::default();
        let content = MediaWikiContent::new("Ein Fehlr hier.", "2012-11-11T20:00:00");
        let engine = |_: &str, _: &str| -> anyhow::Result<Vec<RuleMatch>> {
            Ok(vec![RuleMatch::new(4, 9, "Tippfehler").with_suggestions(["Fehler", "Fehl"])])
        };

        let result = check
            .check_markup("http://fake-url.org", &content, &engine)
            .unwrap();
        let applied = &result.applied_rule_matches[0];
        assert_eq!(applied.applications.len(), 2);
        assert_eq!(applied.applications[0].replacement(), Some("Fehler"));
        assert_eq!(applied.applications[1].replacement(), Some("Fehl"));
        assert!(applied.applications.iter().all(|a| a.has_real_replacement()));
    }

    #[test]
    fn test_match_without_suggestions_gets_pseudo_application() {
        let check = WikiQuickCheck::default();
        let content = MediaWikiContent::new("Ein Fehlr hier.", "ts");
        let engine = |_: &str, _: &str| -> anyhow::Result<Vec<RuleMatch>> {
            Ok(vec![RuleMatch::new(4, 9, "Tippfehler")])
        };

        let result = check.check_markup("u", &content, &engine).unwrap();
        let applications = &result.applied_rule_matches[0].applications;
        assert_eq!(applications.len(), 1);
        assert!(!applications[0].has_real_replacement());
    }

    #[test]
    fn test_engine_receives_plain_text_and_language() {
        let check = WikiQuickCheck::default();
        let content = MediaWikiContent::new("Test [[Link]] Foo", "ts");
        let engine = |text: &str, language: &str| -> anyhow::Result<Vec<RuleMatch>> {
            assert_eq!(text, "Test Link Foo");
            assert_eq!(language, "en");
            Ok(Vec::new())
        };
        let result = check.check_markup("u", &content, &engine).unwrap();
        assert!(result.applied_rule_matches.is_empty());
        assert_eq!(result.context_size, 25);
    }

    #[test]
    fn test_configured_language_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wikicheck.toml");
        std::fs::write(&path, "language = \"pt-PT\"\n").unwrap();
        let check = WikiQuickCheck::from_config_files(Some(&path)).unwrap();

        let seen = std::sync::Mutex::new(Vec::new());
        let engine = |_: &str, language: &str| -> anyhow::Result<Vec<RuleMatch>> {
            seen.lock().unwrap().push(language.to_string());
            Ok(Vec::new())
        };
        let pages = vec![
            ("a".to_string(), MediaWikiContent::new("Um texto.", "ts")),
            ("b".to_string(), MediaWikiContent::new("Outro texto.", "ts")),
        ];
        check.check_markup("u", &pages[0].1, &engine).unwrap();
        for result in check.check_pages(&pages, &engine) {
            result.unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), vec!["pt-PT"; 3]);
    }

    #[test]
    fn test_engine_failure_is_propagated() {
        let check = WikiQuickCheck::default();
        let content = MediaWikiContent::new("Text", "ts");
        let engine = |_: &str, _: &str| -> anyhow::Result<Vec<RuleMatch>> {
            anyhow::bail!("rule engine unavailable")
        };
        let err = check.check_markup("u", &content, &engine).unwrap_err();
        assert!(matches!(err, Error::RuleEngine(_)));
        assert_eq!(err.to_string(), "rule engine unavailable");
    }

    #[test]
    fn test_mismatched_span_halts_the_page() {
        let check = WikiQuickCheck::default();
        let content = MediaWikiContent::new("kurz", "ts");
        let engine = |_: &str, _: &str| -> anyhow::Result<Vec<RuleMatch>> {
            Ok(vec![RuleMatch::new(0, 40, "zu lang")])
        };
        assert!(matches!(
            check.check_markup("u", &content, &engine),
            Err(Error::InvalidSpan { .. })
        ));
    }

    #[test]
    fn test_insertion_at_end_does_not_halt_the_page() {
        let check = WikiQuickCheck::default();
        let content = MediaWikiContent::new("Ein Satz ohne Punkt\n", "ts");
        let engine = |text: &str, _: &str| -> anyhow::Result<Vec<RuleMatch>> {
            let len = text.chars().count();
            Ok(vec![RuleMatch::new(len, len, "Satzende").with_suggestions(["."])])
        };

        let result = check.check_markup("u", &content, &engine).unwrap();
        let application = &result.applied_rule_matches[0].applications[0];
        assert_eq!(
            application.corrected_error_context(5),
            "Punkt<span class=\"error\">.</span>\n"
        );
    }

    #[test]
    fn test_check_pages_keeps_order() {
        let check = WikiQuickCheck::default();
        let pages: Vec<(String, MediaWikiContent)> = (0..8)
            .map(|i| (format!("page-{i}"), MediaWikiContent::new(format!("Seite [[{i}]]"), "ts")))
            .collect();

        let results = check.check_pages(&pages, &no_matches);
        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            let result = result.as_ref().unwrap();
            assert_eq!(result.url, format!("page-{i}"));
            assert_eq!(result.plain_text, format!("Seite {i}"));
        }
    }

    #[test]
    fn test_from_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wikicheck.toml");
        std::fs::write(&path, "language = \"de-DE\"\ncontext_size = 10\n").unwrap();

        let check = WikiQuickCheck::from_config_files(Some(&path)).unwrap();
        assert_eq!(check.language(), "de-DE");
        assert_eq!(check.context_size, 10);

        std::fs::write(&path, "context_size = \"zehn\"").unwrap();
        assert!(matches!(
            WikiQuickCheck::from_config_files(Some(&path)),
            Err(Error::Config(_))
        ));
    }
}
