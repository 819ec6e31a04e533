pub mod checker;
pub mod config;
pub mod error;
pub mod mapping;
pub mod page;
pub mod parser;

pub use checker::{
    AppliedRuleMatch, QuickCheckResult, RuleEngine, RuleMatch, RuleMatchApplication,
    WikiQuickCheck,
};
pub use config::Config;
pub use error::{Error, Result};
pub use mapping::{PositionMap, SourcePosition, SourceText};
pub use page::{MediaWikiContent, PageFetcher};
pub use parser::{MarkupFilter, PlainTextMapping};
