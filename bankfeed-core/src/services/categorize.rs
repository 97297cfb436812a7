//! Categorization strategies
//!
//! `RuleCategorizer` matches lowercase keywords against the description in a
//! fixed category order; the first category with a hit wins. The
//! `DelegatedCategorizer` asks a text-generation service for one label and
//! degrades to `Uncategorized` on any failure. Income never reaches either.

use std::sync::Arc;

use crate::domain::Category;
use crate::ports::{Categorizer, TextGenerator};

/// Keyword table, evaluated top to bottom.
///
/// Substring matching is deliberate and order matters: "UBER EATS" is
/// Transport (uber) before it is Dining, and "coffee" hits Bills via "ee".
pub const KEYWORD_RULES: &[(Category, &[&str])] = &[
    (
        Category::Groceries,
        &["tesco", "asda", "sainsbury", "morrisons", "aldi", "lidl", "waitrose", "co-op"],
    ),
    (
        Category::Transport,
        &[
            "uber", "lyft", "train", "bus", "tfl", "transport", "parking", "petrol", "shell",
            "bp", "esso",
        ],
    ),
    (
        Category::Bills,
        &[
            "bill", "electric", "gas", "water", "council tax", "internet", "phone", "vodafone",
            "ee", "three", "o2",
        ],
    ),
    (
        Category::Entertainment,
        &["netflix", "spotify", "amazon prime", "disney", "cinema", "theatre", "gym"],
    ),
    (
        Category::Dining,
        &[
            "restaurant", "cafe", "coffee", "starbucks", "costa", "mcdonald", "kfc", "pizza",
            "deliveroo", "uber eats", "just eat",
        ],
    ),
    (
        Category::Shopping,
        &["amazon", "ebay", "shop", "store", "retail", "argos", "currys", "john lewis"],
    ),
];

/// Static keyword rules
#[derive(Debug, Clone, Copy)]
pub struct RuleCategorizer {
    rules: &'static [(Category, &'static [&'static str])],
}

impl RuleCategorizer {
    pub fn new() -> Self {
        Self {
            rules: KEYWORD_RULES,
        }
    }

    /// First category in table order with a keyword inside `description`
    pub fn match_keywords(&self, description: &str) -> Option<Category> {
        let lowered = description.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| *category)
    }
}

impl Default for RuleCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Categorizer for RuleCategorizer {
    fn name(&self) -> &str {
        "rules"
    }

    fn categorize(&self, description: &str) -> Category {
        self.match_keywords(description).unwrap_or(Category::Unclear)
    }
}

/// Default model for delegated categorization
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Build the closed-label prompt for one description
pub fn build_prompt(description: &str) -> String {
    let labels: Vec<&str> = Category::SPENDING.iter().map(|c| c.as_str()).collect();
    format!(
        "Categorize this UK bank transaction into exactly one of: {}.\n\
         Transaction: \"{}\"\n\
         Reply with the category name only. If unsure, reply Uncategorized.",
        labels.join(", "),
        description
    )
}

/// Categorization delegated to an external text-generation service
pub struct DelegatedCategorizer {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl DelegatedCategorizer {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Map a model reply onto the closed label set
    ///
    /// Only spending labels and `Uncategorized` are accepted; anything else,
    /// `Income` included, becomes `Uncategorized`.
    pub fn parse_reply(reply: &str) -> Category {
        match reply.trim().parse::<Category>() {
            Ok(category) if Category::SPENDING.contains(&category) => category,
            _ => Category::Uncategorized,
        }
    }
}

impl Categorizer for DelegatedCategorizer {
    fn name(&self) -> &str {
        "gemini"
    }

    fn categorize(&self, description: &str) -> Category {
        match self.generator.generate(&self.model, &build_prompt(description)) {
            Ok(reply) => Self::parse_reply(&reply),
            Err(_) => Category::Uncategorized,
        }
    }
}
