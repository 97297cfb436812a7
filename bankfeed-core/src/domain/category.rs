//! Transaction category labels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Closed set of category labels a stored transaction can carry
///
/// `Unclear` is what keyword rules produce when nothing matches;
/// `Uncategorized` is what a failed delegated classification degrades to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Groceries,
    Transport,
    Bills,
    Entertainment,
    Dining,
    Shopping,
    Income,
    Unclear,
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Groceries,
        Category::Transport,
        Category::Bills,
        Category::Entertainment,
        Category::Dining,
        Category::Shopping,
        Category::Income,
        Category::Unclear,
        Category::Uncategorized,
    ];

    /// Labels a classifier may choose for an expense
    pub const SPENDING: [Category; 6] = [
        Category::Groceries,
        Category::Transport,
        Category::Bills,
        Category::Entertainment,
        Category::Dining,
        Category::Shopping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Transport => "Transport",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Dining => "Dining",
            Category::Shopping => "Shopping",
            Category::Income => "Income",
            Category::Unclear => "Unclear",
            Category::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Case-insensitive, surrounding whitespace and trailing punctuation ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_matches(|c: char| c == '.' || c == '"' || c == '\'' || c == '*')
            .trim();

        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(cleaned))
            .ok_or_else(|| Error::validation(format!("Unknown category: {}", s.trim())))
    }
}
