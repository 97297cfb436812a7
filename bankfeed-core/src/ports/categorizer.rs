//! Categorization ports

use crate::domain::result::Result;
use crate::domain::Category;

/// Assigns a category to an expense description
///
/// Implementations never fail: anything that goes wrong degrades to a
/// fallback label so that categorization cannot abort a sync.
pub trait Categorizer: Send + Sync {
    /// Strategy name (e.g., "rules", "gemini")
    fn name(&self) -> &str;

    fn categorize(&self, description: &str) -> Category;
}

/// External text-generation service used by delegated categorization
pub trait TextGenerator: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}
