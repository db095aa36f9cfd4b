/*!
 * Translation of CSV cell text using LLM providers.
 *
 * - `core`: the translation service with retry, rate limiting and usage stats
 * - `batch`: grouping segments into requests and running them concurrently
 * - `cache`: in-memory reuse of identical translations
 * - `cells`: splitting plain, set and JSON cells into segments and back
 * - `prompts`: prompt construction and response parsing
 */

// Re-export main types for easier usage
pub use self::batch::{BatchTranslator, SegmentFailure};
pub use self::cells::CellKind;
pub use self::core::{TokenUsageStats, TranslationService};

// Submodules
pub mod batch;
pub mod cache;
pub mod cells;
pub mod core;
pub mod prompts;
