pub mod loader;
pub mod rules;
pub mod ruleset;

pub use rules::Rule;
pub use ruleset::{Policy, RuleSet};
