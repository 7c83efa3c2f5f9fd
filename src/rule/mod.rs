mod head_rule;
mod parse;
mod signed;

pub use head_rule::HeadRule;
pub use signed::SignedSurface;

pub(crate) use parse::RuleParser;
