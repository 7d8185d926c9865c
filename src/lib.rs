pub mod binding;
pub mod definitions;
pub mod display;
pub mod expr;
pub mod flatten;
pub mod parsing;
pub mod proof;
pub mod rewrite;
pub mod serialize;
pub mod utils;

pub use binding::{match_template, MatchResult};
pub use definitions::{DefinitionError, DefinitionSet};
pub use display::{Rendered, Renderer};
pub use expr::{Expression, InvalidPath, Path, TypeExpression};
pub use flatten::PathMap;
pub use parsing::{parse_expression, parse_serialized, MalformedExpression};
pub use proof::{linearize, parse_steps, RenderGroup, Step};
pub use rewrite::replace_at_path;
