use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde_json::{json, Value};

use crate::expr::{Expression, TypeExpression};

impl Expression {
	/// Каноническая префиксная запись: `∧ ∀ x φ($0) ψ`. Обратное преобразование - `parsing::parse_serialized`.
	pub fn serialize(&self) -> String {
		use Expression::*;

		match self {
			Variable { name, bound_names } if bound_names.is_empty() => name.clone(),
			Variable { name, bound_names } => format!("{}[{}]", name, bound_names.iter().join(" ")),
			FunctionParameter { level, index } => format!("{}{}", "$".repeat(level + 1), index),
			Defined { definition, bound_names, components } => {
				std::iter::once(definition.key())
					.chain(bound_names.iter().cloned())
					.chain(components.iter().map(Expression::serialize))
					.join(" ")
			},
			Application { name, args } => format!("{}({})", name, args.iter().map(Expression::serialize).join(", ")),
			Type(type_expression) => type_expression.flatten().0.serialize(),
		}
	}

	/// JSON в том же формате, который принимает `parsing::parse_expression`.
	pub fn to_json(&self) -> Value {
		use Expression::*;

		match self {
			Variable { name, bound_names } if bound_names.is_empty() => json!({ "name": name }),
			Variable { name, bound_names } => json!({ "name": name, "boundVariableNames": bound_names }),
			FunctionParameter { level, index } => json!({ "level": level, "index": index }),
			Defined { definition, bound_names, components } => {
				let mut result = json!({
					"definition": definition.symbol,
					"components": components.iter().map(Expression::to_json).collect::<Vec<_>>(),
				});
				if let Some(disambiguator) = &definition.disambiguator {
					result["disambiguator"] = json!(disambiguator);
				}
				if !bound_names.is_empty() {
					result["boundVariableNames"] = json!(bound_names);
				}
				result
			},
			Application { name, args } => json!({
				"name": name,
				"arguments": args.iter().map(Expression::to_json).collect::<Vec<_>>(),
			}),
			Type(type_expression) => type_expression.to_json(),
		}
	}
}

impl TypeExpression {
	fn to_json(&self) -> Value {
		let mut result = json!({
			"definition": self.definition().statement.key(),
			"term": self.term().to_json(),
		});
		if let Some(qualifier) = self.qualifier() {
			result["qualifier"] = json!({
				"definition": qualifier.definition.statement.key(),
				"components": qualifier.components.iter().map(Expression::to_json).collect::<Vec<_>>(),
			});
		}
		if !self.properties().is_empty() {
			result["properties"] = self.properties().iter().map(|p| json!(p.statement.key())).collect();
		}
		if !self.related_objects().is_empty() {
			result["relatedObjects"] = self.related_objects().iter()
				.map(|o| json!({ "definition": o.definition.statement.key(), "value": o.value.to_json() }))
				.collect();
		}
		if let Some(conjunction) = self.conjunction() {
			result["conjunctionDefinition"] = json!(conjunction.key());
		}
		result
	}
}

/// Структурное равенство: совпадение сериализаций.
impl PartialEq for Expression {
	fn eq(&self, other: &Self) -> bool {
		self.serialize() == other.serialize()
	}
}

impl Eq for Expression {}

impl Hash for Expression {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.serialize().hash(state)
	}
}

impl fmt::Display for Expression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.serialize())
	}
}
