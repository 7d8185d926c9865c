use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::binding::count_capture_slots;
use crate::display::{Format, SlotOverflow};
use crate::expr::Expression;
use crate::parsing::{is_plain_word, parse_expression_value, MalformedExpression};

/// Свойство определения, влияющее на отображение и разбор.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
	Conjunction,
	Equality,
	RequiresBrackets,
}

/// Именованный оператор или предикат: `∧`, `=`, `∀`, `function`.
#[derive(Clone, Debug)]
pub struct Definition {
	pub symbol: String,
	pub disambiguator: Option<String>,
	/// Число компонент.
	pub arity: usize,
	/// Число имён, которые вводит применение определения.
	pub bound_variables: usize,
	/// `%n` - сначала связанные имена, затем компоненты.
	pub format: Format,
	pub attributes: Vec<Attribute>,
}

impl Definition {
	/// Символ вместе с уточнением, в том виде в котором он попадает в сериализацию: `+#ℕ`.
	pub fn key(&self) -> String {
		definition_key(&self.symbol, self.disambiguator.as_deref())
	}

	pub fn has(&self, attribute: Attribute) -> bool {
		self.attributes.contains(&attribute)
	}

	/// Совпадение определений: по символу и уточнению, а не по адресу.
	pub fn is_same(&self, other: &Definition) -> bool {
		self.symbol == other.symbol && self.disambiguator == other.disambiguator
	}
}

fn read_format(source: &str, symbol: &str) -> Result<Format, DefinitionError> {
	Format::parse(source).map_err(|error| DefinitionError::Format { symbol: symbol.to_string(), error })
}

pub fn definition_key(symbol: &str, disambiguator: Option<&str>) -> String {
	match disambiguator {
		Some(disambiguator) => format!("{}#{}", symbol, disambiguator),
		None => symbol.to_string(),
	}
}

/// `from %0 → %1`. Утверждение уточнения получает терм первой компонентой.
#[derive(Clone, Debug)]
pub struct QualifierDefinition {
	pub statement: Arc<Definition>,
	pub format: Format,
}

impl QualifierDefinition {
	pub fn arity(&self) -> usize {
		self.statement.arity - 1
	}
}

#[derive(Clone, Debug)]
pub struct PropertyDefinition {
	pub statement: Arc<Definition>,
	/// Прилагательное: `injective`.
	pub name: String,
	pub requires_qualifier: bool,
}

#[derive(Clone, Debug)]
pub struct RelatedObjectDefinition {
	pub statement: Arc<Definition>,
	pub name: String,
	pub requires_qualifier: bool,
}

#[derive(Clone, Debug)]
pub struct TypeDefinition {
	pub statement: Arc<Definition>,
	/// Существительное: `function`.
	pub name: String,
	pub article: Option<String>,
	pub default_qualifier_components: Vec<Expression>,
	pub qualifier: Option<Arc<QualifierDefinition>>,
	pub properties: Vec<Arc<PropertyDefinition>>,
	pub related_objects: Vec<Arc<RelatedObjectDefinition>>,
}

impl TypeDefinition {
	pub fn property(&self, key: &str) -> Option<&Arc<PropertyDefinition>> {
		self.properties.iter().find(|p| p.statement.key() == key)
	}

	pub fn related_object(&self, key: &str) -> Option<&Arc<RelatedObjectDefinition>> {
		self.related_objects.iter().find(|o| o.statement.key() == key)
	}
}

/// Шаблон бинарного отношения: слот 0 - левая часть, слот 1 - правая.
#[derive(Clone, Debug)]
pub struct RelationTemplate {
	pub template: Expression,
	/// Ключ определения шаблона: `=#ℕ`. По нему отношения различаются и на него ссылаются транзитивности.
	pub key: String,
	/// Символ в цепочке: `=`.
	pub symbol: String,
	pub transitive: bool,
	pub chainable: bool,
}

/// `first` и `second` подряд дают `result`: `a ≤ b`, `b < c` ⊢ `a < c`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transitivity {
	pub first: String,
	pub second: String,
	pub result: String,
}

/// Сокращённая запись: если выражение подходит под `template`, оно показывается через `format`.
#[derive(Clone, Debug)]
pub struct Shorthand {
	pub template: Expression,
	pub format: Format,
	pub split_on_failure: bool,
}

#[derive(Debug, Error)]
pub enum DefinitionError {
	#[error("definition set is not valid: {0}")]
	Json(#[from] serde_json::Error),
	#[error("definition `{0}` is declared twice")]
	Duplicate(String),
	#[error("`{0}` cannot be used as a definition symbol")]
	InvalidSymbol(String),
	#[error("format of `{symbol}`: {error}")]
	Format {
		symbol: String,
		error: SlotOverflow,
	},
	#[error("unknown definition `{0}`")]
	UnknownDefinition(String),
	#[error("`{symbol}` should take {expected} components, but declares {actual}")]
	WrongArity {
		symbol: String,
		expected: usize,
		actual: usize,
	},
	#[error("format of `{symbol}` refers to %{slot}, but only {available} slots exist")]
	FormatSlot {
		symbol: String,
		slot: usize,
		available: usize,
	},
	#[error("type `{0}` declares both a qualifier and default qualifier components")]
	DefaultWithQualifier(String),
	#[error("relation template `{symbol}` has {captures} capture slots, needs at least 2")]
	RelationTemplate {
		symbol: String,
		captures: usize,
	},
	#[error("transitivity refers to unknown relation `{0}`")]
	UnknownRelation(String),
	#[error("in {context}: {error}")]
	Expression {
		context: String,
		error: MalformedExpression,
	},
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawDefinition {
	symbol: String,
	#[serde(default)]
	disambiguator: Option<String>,
	arity: usize,
	#[serde(default)]
	bound_variables: usize,
	format: String,
	#[serde(default)]
	attributes: Vec<Attribute>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawQualifier {
	symbol: String,
	format: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawAttached {
	symbol: String,
	name: String,
	#[serde(default)]
	requires_qualifier: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawTypeDefinition {
	symbol: String,
	name: String,
	#[serde(default)]
	article: Option<String>,
	#[serde(default)]
	default_qualifier_components: Vec<Value>,
	#[serde(default)]
	qualifier: Option<RawQualifier>,
	#[serde(default)]
	properties: Vec<RawAttached>,
	#[serde(default)]
	related_objects: Vec<RawAttached>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawRelation {
	template: Value,
	#[serde(default)]
	symbol: Option<String>,
	#[serde(default)]
	transitive: bool,
	#[serde(default)]
	chainable: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawTransitivity {
	first: String,
	second: String,
	result: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawShorthand {
	template: Value,
	format: String,
	#[serde(default)]
	split_on_failure: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawDefinitionSet {
	#[serde(default)]
	definitions: Vec<RawDefinition>,
	#[serde(default)]
	type_definitions: Vec<RawTypeDefinition>,
	#[serde(default)]
	relations: Vec<RawRelation>,
	#[serde(default)]
	transitivities: Vec<RawTransitivity>,
	#[serde(default)]
	shorthands: Vec<RawShorthand>,
}

/// Набор определений. Читается один раз и дальше только разделяется между вызовами.
#[derive(Clone, Debug, Default)]
pub struct DefinitionSet {
	definitions: BTreeMap<String, Arc<Definition>>,
	types: BTreeMap<String, Arc<TypeDefinition>>,
	relations: Vec<RelationTemplate>,
	transitivities: Vec<Transitivity>,
	shorthands: Vec<Shorthand>,
}

impl DefinitionSet {
	pub fn from_json(input: &str) -> Result<Self, DefinitionError> {
		let raw: RawDefinitionSet = serde_json::from_str(input)?;
		Self::from_raw(raw)
	}

	pub fn from_value(value: &Value) -> Result<Self, DefinitionError> {
		let raw = RawDefinitionSet::deserialize(value)?;
		Self::from_raw(raw)
	}

	fn from_raw(raw: RawDefinitionSet) -> Result<Self, DefinitionError> {
		let mut result = DefinitionSet::default();

		for raw in raw.definitions {
			result.add_definition(raw)?;
		}

		// Типы разбираются по очереди: компоненты по умолчанию не могут ссылаться на другие типы.
		for raw in raw.type_definitions {
			let definition = result.read_type_definition(raw)?;
			let key = definition.statement.key();
			if result.types.insert(key.clone(), Arc::new(definition)).is_some() {
				return Err(DefinitionError::Duplicate(key));
			}
		}

		for raw in raw.relations {
			let relation = result.read_relation(raw)?;
			result.relations.push(relation);
		}

		for RawTransitivity { first, second, result: combined } in raw.transitivities {
			for symbol in [&first, &second, &combined].iter() {
				if result.relation(symbol).is_none() {
					return Err(DefinitionError::UnknownRelation(symbol.to_string()));
				}
			}
			result.transitivities.push(Transitivity { first, second, result: combined });
		}

		for RawShorthand { template, format, split_on_failure } in raw.shorthands {
			let template = parse_expression_value(&template, &result)
				.map_err(|error| DefinitionError::Expression { context: format!("shorthand `{}`", format), error })?;
			result.shorthands.push(Shorthand {
				format: read_format(&format, &format)?,
				template,
				split_on_failure,
			});
		}

		debug!(
			"loaded {} definitions, {} types, {} relations, {} shorthands",
			result.definitions.len(),
			result.types.len(),
			result.relations.len(),
			result.shorthands.len(),
		);

		Ok(result)
	}

	fn add_definition(&mut self, raw: RawDefinition) -> Result<(), DefinitionError> {
		let RawDefinition { symbol, disambiguator, arity, bound_variables, format, attributes } = raw;
		for word in std::iter::once(&symbol).chain(disambiguator.as_ref()) {
			if !is_plain_word(word) {
				return Err(DefinitionError::InvalidSymbol(word.clone()));
			}
		}
		let definition = Definition {
			format: read_format(&format, &definition_key(&symbol, disambiguator.as_deref()))?,
			symbol,
			disambiguator,
			arity,
			bound_variables,
			attributes,
		};
		let key = definition.key();

		let available = definition.bound_variables + definition.arity;
		if let Some(slot) = definition.format.max_slot().filter(|slot| *slot >= available) {
			return Err(DefinitionError::FormatSlot { symbol: key, slot, available });
		}
		if definition.has(Attribute::Conjunction) && (definition.arity != 2 || definition.bound_variables != 0) {
			return Err(DefinitionError::WrongArity { symbol: key, expected: 2, actual: definition.arity });
		}

		if self.definitions.insert(key.clone(), Arc::new(definition)).is_some() {
			return Err(DefinitionError::Duplicate(key));
		}
		Ok(())
	}

	/// Определение утверждения, которое порождает развёртка; арность должна совпадать с тем что она строит.
	fn statement(&self, key: &str, expected: usize) -> Result<Arc<Definition>, DefinitionError> {
		let definition = self.definitions.get(key)
			.ok_or_else(|| DefinitionError::UnknownDefinition(key.to_string()))?;
		if definition.arity != expected || definition.bound_variables != 0 {
			return Err(DefinitionError::WrongArity {
				symbol: key.to_string(),
				expected,
				actual: definition.arity,
			});
		}
		Ok(definition.clone())
	}

	fn read_type_definition(&self, raw: RawTypeDefinition) -> Result<TypeDefinition, DefinitionError> {
		let RawTypeDefinition { symbol, name, article, default_qualifier_components, qualifier, properties, related_objects } = raw;

		if qualifier.is_some() && !default_qualifier_components.is_empty() {
			return Err(DefinitionError::DefaultWithQualifier(symbol));
		}

		let default_qualifier_components = default_qualifier_components.iter()
			.map(|value| parse_expression_value(value, self))
			.collect::<Result<Vec<_>, _>>()
			.map_err(|error| DefinitionError::Expression { context: format!("type `{}`", symbol), error })?;
		let statement = self.statement(&symbol, 1 + default_qualifier_components.len())?;

		let qualifier = match qualifier {
			Some(RawQualifier { symbol, format }) => {
				let format = read_format(&format, &symbol)?;
				let definition = self.definitions.get(&symbol)
					.ok_or_else(|| DefinitionError::UnknownDefinition(symbol.clone()))?;
				let available = definition.arity.saturating_sub(1);
				if let Some(slot) = format.max_slot().filter(|slot| *slot >= available) {
					return Err(DefinitionError::FormatSlot { symbol, slot, available });
				}
				let statement = self.statement(&symbol, definition.arity.max(1))?;
				Some(Arc::new(QualifierDefinition { statement, format }))
			},
			None => None,
		};
		let qualifier_arity = qualifier.as_ref().map(|q| q.arity()).unwrap_or(0);

		let properties = properties.into_iter()
			.map(|RawAttached { symbol, name, requires_qualifier }| {
				let expected = 1 + if requires_qualifier { qualifier_arity } else { 0 };
				Ok(Arc::new(PropertyDefinition {
					statement: self.statement(&symbol, expected)?,
					name,
					requires_qualifier,
				}))
			})
			.collect::<Result<Vec<_>, DefinitionError>>()?;

		let related_objects = related_objects.into_iter()
			.map(|RawAttached { symbol, name, requires_qualifier }| {
				let expected = 2 + if requires_qualifier { qualifier_arity } else { 0 };
				Ok(Arc::new(RelatedObjectDefinition {
					statement: self.statement(&symbol, expected)?,
					name,
					requires_qualifier,
				}))
			})
			.collect::<Result<Vec<_>, DefinitionError>>()?;

		Ok(TypeDefinition {
			statement,
			name,
			article,
			default_qualifier_components,
			qualifier,
			properties,
			related_objects,
		})
	}

	fn read_relation(&self, raw: RawRelation) -> Result<RelationTemplate, DefinitionError> {
		let RawRelation { template, symbol, transitive, chainable } = raw;
		let template = parse_expression_value(&template, self)
			.map_err(|error| DefinitionError::Expression { context: "relation template".to_string(), error })?;
		let (key, default_symbol) = match &template {
			Expression::Defined { definition, .. } => (definition.key(), definition.symbol.clone()),
			other => (other.serialize(), other.serialize()),
		};
		let captures = count_capture_slots(&template);
		if captures < 2 {
			return Err(DefinitionError::RelationTemplate { symbol: key, captures });
		}
		if self.relation(&key).is_some() {
			return Err(DefinitionError::Duplicate(key));
		}
		let symbol = symbol.unwrap_or(default_symbol);
		Ok(RelationTemplate { template, key, symbol, transitive, chainable })
	}

	pub fn definition(&self, key: &str) -> Option<&Arc<Definition>> {
		self.definitions.get(key)
	}

	pub fn definition_for(&self, symbol: &str, disambiguator: Option<&str>) -> Option<&Arc<Definition>> {
		self.definitions.get(&definition_key(symbol, disambiguator))
	}

	pub fn type_definition(&self, key: &str) -> Option<&Arc<TypeDefinition>> {
		self.types.get(key)
	}

	/// Конъюнкция по умолчанию для развёртки утверждений о типе.
	pub fn conjunction(&self) -> Option<&Arc<Definition>> {
		self.definitions.values().find(|d| d.has(Attribute::Conjunction))
	}

	pub fn relations(&self) -> &[RelationTemplate] {
		&self.relations
	}

	/// Отношение по ключу его определения.
	pub fn relation(&self, key: &str) -> Option<&RelationTemplate> {
		self.relations.iter().find(|r| r.key == key)
	}

	pub fn shorthands(&self) -> &[Shorthand] {
		&self.shorthands
	}

	/// Отношение, которое получается из `first` и `second` подряд. Транзитивное отношение сочетается само с собой.
	pub fn combine(&self, first: &str, second: &str) -> Option<&str> {
		if first == second && self.relation(first).map_or(false, |r| r.transitive) {
			return Some(&self.relation(first)?.key);
		}
		self.transitivities.iter()
			.find(|t| t.first == first && t.second == second)
			.map(|t| t.result.as_str())
	}
}
