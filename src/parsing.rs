use std::sync::Arc;

use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::definitions::{definition_key, Definition, DefinitionSet};
use crate::expr::{Expression, Qualifier, RelatedObject, TypeExpression};
use crate::utils::span::{GlobalSpan, Spanned};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum MalformedExpression {
	#[error("expression is not valid JSON: {0}")]
	Json(String),
	#[error("expression has no recognisable shape")]
	UnknownShape,
	#[error("fields {fields:?} cannot be combined in one expression")]
	AmbiguousShape {
		fields: Vec<&'static str>,
	},
	#[error("function parameter needs both `level` and `index`")]
	IncompleteParameter,
	#[error("unknown definition `{0}`")]
	UnknownDefinition(String),
	#[error("unknown type `{0}`")]
	UnknownType(String),
	#[error("`{qualifier}` is not a qualifier of type `{type_symbol}`")]
	UnknownQualifier {
		type_symbol: String,
		qualifier: String,
	},
	#[error("`{property}` is not a property of type `{type_symbol}`")]
	UnknownProperty {
		type_symbol: String,
		property: String,
	},
	#[error("`{object}` is not a related object of type `{type_symbol}`")]
	UnknownRelatedObject {
		type_symbol: String,
		object: String,
	},
	#[error("`{symbol}` expects {expected} components, found {actual}")]
	WrongArity {
		symbol: String,
		expected: usize,
		actual: usize,
	},
	#[error("`{symbol}` binds {expected} variables, found {actual}")]
	WrongBoundVariableCount {
		symbol: String,
		expected: usize,
		actual: usize,
	},
	#[error("parameter at level {level} is used inside only {depth} binder scopes")]
	UnboundParameter {
		level: usize,
		index: usize,
		depth: usize,
	},
	#[error("parameter index {index} is out of range, its scope binds {available} names")]
	ParameterIndexOutOfRange {
		level: usize,
		index: usize,
		available: usize,
	},
	#[error("variable name `{0}` is also a definition symbol")]
	NameClashesWithDefinition(String),
	#[error("`{0}` cannot be used as a name")]
	InvalidName(String),
	#[error("`{0}` needs the type qualifier, but none is given")]
	QualifierRequired(String),
	#[error("type assertion needs a conjunction, but none is defined")]
	MissingConjunction,
	#[error("unexpected `{0}`")]
	UnexpectedToken(String),
	#[error("unexpected end of expression")]
	UnexpectedEnd,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawExpression {
	name: Option<String>,
	bound_variable_names: Option<Vec<String>>,
	level: Option<usize>,
	index: Option<usize>,
	definition: Option<String>,
	disambiguator: Option<String>,
	components: Option<Vec<RawExpression>>,
	arguments: Option<Vec<RawExpression>>,
	term: Option<Box<RawExpression>>,
	qualifier: Option<RawQualifier>,
	properties: Option<Vec<String>>,
	related_objects: Option<Vec<RawRelatedObject>>,
	conjunction_definition: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawQualifier {
	definition: String,
	#[serde(default)]
	components: Vec<RawExpression>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawRelatedObject {
	definition: String,
	value: RawExpression,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Shape {
	Variable,
	Parameter,
	Defined,
	Application,
	Type,
}

impl RawExpression {
	fn present_fields(&self) -> Vec<&'static str> {
		let fields = [
			("name", self.name.is_some()),
			("boundVariableNames", self.bound_variable_names.is_some()),
			("level", self.level.is_some()),
			("index", self.index.is_some()),
			("definition", self.definition.is_some()),
			("disambiguator", self.disambiguator.is_some()),
			("components", self.components.is_some()),
			("arguments", self.arguments.is_some()),
			("term", self.term.is_some()),
			("qualifier", self.qualifier.is_some()),
			("properties", self.properties.is_some()),
			("relatedObjects", self.related_objects.is_some()),
			("conjunctionDefinition", self.conjunction_definition.is_some()),
		];
		fields.iter().filter(|(_, present)| *present).map(|(name, _)| *name).collect()
	}

	/// Вид выражения определяется по присутствующим полям. Поля, не подходящие виду, делают выражение неоднозначным.
	fn shape(&self) -> Result<Shape, MalformedExpression> {
		let shape = if self.term.is_some() {
			Shape::Type
		} else if self.level.is_some() || self.index.is_some() {
			Shape::Parameter
		} else if self.name.is_some() {
			if self.arguments.is_some() { Shape::Application } else { Shape::Variable }
		} else if self.definition.is_some() {
			Shape::Defined
		} else {
			return Err(MalformedExpression::UnknownShape);
		};

		let allowed: &[&str] = match shape {
			Shape::Variable => &["name", "boundVariableNames"],
			Shape::Parameter => &["level", "index"],
			Shape::Defined => &["definition", "disambiguator", "boundVariableNames", "components"],
			Shape::Application => &["name", "arguments"],
			Shape::Type => &["definition", "term", "qualifier", "properties", "relatedObjects", "conjunctionDefinition"],
		};
		let fields = self.present_fields();
		if fields.iter().any(|field| !allowed.contains(field)) {
			return Err(MalformedExpression::AmbiguousShape { fields });
		}
		Ok(shape)
	}
}

/// Символы, из которых состоит текстовая форма; в именах и символах определений их быть не может.
const RESERVED: &[char] = &['(', ')', ',', '[', ']', '$', '#'];

/// Слово, которое лексер текстовой формы прочитает целиком и не спутает с параметром.
pub(crate) fn is_plain_word(word: &str) -> bool {
	!word.is_empty() && !word.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c))
}

fn check_name(name: &str, definitions: &DefinitionSet) -> Result<(), MalformedExpression> {
	if !is_plain_word(name) {
		return Err(MalformedExpression::InvalidName(name.to_string()));
	}
	if definitions.definition(name).is_some() {
		return Err(MalformedExpression::NameClashesWithDefinition(name.to_string()));
	}
	Ok(())
}

fn check_bound_name(name: &str) -> Result<(), MalformedExpression> {
	if !is_plain_word(name) {
		Err(MalformedExpression::InvalidName(name.to_string()))
	} else {
		Ok(())
	}
}

/// Проверяет что параметр ссылается на существующее имя. `scopes` - размеры областей связывания, внутренняя последней.
fn check_parameter(level: usize, index: usize, scopes: &[usize]) -> Result<(), MalformedExpression> {
	let depth = scopes.len();
	if level >= depth {
		return Err(MalformedExpression::UnboundParameter { level, index, depth });
	}
	let available = scopes[depth - 1 - level];
	if index >= available {
		return Err(MalformedExpression::ParameterIndexOutOfRange { level, index, available });
	}
	Ok(())
}

fn read_defined(
	definition: &Arc<Definition>,
	bound_names: Vec<String>,
	components: Vec<Expression>,
) -> Result<Expression, MalformedExpression> {
	if bound_names.len() != definition.bound_variables {
		return Err(MalformedExpression::WrongBoundVariableCount {
			symbol: definition.key(),
			expected: definition.bound_variables,
			actual: bound_names.len(),
		});
	}
	if components.len() != definition.arity {
		return Err(MalformedExpression::WrongArity {
			symbol: definition.key(),
			expected: definition.arity,
			actual: components.len(),
		});
	}
	Ok(Expression::Defined { definition: definition.clone(), bound_names, components })
}

fn read(raw: RawExpression, definitions: &DefinitionSet, scopes: &mut Vec<usize>) -> Result<Expression, MalformedExpression> {
	let shape = raw.shape()?;
	trace!("reading {:?} at binder depth {}", shape, scopes.len());

	let RawExpression {
		name,
		bound_variable_names,
		level,
		index,
		definition,
		disambiguator,
		components,
		arguments,
		term,
		qualifier,
		properties,
		related_objects,
		conjunction_definition,
	} = raw;

	match shape {
		Shape::Variable => {
			let name = name.unwrap_or_default();
			check_name(&name, definitions)?;
			let bound_names = bound_variable_names.unwrap_or_default();
			for bound_name in &bound_names {
				check_bound_name(bound_name)?;
			}
			Ok(Expression::Variable { name, bound_names })
		},
		Shape::Parameter => match (level, index) {
			(Some(level), Some(index)) => {
				check_parameter(level, index, scopes)?;
				Ok(Expression::FunctionParameter { level, index })
			},
			_ => Err(MalformedExpression::IncompleteParameter),
		},
		Shape::Application => {
			let name = name.unwrap_or_default();
			check_name(&name, definitions)?;
			let args = arguments.unwrap_or_default()
				.into_iter()
				.map(|arg| read(arg, definitions, scopes))
				.collect::<Result<Vec<_>, _>>()?;
			Ok(Expression::Application { name, args })
		},
		Shape::Defined => {
			let symbol = definition.unwrap_or_default();
			let key = definition_key(&symbol, disambiguator.as_deref());
			let definition = definitions.definition(&key)
				.ok_or(MalformedExpression::UnknownDefinition(key))?;
			let bound_names = bound_variable_names.unwrap_or_default();
			for bound_name in &bound_names {
				check_bound_name(bound_name)?;
			}

			let introduces = !bound_names.is_empty();
			if introduces {
				scopes.push(bound_names.len());
			}
			let components = components.unwrap_or_default()
				.into_iter()
				.map(|component| read(component, definitions, scopes))
				.collect::<Result<Vec<_>, _>>();
			if introduces {
				scopes.pop();
			}

			read_defined(definition, bound_names, components?)
		},
		Shape::Type => {
			let symbol = definition.unwrap_or_default();
			let type_definition = definitions.type_definition(&symbol)
				.ok_or_else(|| MalformedExpression::UnknownType(symbol.clone()))?
				.clone();
			let term = match term {
				Some(term) => read(*term, definitions, scopes)?,
				None => return Err(MalformedExpression::UnknownShape),
			};

			let qualifier = match qualifier {
				Some(RawQualifier { definition, components }) => {
					let qualifier_definition = type_definition.qualifier.as_ref()
						.filter(|q| q.statement.key() == definition)
						.ok_or_else(|| MalformedExpression::UnknownQualifier {
							type_symbol: symbol.clone(),
							qualifier: definition.clone(),
						})?
						.clone();
					let components = components.into_iter()
						.map(|component| read(component, definitions, scopes))
						.collect::<Result<Vec<_>, _>>()?;
					Some(Qualifier { definition: qualifier_definition, components })
				},
				None => None,
			};

			let properties = properties.unwrap_or_default()
				.into_iter()
				.map(|property| {
					type_definition.property(&property)
						.cloned()
						.ok_or_else(|| MalformedExpression::UnknownProperty {
							type_symbol: symbol.clone(),
							property,
						})
				})
				.collect::<Result<Vec<_>, _>>()?;

			let related_objects = related_objects.unwrap_or_default()
				.into_iter()
				.map(|RawRelatedObject { definition, value }| {
					let object = type_definition.related_object(&definition)
						.cloned()
						.ok_or_else(|| MalformedExpression::UnknownRelatedObject {
							type_symbol: symbol.clone(),
							object: definition,
						})?;
					Ok(RelatedObject { definition: object, value: read(value, definitions, scopes)? })
				})
				.collect::<Result<Vec<_>, MalformedExpression>>()?;

			let conjunction = match conjunction_definition {
				Some(key) => Some(definitions.definition(&key)
					.ok_or(MalformedExpression::UnknownDefinition(key))?
					.clone()),
				None => definitions.conjunction().cloned(),
			};

			TypeExpression::new(type_definition, term, qualifier, properties, related_objects, conjunction)
				.map(|t| Expression::Type(Box::new(t)))
		},
	}
}

/// Читает выражение из JSON-значения.
pub fn parse_expression_value(value: &Value, definitions: &DefinitionSet) -> Result<Expression, MalformedExpression> {
	parse_expression_value_in(value, definitions, &[])
}

/// Читает выражение, находящееся внутри областей связывания с размерами `scopes` (внутренняя последней).
pub fn parse_expression_value_in(
	value: &Value,
	definitions: &DefinitionSet,
	scopes: &[usize],
) -> Result<Expression, MalformedExpression> {
	let raw = RawExpression::deserialize(value).map_err(|err| MalformedExpression::Json(err.to_string()))?;
	read(raw, definitions, &mut scopes.to_vec())
}

/// Читает выражение из JSON-текста.
pub fn parse_expression(input: &str, definitions: &DefinitionSet) -> Result<Expression, MalformedExpression> {
	let value: Value = serde_json::from_str(input).map_err(|err| MalformedExpression::Json(err.to_string()))?;
	let result = parse_expression_value(&value, definitions);
	if let Ok(expression) = &result {
		debug!("parsed expression `{}`", expression);
	}
	result
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
	Word(String),
	Parameter {
		level: usize,
		index: usize,
	},
	Open,
	Close,
	Comma,
	OpenNames,
	CloseNames,
}

impl Token {
	fn text(&self) -> String {
		match self {
			Token::Word(word) => word.clone(),
			Token::Parameter { level, index } => format!("{}{}", "$".repeat(level + 1), index),
			Token::Open => "(".to_string(),
			Token::Close => ")".to_string(),
			Token::Comma => ",".to_string(),
			Token::OpenNames => "[".to_string(),
			Token::CloseNames => "]".to_string(),
		}
	}
}

peg::parser!(
	grammar lexer() for str {
		pub rule tokens() -> Vec<Spanned<Token>>
			= _ t:token() ** _ _ { t }

		rule token() -> Spanned<Token>
			= start:position!() t:token_inner() end:position!() { Spanned::new(t, GlobalSpan(start..end)) }

		rule token_inner() -> Token
			= "(" { Token::Open }
			/ ")" { Token::Close }
			/ "," { Token::Comma }
			/ "[" { Token::OpenNames }
			/ "]" { Token::CloseNames }
			/ dollars:$("$"+) index:integer() { Token::Parameter { level: dollars.len() - 1, index } }
			/ word:$((!['(' | ')' | ',' | '[' | ']' | ' ' | '\n' | '\t'] [_])+) { Token::Word(word.to_string()) }

		rule integer() -> usize
			= n:$(['0'..='9']+) {? n.parse().map_err(|_| "number is too big") }

		rule _() = quiet!{[' ' | '\n' | '\t']*}
	}
);

/// Разбор текстовой формы по токенам. Число компонент определяется арностью определения, поэтому скобки не нужны.
struct TokenReader<'a> {
	tokens: &'a [Spanned<Token>],
	position: usize,
	end: usize,
	definitions: &'a DefinitionSet,
}

impl<'a> TokenReader<'a> {
	fn peek(&self) -> Option<&'a Spanned<Token>> {
		self.tokens.get(self.position)
	}

	fn next(&mut self) -> Result<&'a Spanned<Token>, Spanned<MalformedExpression>> {
		let token = self.tokens.get(self.position)
			.ok_or_else(|| Spanned::new(MalformedExpression::UnexpectedEnd, GlobalSpan(self.end..self.end)))?;
		self.position += 1;
		Ok(token)
	}

	fn word(&mut self) -> Result<(String, GlobalSpan), Spanned<MalformedExpression>> {
		let token = self.next()?;
		match &token.inner {
			Token::Word(word) => Ok((word.clone(), token.span.clone())),
			other => Err(Spanned::new(MalformedExpression::UnexpectedToken(other.text()), token.span.clone())),
		}
	}

	fn expect(&mut self, expected: Token) -> Result<(), Spanned<MalformedExpression>> {
		let token = self.next()?;
		if token.inner == expected {
			Ok(())
		} else {
			Err(Spanned::new(MalformedExpression::UnexpectedToken(token.inner.text()), token.span.clone()))
		}
	}

	fn expression(&mut self, scopes: &mut Vec<usize>) -> Result<Expression, Spanned<MalformedExpression>> {
		let definitions = self.definitions;
		let token = self.next()?;
		let span = token.span.clone();
		match &token.inner {
			Token::Parameter { level, index } => {
				check_parameter(*level, *index, scopes).map_err(|err| Spanned::new(err, span))?;
				Ok(Expression::FunctionParameter { level: *level, index: *index })
			},
			Token::Word(word) => {
				if let Some(definition) = definitions.definition(word) {
					let mut bound_names = Vec::with_capacity(definition.bound_variables);
					for _ in 0..definition.bound_variables {
						bound_names.push(self.word()?.0);
					}

					let introduces = !bound_names.is_empty();
					if introduces {
						scopes.push(bound_names.len());
					}
					let mut components = Vec::with_capacity(definition.arity);
					let mut failure = None;
					for _ in 0..definition.arity {
						match self.expression(scopes) {
							Ok(component) => components.push(component),
							Err(err) => {
								failure = Some(err);
								break;
							},
						}
					}
					if introduces {
						scopes.pop();
					}
					if let Some(err) = failure {
						return Err(err);
					}

					return read_defined(definition, bound_names, components).map_err(|err| Spanned::new(err, span));
				}

				match self.peek().map(|t| &t.inner) {
					Some(Token::Open) => {
						self.position += 1;
						let mut args = Vec::new();
						if self.peek().map(|t| &t.inner) == Some(&Token::Close) {
							self.position += 1;
						} else {
							loop {
								args.push(self.expression(scopes)?);
								let separator = self.next()?;
								match separator.inner {
									Token::Comma => continue,
									Token::Close => break,
									ref other => return Err(Spanned::new(
										MalformedExpression::UnexpectedToken(other.text()),
										separator.span.clone(),
									)),
								}
							}
						}
						Ok(Expression::Application { name: word.clone(), args })
					},
					Some(Token::OpenNames) => {
						self.position += 1;
						let mut bound_names = Vec::new();
						while self.peek().map(|t| &t.inner) != Some(&Token::CloseNames) {
							bound_names.push(self.word()?.0);
						}
						self.expect(Token::CloseNames)?;
						Ok(Expression::Variable { name: word.clone(), bound_names })
					},
					_ => Ok(Expression::variable(word.clone())),
				}
			},
			other => Err(Spanned::new(MalformedExpression::UnexpectedToken(other.text()), span)),
		}
	}
}

/// Читает текстовую (сериализованную) форму выражения.
pub fn parse_serialized(input: &str, definitions: &DefinitionSet) -> Result<Expression, Spanned<MalformedExpression>> {
	let tokens = lexer::tokens(input).map_err(|err| {
		let offset = err.location.offset;
		Spanned::new(
			MalformedExpression::UnexpectedToken(input[offset..].chars().take(1).collect()),
			GlobalSpan(offset..offset + 1),
		)
	})?;

	let mut reader = TokenReader { tokens: &tokens, position: 0, end: input.len(), definitions };
	let result = reader.expression(&mut Vec::new())?;
	if let Some(extra) = reader.peek() {
		return Err(Spanned::new(MalformedExpression::UnexpectedToken(extra.inner.text()), extra.span.clone()));
	}
	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lexer_splits_applications_and_parameters() {
		let tokens: Vec<Token> = lexer::tokens("∀ x φ($0, $$1) ψ[y]")
			.unwrap()
			.into_iter()
			.map(|t| t.inner)
			.collect();
		assert_eq!(tokens, vec![
			Token::Word("∀".to_string()),
			Token::Word("x".to_string()),
			Token::Word("φ".to_string()),
			Token::Open,
			Token::Parameter { level: 0, index: 0 },
			Token::Comma,
			Token::Parameter { level: 1, index: 1 },
			Token::Close,
			Token::Word("ψ".to_string()),
			Token::OpenNames,
			Token::Word("y".to_string()),
			Token::CloseNames,
		]);
	}

	#[test]
	fn dollar_without_index_is_a_word() {
		let tokens = lexer::tokens("$$").unwrap();
		assert_eq!(tokens[0].inner, Token::Word("$$".to_string()));
	}

	#[test]
	fn parameters_are_checked_against_scopes() {
		assert!(check_parameter(0, 0, &[1]).is_ok());
		assert_eq!(
			check_parameter(1, 0, &[1]),
			Err(MalformedExpression::UnboundParameter { level: 1, index: 0, depth: 1 }),
		);
		assert_eq!(
			check_parameter(0, 2, &[3, 2]),
			Err(MalformedExpression::ParameterIndexOutOfRange { level: 0, index: 2, available: 2 }),
		);
	}
}
