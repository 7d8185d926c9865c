use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::definitions::{Definition, PropertyDefinition, QualifierDefinition, RelatedObjectDefinition, TypeDefinition};
use crate::parsing::MalformedExpression;

/// Выражение. После создания не изменяется: любое редактирование строит новое дерево.
///
/// Равенство выражений определяется через их каноническую сериализацию, см. `serialize.rs`.
#[derive(Clone, Debug)]
pub enum Expression {
	/// Переменная-заглушка: `φ`, `a`. Если `bound_names` не пуст, переменная высшего порядка, вводящая эти имена при применении.
	Variable {
		name: String,
		bound_names: Vec<String>,
	},

	/// Ссылка на связанную переменную: `level` пропускаемых областей связывания (0 - самая внутренняя), `index` - имя в этой области.
	FunctionParameter {
		level: usize,
		index: usize,
	},

	/// Применение определённого оператора или предиката: `a ∧ b`, `∀x φ`.
	Defined {
		definition: Arc<Definition>,
		bound_names: Vec<String>,
		components: Vec<Expression>,
	},

	/// Применение свободной переменной-функции к аргументам: `φ(a, b)`.
	Application {
		name: String,
		args: Vec<Expression>,
	},

	/// Утверждение о типе: `f is an injective function from A → B`.
	Type(Box<TypeExpression>),
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Copy)]
pub enum ExpressionKind {
	Variable,
	FunctionParameter,
	Defined,
	Application,
	Type,
}

impl From<&Expression> for ExpressionKind {
	fn from(expr: &Expression) -> Self {
		use Expression::*;

		match expr {
			Variable { .. } => ExpressionKind::Variable,
			FunctionParameter { .. } => ExpressionKind::FunctionParameter,
			Defined { .. } => ExpressionKind::Defined,
			Application { .. } => ExpressionKind::Application,
			Type(_) => ExpressionKind::Type,
		}
	}
}

/// Уточнение типа вместе со своими компонентами: `from A → B`.
#[derive(Clone, Debug)]
pub struct Qualifier {
	pub definition: Arc<QualifierDefinition>,
	pub components: Vec<Expression>,
}

/// Связанный объект утверждения о типе: `with identity e`.
#[derive(Clone, Debug)]
pub struct RelatedObject {
	pub definition: Arc<RelatedObjectDefinition>,
	pub value: Expression,
}

/// Структурированное утверждение о типе. Семантически равно своей развёрнутой форме, см. `flatten.rs`.
#[derive(Clone, Debug)]
pub struct TypeExpression {
	definition: Arc<TypeDefinition>,
	term: Expression,
	qualifier: Option<Qualifier>,
	properties: Vec<Arc<PropertyDefinition>>,
	related_objects: Vec<RelatedObject>,
	conjunction: Option<Arc<Definition>>,
}

impl TypeExpression {
	/// Проверяет что из полей можно построить развёрнутую форму.
	pub fn new(
		definition: Arc<TypeDefinition>,
		term: Expression,
		qualifier: Option<Qualifier>,
		properties: Vec<Arc<PropertyDefinition>>,
		related_objects: Vec<RelatedObject>,
		conjunction: Option<Arc<Definition>>,
	) -> Result<Self, MalformedExpression> {
		if let Some(qualifier) = &qualifier {
			let expected = qualifier.definition.arity();
			if qualifier.components.len() != expected {
				return Err(MalformedExpression::WrongArity {
					symbol: qualifier.definition.statement.key(),
					expected,
					actual: qualifier.components.len(),
				});
			}
		}

		let requiring = properties.iter()
			.filter(|p| p.requires_qualifier)
			.map(|p| p.statement.key())
			.chain(related_objects.iter()
				.filter(|o| o.definition.requires_qualifier)
				.map(|o| o.definition.statement.key()))
			.next();
		if let (Some(symbol), None) = (requiring, &qualifier) {
			return Err(MalformedExpression::QualifierRequired(symbol));
		}

		let folds = qualifier.iter().count() + properties.len() + related_objects.len();
		match &conjunction {
			None if folds > 0 => return Err(MalformedExpression::MissingConjunction),
			Some(conjunction) if conjunction.arity != 2 || conjunction.bound_variables != 0 => {
				return Err(MalformedExpression::WrongArity {
					symbol: conjunction.key(),
					expected: 2,
					actual: conjunction.arity,
				});
			},
			_ => {},
		}

		Ok(TypeExpression {
			definition,
			term,
			qualifier,
			properties,
			related_objects,
			conjunction,
		})
	}

	pub fn definition(&self) -> &Arc<TypeDefinition> { &self.definition }
	pub fn term(&self) -> &Expression { &self.term }
	pub fn qualifier(&self) -> Option<&Qualifier> { self.qualifier.as_ref() }
	pub fn properties(&self) -> &[Arc<PropertyDefinition>] { &self.properties }
	pub fn related_objects(&self) -> &[RelatedObject] { &self.related_objects }
	pub fn conjunction(&self) -> Option<&Arc<Definition>> { self.conjunction.as_ref() }

	/// Компоненты уточнения, или пустой список если уточнения нет.
	pub fn qualifier_components(&self) -> &[Expression] {
		self.qualifier.as_ref().map(|q| &q.components[..]).unwrap_or(&[])
	}

	pub fn with_term(&self, term: Expression) -> Self {
		TypeExpression { term, ..self.clone() }
	}

	/// `None`, если у уточнения нет компоненты `position`.
	pub fn with_qualifier_component(&self, position: usize, component: Expression) -> Option<Self> {
		let mut result = self.clone();
		*result.qualifier.as_mut()?.components.get_mut(position)? = component;
		Some(result)
	}

	pub fn with_related_object_value(&self, position: usize, value: Expression) -> Option<Self> {
		let mut result = self.clone();
		result.related_objects.get_mut(position)?.value = value;
		Some(result)
	}
}

/// Путь в выражении: последовательность индексов логических компонент. Пустой путь - всё выражение.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Path(pub Vec<usize>);

impl Path {
	pub fn root() -> Self {
		Path(Vec::new())
	}

	pub fn child(&self, index: usize) -> Self {
		let mut result = self.clone();
		result.0.push(index);
		result
	}

	pub fn join(&self, tail: &[usize]) -> Self {
		let mut result = self.clone();
		result.0.extend_from_slice(tail);
		result
	}

	pub fn starts_with(&self, prefix: &[usize]) -> bool {
		self.0.starts_with(prefix)
	}

	pub fn as_slice(&self) -> &[usize] {
		&self.0
	}
}

impl From<Vec<usize>> for Path {
	fn from(path: Vec<usize>) -> Self {
		Path(path)
	}
}

impl From<&[usize]> for Path {
	fn from(path: &[usize]) -> Self {
		Path(path.to_vec())
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self.0)
	}
}

/// Путь не существует в выражении: на глубине `depth` не нашлось нужной компоненты.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("path {path} does not exist, failed at depth {depth}")]
pub struct InvalidPath {
	pub path: Path,
	pub depth: usize,
}

/// Неизменяемый стек областей связывания. Каждая область - список имён, введённых одним узлом.
#[derive(Clone, Copy, Debug)]
pub enum Scope<'a> {
	Root,
	Frame {
		names: &'a [String],
		parent: &'a Scope<'a>,
	},
}

impl Default for Scope<'_> {
	fn default() -> Self {
		Scope::Root
	}
}

impl<'a> Scope<'a> {
	/// Добавляет область. Пустой список имён область не вводит.
	pub fn push<'b>(&'b self, names: &'b [String]) -> Scope<'b> {
		if names.is_empty() {
			*self
		} else {
			Scope::Frame { names, parent: self }
		}
	}

	pub fn depth(&self) -> usize {
		match self {
			Scope::Root => 0,
			Scope::Frame { parent, .. } => parent.depth() + 1,
		}
	}

	/// Имя, на которое ссылается `FunctionParameter { level, index }`.
	pub fn name(&self, level: usize, index: usize) -> Option<&'a str> {
		match (*self, level) {
			(Scope::Root, _) => None,
			(Scope::Frame { names, .. }, 0) => names.get(index).map(String::as_str),
			(Scope::Frame { parent, .. }, level) => parent.name(level - 1, index),
		}
	}

	/// Все имена областей, от внешней к внутренней.
	pub fn to_vec(&self) -> Vec<Vec<String>> {
		let mut result = Vec::new();
		let mut current = *self;
		while let Scope::Frame { names, parent } = current {
			result.push(names.to_vec());
			current = *parent;
		}
		result.reverse();
		result
	}
}

impl Expression {
	pub fn variable(name: impl Into<String>) -> Self {
		Expression::Variable { name: name.into(), bound_names: Vec::new() }
	}

	pub fn kind(&self) -> ExpressionKind {
		ExpressionKind::from(self)
	}

	/// Упорядоченный список логических компонент. Для утверждения о типе берётся из развёрнутой формы.
	pub fn logical_components(&self) -> Cow<'_, [Expression]> {
		use Expression::*;

		match self {
			Defined { components, .. } => Cow::Borrowed(components),
			Application { args, .. } => Cow::Borrowed(args),
			Type(type_expression) => match type_expression.flatten().0 {
				Defined { components, .. } => Cow::Owned(components),
				_ => Cow::Owned(Vec::new()),
			},
			Variable { .. } | FunctionParameter { .. } => Cow::Borrowed(&[]),
		}
	}

	fn get_inner(&self, path: &[usize], full: &[usize], depth: usize) -> Result<Expression, InvalidPath> {
		match path {
			[start, tail @ ..] => {
				let components = self.logical_components();
				components
					.get(*start)
					.ok_or_else(|| InvalidPath { path: full.into(), depth })?
					.get_inner(tail, full, depth + 1)
			},
			[] => Ok(self.clone()),
		}
	}

	/// Подвыражение по пути.
	pub fn get(&self, path: &[usize]) -> Result<Expression, InvalidPath> {
		self.get_inner(path, path, 0)
	}

	/// Имена связанных переменных, видимые в позиции `path`.
	pub fn bound_names_at(&self, path: &[usize]) -> Result<Vec<Vec<String>>, InvalidPath> {
		fn go(expr: &Expression, path: &[usize], full: &[usize], scope: &Scope) -> Result<Vec<Vec<String>>, InvalidPath> {
			match path {
				[] => Ok(scope.to_vec()),
				[start, tail @ ..] => {
					let depth = full.len() - path.len();
					let invalid = || InvalidPath { path: full.into(), depth };
					match expr {
						Expression::Defined { bound_names, components, .. } => {
							let inner = scope.push(bound_names);
							go(components.get(*start).ok_or_else(invalid)?, tail, full, &inner)
						},
						Expression::Application { args, .. } => {
							go(args.get(*start).ok_or_else(invalid)?, tail, full, scope)
						},
						Expression::Type(type_expression) => {
							go(&type_expression.flatten().0, path, full, scope)
						},
						Expression::Variable { .. } | Expression::FunctionParameter { .. } => Err(invalid()),
					}
				},
			}
		}

		go(self, path, path, &Scope::Root)
	}
}
