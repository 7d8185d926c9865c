use std::sync::Arc;

use log::trace;

use crate::definitions::Definition;
use crate::expr::{Expression, Path, TypeExpression};

/// Элементарное утверждение, на которое раскладывается утверждение о типе. Порядок вариантов - порядок свёртки.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ElementaryStatement {
	Base,
	Qualifier,
	Property(usize),
	RelatedObject(usize),
}

/// Какое структурное поле представляет узел развёрнутой формы.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeField {
	/// Утверждение или конъюнкция нескольких утверждений.
	Statements(Vec<ElementaryStatement>),
	Term,
	QualifierComponent(usize),
	DefaultQualifierComponent(usize),
	RelatedObjectValue(usize),
}

impl TypeField {
	/// Слот - место, куда подставлено значение поля; всё что ниже принадлежит самому значению.
	pub fn is_slot(&self) -> bool {
		!matches!(self, TypeField::Statements(_))
	}
}

/// Соответствие путей развёрнутой формы полям утверждения о типе.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathMap {
	entries: Vec<(Path, TypeField)>,
}

impl PathMap {
	pub fn entries(&self) -> &[(Path, TypeField)] {
		&self.entries
	}

	pub fn field(&self, path: &[usize]) -> Option<&TypeField> {
		self.entries.iter().find(|(p, _)| p.as_slice() == path).map(|(_, field)| field)
	}

	/// Все пути, где встречается поле: сначала основание, затем уточнение, свойства и связанные объекты.
	pub fn occurrences(&self, field: &TypeField) -> Vec<&Path> {
		self.entries.iter().filter(|(_, f)| f == field).map(|(path, _)| path).collect()
	}

	pub fn statement_path(&self, statement: ElementaryStatement) -> Option<&Path> {
		self.entries.iter()
			.find(|(_, field)| match field {
				TypeField::Statements(statements) => statements.len() == 1 && statements[0] == statement,
				_ => false,
			})
			.map(|(path, _)| path)
	}

	/// Слот, внутрь которого ведёт путь, и остаток пути внутри значения.
	pub fn resolve<'p>(&self, path: &'p [usize]) -> Option<(&TypeField, &'p [usize])> {
		self.entries.iter()
			.filter(|(_, field)| field.is_slot())
			.find(|(prefix, _)| path.starts_with(prefix.as_slice()))
			.map(|(prefix, field)| (field, &path[prefix.0.len()..]))
	}
}

struct Statement {
	kind: ElementaryStatement,
	node: Expression,
	slots: Vec<(usize, TypeField)>,
}

fn statement(
	kind: ElementaryStatement,
	definition: &Arc<Definition>,
	leading: Vec<(Expression, TypeField)>,
	trailing: Vec<(Expression, TypeField)>,
) -> Statement {
	let (components, fields): (Vec<_>, Vec<_>) = leading.into_iter().chain(trailing).unzip();
	Statement {
		kind,
		node: Expression::Defined { definition: definition.clone(), bound_names: Vec::new(), components },
		slots: fields.into_iter().enumerate().collect(),
	}
}

impl TypeExpression {
	fn qualifier_slots(&self) -> Vec<(Expression, TypeField)> {
		self.qualifier_components().iter()
			.cloned()
			.enumerate()
			.map(|(position, component)| (component, TypeField::QualifierComponent(position)))
			.collect()
	}

	/// Основание и утверждения, сворачиваемые к нему по порядку.
	fn elementary_statements(&self) -> (Statement, Vec<Statement>) {
		let term = || (self.term().clone(), TypeField::Term);
		let mut result = Vec::new();

		let defaults = match self.qualifier() {
			Some(_) => Vec::new(),
			None => self.definition().default_qualifier_components.iter()
				.cloned()
				.enumerate()
				.map(|(position, component)| (component, TypeField::DefaultQualifierComponent(position)))
				.collect(),
		};
		let base = statement(ElementaryStatement::Base, &self.definition().statement, vec![term()], defaults);

		if let Some(qualifier) = self.qualifier() {
			result.push(statement(
				ElementaryStatement::Qualifier,
				&qualifier.definition.statement,
				vec![term()],
				self.qualifier_slots(),
			));
		}

		for (position, property) in self.properties().iter().enumerate() {
			let trailing = if property.requires_qualifier { self.qualifier_slots() } else { Vec::new() };
			result.push(statement(ElementaryStatement::Property(position), &property.statement, vec![term()], trailing));
		}

		for (position, object) in self.related_objects().iter().enumerate() {
			let trailing = if object.definition.requires_qualifier { self.qualifier_slots() } else { Vec::new() };
			result.push(statement(
				ElementaryStatement::RelatedObject(position),
				&object.definition.statement,
				vec![(object.value.clone(), TypeField::RelatedObjectValue(position)), term()],
				trailing,
			));
		}

		(base, result)
	}

	/// Разворачивает утверждение о типе в левоассоциативную конъюнкцию элементарных утверждений.
	///
	/// Путь `[1]` - последнее добавленное утверждение, `[0]` - всё что было до него; основание и уточнение лежат внизу левой ветви.
	pub fn flatten(&self) -> (Expression, PathMap) {
		let (base, folded) = self.elementary_statements();
		let folds = folded.len();
		trace!("flattening `{}` into {} statements", self.definition().name, folds + 1);

		let mut entries = Vec::new();
		let kinds: Vec<ElementaryStatement> = std::iter::once(base.kind).chain(folded.iter().map(|s| s.kind)).collect();
		for covered in (1..=folds).rev() {
			entries.push((Path(vec![0; folds - covered]), TypeField::Statements(kinds[..=covered].to_vec())));
		}
		for (position, statement) in std::iter::once(&base).chain(folded.iter()).enumerate() {
			let root = match position {
				0 => Path(vec![0; folds]),
				position => Path(vec![0; folds - position]).child(1),
			};
			entries.push((root.clone(), TypeField::Statements(vec![statement.kind])));
			for (component, field) in &statement.slots {
				entries.push((root.child(*component), field.clone()));
			}
		}

		let flattened = match self.conjunction() {
			Some(conjunction) => folded.into_iter().fold(base.node, |accumulator, statement| Expression::Defined {
				definition: conjunction.clone(),
				bound_names: Vec::new(),
				components: vec![accumulator, statement.node],
			}),
			None => base.node,
		};

		(flattened, PathMap { entries })
	}
}
