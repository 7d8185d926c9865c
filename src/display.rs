use std::ops::Range;

use colored::Colorize;
use log::warn;
use thiserror::Error;

use crate::binding::{match_template_in, MatchResult};
use crate::definitions::{Attribute, DefinitionSet, Shorthand};
use crate::expr::*;
use crate::flatten::{ElementaryStatement, PathMap, TypeField};
use crate::proof::Chain;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormatPart {
	Literal(String),
	/// `%n`
	Slot(usize),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatToken {
	pub part: FormatPart,
	/// Перед токеном стоял пробел.
	pub spaced: bool,
}

/// Формат отображения: `%0 = %1`, `∀%0 %1`, `from %0 → %1`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Format {
	source: String,
	tokens: Vec<FormatToken>,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("slot number in `{0}` is too large")]
pub struct SlotOverflow(pub String);

impl Format {
	pub fn parse(source: &str) -> Result<Self, SlotOverflow> {
		let mut tokens = Vec::new();
		let mut literal = String::new();
		let mut literal_spaced = false;
		let mut spaced = false;
		let mut chars = source.chars().peekable();

		let flush = |literal: &mut String, literal_spaced: bool, tokens: &mut Vec<FormatToken>| {
			if !literal.is_empty() {
				tokens.push(FormatToken { part: FormatPart::Literal(std::mem::take(literal)), spaced: literal_spaced });
			}
		};

		while let Some(c) = chars.next() {
			if c.is_whitespace() {
				flush(&mut literal, literal_spaced, &mut tokens);
				spaced = !tokens.is_empty();
				continue;
			}
			if c == '%' && chars.peek().map_or(false, |d| d.is_ascii_digit()) {
				flush(&mut literal, literal_spaced, &mut tokens);
				let mut slot: usize = 0;
				while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
					slot = slot.checked_mul(10)
						.and_then(|slot| slot.checked_add(digit as usize))
						.ok_or_else(|| SlotOverflow(source.to_string()))?;
					chars.next();
				}
				tokens.push(FormatToken { part: FormatPart::Slot(slot), spaced });
				spaced = false;
				continue;
			}
			if literal.is_empty() {
				literal_spaced = spaced;
				spaced = false;
			}
			literal.push(c);
		}
		flush(&mut literal, literal_spaced, &mut tokens);

		Ok(Format { source: source.to_string(), tokens })
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn tokens(&self) -> &[FormatToken] {
		&self.tokens
	}

	pub fn max_slot(&self) -> Option<usize> {
		self.tokens.iter()
			.filter_map(|t| match t.part {
				FormatPart::Slot(slot) => Some(slot),
				FormatPart::Literal(_) => None,
			})
			.max()
	}
}

/// Кусок отображённого текста и пути вхождений, которые он показывает.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fragment {
	pub text: String,
	pub owners: Vec<Path>,
	pub spaced: bool,
}

impl Fragment {
	fn new(text: impl Into<String>, owners: Vec<Path>, spaced: bool) -> Self {
		Fragment { text: text.into(), owners, spaced }
	}

	/// Фрагмент показывает что-то внутри `path`.
	pub fn is_under(&self, path: &[usize]) -> bool {
		self.owners.iter().any(|owner| owner.starts_with(path))
	}
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Rendered {
	fragments: Vec<Fragment>,
}

impl Rendered {
	pub fn fragments(&self) -> &[Fragment] {
		&self.fragments
	}

	pub fn text(&self) -> String {
		let mut result = String::new();
		for fragment in &self.fragments {
			if fragment.spaced && !result.is_empty() {
				result.push(' ');
			}
			result.push_str(&fragment.text);
		}
		result
	}

	/// Текст только тех фрагментов, которые относятся к `path`. Путь, которому ничего не принадлежит, не выделяет ничего.
	pub fn highlight(&self, path: &[usize]) -> String {
		let mut result = String::new();
		let mut gap = false;
		for fragment in &self.fragments {
			if fragment.is_under(path) {
				if !result.is_empty() && (fragment.spaced || gap) {
					result.push(' ');
				}
				result.push_str(&fragment.text);
				gap = false;
			} else {
				gap = true;
			}
		}
		result
	}

	/// Диапазоны символов в `text()`, которые выделяются для `path`.
	pub fn highlight_ranges(&self, path: &[usize]) -> Vec<Range<usize>> {
		let mut result: Vec<Range<usize>> = Vec::new();
		let mut position = 0;
		for (index, fragment) in self.fragments.iter().enumerate() {
			if fragment.spaced && index > 0 {
				position += 1;
			}
			let length = fragment.text.chars().count();
			if fragment.is_under(path) {
				// Соседние выделенные фрагменты сливаются вместе с пробелом между ними.
				let adjacent = result.last().map_or(false, |last| last.end + 1 >= position);
				match result.last_mut() {
					Some(last) if adjacent => last.end = position + length,
					_ => {},
				}
				if !adjacent {
					result.push(position..position + length);
				}
			}
			position += length;
		}
		result
	}

	/// Текст для терминала, где выделенная часть окрашена.
	pub fn to_colored(&self, path: &[usize]) -> String {
		let mut result = String::new();
		for fragment in &self.fragments {
			if fragment.spaced && !result.is_empty() {
				result.push(' ');
			}
			if fragment.is_under(path) {
				result.push_str(&fragment.text.as_str().yellow().bold().to_string());
			} else {
				result.push_str(&fragment.text);
			}
		}
		result
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderOptions {
	pub use_shorthands: bool,
}

impl Default for RenderOptions {
	fn default() -> Self {
		RenderOptions { use_shorthands: true }
	}
}

fn append(out: &mut Vec<Fragment>, mut inner: Vec<Fragment>, spaced: bool) {
	if let Some(first) = inner.first_mut() {
		first.spaced = spaced;
	}
	out.extend(inner);
}

/// Переносит фрагменты, отображённые относительно значения поля, на все вхождения этого поля.
fn rebase(fragments: Vec<Fragment>, prefixes: &[Path]) -> Vec<Fragment> {
	fragments.into_iter()
		.map(|fragment| Fragment {
			owners: prefixes.iter()
				.flat_map(|prefix| fragment.owners.iter().map(move |owner| prefix.join(&owner.0)))
				.collect(),
			..fragment
		})
		.collect()
}

fn indefinite_article(word: &str) -> &'static str {
	match word.chars().next().map(|c| c.to_ascii_lowercase()) {
		Some('a') | Some('e') | Some('i') | Some('o') | Some('u') => "an",
		_ => "a",
	}
}

/// Строит область связывания из списка имён (от внешней к внутренней) и вызывает `f` внутри неё.
fn with_scope<R>(names: &[Vec<String>], scope: &Scope, f: &mut dyn FnMut(&Scope) -> R) -> R {
	match names.split_first() {
		None => f(scope),
		Some((first, rest)) => with_scope(rest, &scope.push(first), f),
	}
}

pub struct Renderer<'d> {
	definitions: &'d DefinitionSet,
	options: RenderOptions,
}

impl<'d> Renderer<'d> {
	pub fn new(definitions: &'d DefinitionSet) -> Self {
		Renderer { definitions, options: RenderOptions::default() }
	}

	pub fn with_options(definitions: &'d DefinitionSet, options: RenderOptions) -> Self {
		Renderer { definitions, options }
	}

	pub fn render(&self, expr: &Expression) -> Rendered {
		self.render_in(expr, &Scope::Root)
	}

	/// Отображение выражения, находящегося внутри областей связывания `scope`.
	pub fn render_in(&self, expr: &Expression, scope: &Scope) -> Rendered {
		Rendered { fragments: self.node(expr, scope, &Path::root(), false) }
	}

	/// Отображение захвата с теми именами связанных переменных, что были видны в месте захвата.
	pub fn render_match(&self, capture: &MatchResult) -> Rendered {
		let fragments = with_scope(&capture.bound_variable_names, &Scope::Root, &mut |scope| {
			self.node(&capture.expression, scope, &Path::root(), false)
		});
		Rendered { fragments }
	}

	/// Цепочка `a < b < c`. Фрагмент левой части принадлежит пути `[0]`, звено `k` - пути `[k]`.
	pub fn render_chain(&self, chain: &Chain) -> Rendered {
		let mut fragments = Vec::new();
		let left = with_scope(&chain.bound_variable_names, &Scope::Root, &mut |scope| {
			self.node(&chain.left, scope, &Path::root(), true)
		});
		append(&mut fragments, rebase(left, &[Path(vec![0])]), false);
		for (position, link) in chain.links.iter().enumerate() {
			let owner = Path(vec![position + 1]);
			let symbol = self.definitions.relation(&link.relation).map_or(link.relation.as_str(), |r| r.symbol.as_str());
			fragments.push(Fragment::new(symbol, vec![owner.clone()], true));
			let right = with_scope(&chain.bound_variable_names, &Scope::Root, &mut |scope| {
				self.node(&link.right, scope, &Path::root(), true)
			});
			append(&mut fragments, rebase(right, &[owner]), true);
		}
		Rendered { fragments }
	}

	fn node(&self, expr: &Expression, scope: &Scope, path: &Path, nested: bool) -> Vec<Fragment> {
		use Expression::*;

		match expr {
			Variable { name, .. } => vec![Fragment::new(name.clone(), vec![path.clone()], false)],
			FunctionParameter { level, index } => {
				let text = match scope.name(*level, *index) {
					Some(name) => name.to_string(),
					None => {
						warn!("parameter ({}, {}) is rendered outside of its scope", level, index);
						format!("{}{}", "$".repeat(level + 1), index)
					},
				};
				vec![Fragment::new(text, vec![path.clone()], false)]
			},
			Application { name, args } => {
				let owner = vec![path.clone()];
				let mut result = vec![
					Fragment::new(name.clone(), owner.clone(), false),
					Fragment::new("(", owner.clone(), false),
				];
				for (position, arg) in args.iter().enumerate() {
					if position > 0 {
						result.push(Fragment::new(",", owner.clone(), false));
					}
					append(&mut result, self.node(arg, scope, &path.child(position), false), position > 0);
				}
				result.push(Fragment::new(")", owner, false));
				result
			},
			Defined { definition, bound_names, components } => {
				if self.options.use_shorthands {
					if let Some(result) = self.shorthand(expr, scope, path) {
						return result;
					}
				}

				let inner = scope.push(bound_names);
				let mut result = Vec::new();
				for (position, token) in definition.format.tokens().iter().enumerate() {
					let spaced = token.spaced && position > 0;
					match &token.part {
						FormatPart::Literal(text) => result.push(Fragment::new(text.clone(), vec![path.clone()], spaced)),
						FormatPart::Slot(slot) if *slot < bound_names.len() => {
							result.push(Fragment::new(bound_names[*slot].clone(), vec![path.clone()], spaced));
						},
						FormatPart::Slot(slot) => {
							let component = slot - bound_names.len();
							match components.get(component) {
								Some(component_expr) => {
									let rendered = self.node(component_expr, &inner, &path.child(component), true);
									append(&mut result, rendered, spaced);
								},
								None => warn!("format of `{}` refers to missing %{}", definition.key(), slot),
							}
						},
					}
				}

				if nested && definition.has(Attribute::RequiresBrackets) {
					let mut bracketed = vec![Fragment::new("(", vec![path.clone()], false)];
					append(&mut bracketed, result, false);
					bracketed.push(Fragment::new(")", vec![path.clone()], false));
					bracketed
				} else {
					result
				}
			},
			Type(type_expression) => self.type_assertion(type_expression, scope, path),
		}
	}

	/// Первое подходящее сокращение. Если не подошло ни одно, а сокращение с `split_on_failure` задано для этой же
	/// конъюнкции, компоненты показываются по отдельности через `and`.
	fn shorthand(&self, expr: &Expression, scope: &Scope, path: &Path) -> Option<Vec<Fragment>> {
		let shorthands = self.definitions.shorthands();
		for shorthand in shorthands {
			if let Some(captures) = match_template_in(&shorthand.template, expr, &Scope::Root, scope) {
				return Some(self.shorthand_format(shorthand, &captures, path));
			}
		}

		let definition = match expr {
			Expression::Defined { definition, .. } if definition.has(Attribute::Conjunction) => definition,
			_ => return None,
		};
		let splits = shorthands.iter().any(|shorthand| shorthand.split_on_failure && match &shorthand.template {
			Expression::Defined { definition: template_definition, .. } => template_definition.is_same(definition),
			_ => false,
		});
		if !splits {
			return None;
		}

		let components = expr.logical_components();
		let mut result = Vec::new();
		for (position, component) in components.iter().enumerate() {
			if position > 0 {
				result.push(Fragment::new("and", vec![path.clone()], true));
			}
			append(&mut result, self.node(component, scope, &path.child(position), false), position > 0);
		}
		Some(result)
	}

	fn shorthand_format(&self, shorthand: &Shorthand, captures: &[MatchResult], path: &Path) -> Vec<Fragment> {
		let mut result = Vec::new();
		for (position, token) in shorthand.format.tokens().iter().enumerate() {
			let spaced = token.spaced && position > 0;
			match &token.part {
				FormatPart::Literal(text) => result.push(Fragment::new(text.clone(), vec![path.clone()], spaced)),
				FormatPart::Slot(slot) => match captures.get(*slot) {
					Some(capture) => {
						let rendered = with_scope(&capture.bound_variable_names, &Scope::Root, &mut |scope| {
							self.node(&capture.expression, scope, &Path::root(), true)
						});
						append(&mut result, rebase(rendered, &[path.join(&capture.path.0)]), spaced);
					},
					None => warn!("shorthand `{}` refers to missing capture %{}", shorthand.format.source(), slot),
				},
			}
		}
		result
	}

	/// `term is an <properties> <name> <qualifier> with <object> <value>`. Каждое слово принадлежит тем
	/// элементарным утверждениям, которые оно показывает.
	fn type_assertion(&self, type_expression: &TypeExpression, scope: &Scope, path: &Path) -> Vec<Fragment> {
		let (_, map) = type_expression.flatten();
		let absolute = |paths: Vec<&Path>| -> Vec<Path> { paths.into_iter().map(|p| path.join(&p.0)).collect() };
		let statement = |map: &PathMap, statement: ElementaryStatement| -> Vec<Path> {
			absolute(map.statement_path(statement).into_iter().collect())
		};
		let occurrences = |map: &PathMap, field: TypeField| -> Vec<Path> { absolute(map.occurrences(&field)) };
		let definition = type_expression.definition();

		let mut result = Vec::new();
		let term = self.node(type_expression.term(), scope, &Path::root(), true);
		append(&mut result, rebase(term, &occurrences(&map, TypeField::Term)), false);

		let all_statements: Vec<Path> = map.entries().iter()
			.filter(|(_, field)| matches!(field, TypeField::Statements(s) if s.len() == 1))
			.map(|(p, _)| path.join(&p.0))
			.collect();
		result.push(Fragment::new("is", all_statements, true));

		let next_word = type_expression.properties().first().map(|p| p.name.as_str()).unwrap_or(&definition.name);
		let article = definition.article.clone().unwrap_or_else(|| indefinite_article(next_word).to_string());
		if !article.is_empty() {
			result.push(Fragment::new(article, statement(&map, ElementaryStatement::Base), true));
		}

		for (position, property) in type_expression.properties().iter().enumerate() {
			result.push(Fragment::new(property.name.clone(), statement(&map, ElementaryStatement::Property(position)), true));
		}
		result.push(Fragment::new(definition.name.clone(), statement(&map, ElementaryStatement::Base), true));

		if let Some(qualifier) = type_expression.qualifier() {
			// Текст уточнения показывают все утверждения, в которые подставлены его компоненты.
			let mut owners = statement(&map, ElementaryStatement::Qualifier);
			for (position, property) in type_expression.properties().iter().enumerate() {
				if property.requires_qualifier {
					owners.extend(statement(&map, ElementaryStatement::Property(position)));
				}
			}
			for (position, object) in type_expression.related_objects().iter().enumerate() {
				if object.definition.requires_qualifier {
					owners.extend(statement(&map, ElementaryStatement::RelatedObject(position)));
				}
			}

			for (position, token) in qualifier.definition.format.tokens().iter().enumerate() {
				let spaced = token.spaced || position == 0;
				match &token.part {
					FormatPart::Literal(text) => result.push(Fragment::new(text.clone(), owners.clone(), spaced)),
					FormatPart::Slot(slot) => match qualifier.components.get(*slot) {
						Some(component) => {
							let rendered = self.node(component, scope, &Path::root(), true);
							append(&mut result, rebase(rendered, &occurrences(&map, TypeField::QualifierComponent(*slot))), spaced);
						},
						None => warn!("qualifier format refers to missing %{}", slot),
					},
				}
			}
		}

		for (position, object) in type_expression.related_objects().iter().enumerate() {
			let owners = statement(&map, ElementaryStatement::RelatedObject(position));
			result.push(Fragment::new("with", owners.clone(), true));
			result.push(Fragment::new(object.definition.name.clone(), owners, true));
			let value = self.node(&object.value, scope, &Path::root(), true);
			append(&mut result, rebase(value, &occurrences(&map, TypeField::RelatedObjectValue(position))), true);
		}

		result
	}
}
