use std::ops::Range;

use log::{debug, trace};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::binding::{match_template_in, MatchResult};
use crate::definitions::{DefinitionSet, RelationTemplate};
use crate::expr::{Expression, Scope};
use crate::parsing::{parse_expression_value_in, MalformedExpression};

/// Шаг уже проверенного доказательства. Движок только показывает шаги, их корректность не проверяется.
#[derive(Clone, Debug)]
pub enum Step {
	/// Утверждение, выведенное из `premises`. Пустой список - посылки не указаны.
	Assertion {
		statement: Expression,
		premises: Vec<Expression>,
	},
	Target {
		statement: Expression,
	},
	/// Утверждение, вывод которого скрыт.
	Elided {
		statement: Expression,
		description: Option<String>,
	},
	Deduction {
		antecedent: Expression,
		substeps: Vec<Step>,
	},
	/// Вводит имя `variable_name` для объекта, удовлетворяющего `assumption`.
	Naming {
		variable_name: String,
		assumption: Expression,
		substeps: Vec<Step>,
	},
	Generalization {
		variable_name: String,
		substeps: Vec<Step>,
	},
	Subproof {
		name: Option<String>,
		substeps: Vec<Step>,
	},
}

impl Step {
	/// Утверждение шага, если шаг его порождает непосредственно.
	pub fn statement(&self) -> Option<&Expression> {
		use Step::*;

		match self {
			Assertion { statement, .. } | Target { statement } | Elided { statement, .. } => Some(statement),
			Deduction { .. } | Naming { .. } | Generalization { .. } | Subproof { .. } => None,
		}
	}

	pub fn premises(&self) -> &[Expression] {
		match self {
			Step::Assertion { premises, .. } => premises,
			_ => &[],
		}
	}

	pub fn substeps(&self) -> Option<&[Step]> {
		use Step::*;

		match self {
			Deduction { substeps, .. } | Naming { substeps, .. } | Generalization { substeps, .. } | Subproof { substeps, .. } => {
				Some(substeps)
			},
			Assertion { .. } | Target { .. } | Elided { .. } => None,
		}
	}

	/// Имена, которые шаг связывает для своих подшагов.
	pub fn introduced_names(&self) -> &[String] {
		match self {
			Step::Naming { variable_name, .. } | Step::Generalization { variable_name, .. } => std::slice::from_ref(variable_name),
			_ => &[],
		}
	}
}

#[derive(Debug, Error)]
pub enum StepError {
	#[error("steps are not valid: {0}")]
	Json(#[from] serde_json::Error),
	#[error("step {path:?}: {error}")]
	Expression {
		/// Номера шагов от внешнего к вложенному.
		path: Vec<usize>,
		error: MalformedExpression,
	},
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawStep {
	Assertion {
		statement: Value,
		#[serde(default)]
		premises: Vec<Value>,
	},
	Target {
		statement: Value,
	},
	Elided {
		statement: Value,
		#[serde(default)]
		description: Option<String>,
	},
	Deduction {
		antecedent: Value,
		substeps: Vec<RawStep>,
	},
	Naming {
		#[serde(rename = "variableName")]
		variable_name: String,
		assumption: Value,
		substeps: Vec<RawStep>,
	},
	Generalization {
		#[serde(rename = "variableName")]
		variable_name: String,
		substeps: Vec<RawStep>,
	},
	Subproof {
		#[serde(default)]
		name: Option<String>,
		substeps: Vec<RawStep>,
	},
}

struct StepReader<'d> {
	definitions: &'d DefinitionSet,
	scopes: Vec<usize>,
	path: Vec<usize>,
}

impl StepReader<'_> {
	fn expression(&self, value: &Value) -> Result<Expression, StepError> {
		parse_expression_value_in(value, self.definitions, &self.scopes)
			.map_err(|error| StepError::Expression { path: self.path.clone(), error })
	}

	fn expressions(&self, values: &[Value]) -> Result<Vec<Expression>, StepError> {
		values.iter().map(|value| self.expression(value)).collect()
	}

	fn steps(&mut self, raw: Vec<RawStep>) -> Result<Vec<Step>, StepError> {
		let mut result = Vec::with_capacity(raw.len());
		for (position, step) in raw.into_iter().enumerate() {
			self.path.push(position);
			let step = self.step(step);
			self.path.pop();
			result.push(step?);
		}
		Ok(result)
	}

	/// Подшаги внутри области, которую вводит шаг.
	fn scoped(&mut self, introduces: bool, raw: Vec<RawStep>) -> Result<Vec<Step>, StepError> {
		if introduces {
			self.scopes.push(1);
		}
		let result = self.steps(raw);
		if introduces {
			self.scopes.pop();
		}
		result
	}

	fn step(&mut self, raw: RawStep) -> Result<Step, StepError> {
		Ok(match raw {
			RawStep::Assertion { statement, premises } => Step::Assertion {
				statement: self.expression(&statement)?,
				premises: self.expressions(&premises)?,
			},
			RawStep::Target { statement } => Step::Target { statement: self.expression(&statement)? },
			RawStep::Elided { statement, description } => Step::Elided {
				statement: self.expression(&statement)?,
				description,
			},
			RawStep::Deduction { antecedent, substeps } => Step::Deduction {
				antecedent: self.expression(&antecedent)?,
				substeps: self.scoped(false, substeps)?,
			},
			RawStep::Naming { variable_name, assumption, substeps } => {
				// Допущение уже говорит о названном объекте.
				self.scopes.push(1);
				let assumption = self.expression(&assumption);
				self.scopes.pop();
				Step::Naming {
					variable_name,
					assumption: assumption?,
					substeps: self.scoped(true, substeps)?,
				}
			},
			RawStep::Generalization { variable_name, substeps } => Step::Generalization {
				variable_name,
				substeps: self.scoped(true, substeps)?,
			},
			RawStep::Subproof { name, substeps } => Step::Subproof { name, substeps: self.scoped(false, substeps)? },
		})
	}
}

/// Читает список шагов из JSON: `[{"type": "assertion", "statement": ...}, ...]`.
pub fn parse_steps(input: &str, definitions: &DefinitionSet) -> Result<Vec<Step>, StepError> {
	let raw: Vec<RawStep> = serde_json::from_str(input)?;
	let steps = StepReader { definitions, scopes: Vec::new(), path: Vec::new() }.steps(raw)?;
	debug!("read {} top-level steps", steps.len());
	Ok(steps)
}

/// Звено цепочки: `< c`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainLink {
	/// Ключ отношения, см. `RelationTemplate::key`.
	pub relation: String,
	pub right: Expression,
	/// Шаги, которые показывает звено: один, или два при связке через транзитивность.
	pub steps: Range<usize>,
}

/// Цепочка `a < b < c`, собранная из подряд идущих шагов.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Chain {
	pub steps: Range<usize>,
	pub left: Expression,
	/// Области связывания, в которых находятся части цепочки, от внешней к внутренней.
	pub bound_variable_names: Vec<Vec<String>>,
	pub links: Vec<ChainLink>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RenderGroup {
	/// Шаг показывается сам по себе.
	Step {
		index: usize,
	},
	Chain(Chain),
	/// Шаг с подшагами и группировка этих подшагов.
	Nested {
		index: usize,
		inner: Vec<RenderGroup>,
	},
}

struct RelationMatch<'d> {
	relation: &'d RelationTemplate,
	left: MatchResult,
	right: MatchResult,
}

fn match_relation<'d>(statement: &Expression, definitions: &'d DefinitionSet, scope: &Scope) -> Option<RelationMatch<'d>> {
	definitions.relations().iter().find_map(|relation| {
		let mut captures = match_template_in(&relation.template, statement, &Scope::Root, scope)?;
		if captures.len() < 2 {
			return None;
		}
		let right = captures.swap_remove(1);
		let left = captures.swap_remove(0);
		Some(RelationMatch { relation, left, right })
	})
}

fn relation_at<'d>(steps: &[Step], index: usize, definitions: &'d DefinitionSet, scope: &Scope) -> Option<RelationMatch<'d>> {
	steps.get(index)?.statement().and_then(|statement| match_relation(statement, definitions, scope))
}

/// Пытается собрать цепочку, начинающуюся с шага `start`. Цепочка из одного звена не собирается.
fn chain_from(steps: &[Step], start: usize, definitions: &DefinitionSet, scope: &Scope) -> Option<Chain> {
	let first = relation_at(steps, start, definitions, scope)?;
	if !first.relation.transitive && !first.relation.chainable {
		return None;
	}

	let left = first.left;
	let mut relation = first.relation.key.clone();
	let mut right = first.right.expression;
	// Утверждение, которое последним продлило цепочку.
	let mut statement = steps[start].statement()?;
	let mut links = vec![ChainLink { relation: relation.clone(), right: right.clone(), steps: start..start + 1 }];
	let mut next = start + 1;

	while let Some(current) = relation_at(steps, next, definitions, scope) {
		if current.left.expression != right {
			trace!("step {} starts from `{}`, chain is at `{}`", next, current.left.expression, right);
			break;
		}
		let current_statement = steps[next].statement()?;

		// Связка через транзитивность: следующий шаг выводит `left R c` из цепочки и текущего шага.
		let combined = definitions.combine(&relation, &current.relation.key).map(str::to_string);
		let linking = relation_at(steps, next + 1, definitions, scope).filter(|linking| {
			let premises = steps[next + 1].premises();
			Some(&linking.relation.key) == combined.as_ref()
				&& linking.left.expression == left.expression
				&& linking.right.expression == current.right.expression
				&& (premises.is_empty() || (premises.len() == 2 && &premises[0] == statement && &premises[1] == current_statement))
		});

		if let (Some(_), Some(combined)) = (&linking, combined) {
			trace!("steps {} and {} link through `{}`", next, next + 1, combined);
			links.push(ChainLink { relation: current.relation.key.clone(), right: current.right.expression.clone(), steps: next..next + 2 });
			relation = combined;
			right = current.right.expression;
			statement = steps[next + 1].statement()?;
			next += 2;
		} else if current.relation.key == relation && current.relation.chainable {
			links.push(ChainLink { relation: relation.clone(), right: current.right.expression.clone(), steps: next..next + 1 });
			right = current.right.expression;
			statement = current_statement;
			next += 1;
		} else {
			break;
		}
	}

	if links.len() < 2 {
		return None;
	}
	Some(Chain {
		steps: start..next,
		left: left.expression,
		bound_variable_names: left.bound_variable_names,
		links,
	})
}

/// Группирует шаги для отображения: подряд идущие шаги, связанные транзитивным или цепочечным отношением, становятся одной
/// цепочкой. Просмотр жадный, слева направо, порядок шагов не меняется.
pub fn linearize(steps: &[Step], definitions: &DefinitionSet) -> Vec<RenderGroup> {
	let result = linearize_in(steps, definitions, &Scope::Root);
	debug!("linearized {} steps into {} groups", steps.len(), result.len());
	result
}

/// То же, что `linearize`, для шагов внутри областей связывания `scope`.
pub fn linearize_in(steps: &[Step], definitions: &DefinitionSet, scope: &Scope) -> Vec<RenderGroup> {
	let mut result = Vec::new();
	let mut index = 0;
	while index < steps.len() {
		if let Some(chain) = chain_from(steps, index, definitions, scope) {
			index = chain.steps.end;
			result.push(RenderGroup::Chain(chain));
			continue;
		}

		let step = &steps[index];
		result.push(match step.substeps() {
			Some(substeps) => RenderGroup::Nested {
				index,
				inner: linearize_in(substeps, definitions, &scope.push(step.introduced_names())),
			},
			None => RenderGroup::Step { index },
		});
		index += 1;
	}
	result
}
