use std::collections::BTreeMap;

use log::trace;

use crate::expr::*;

/// Захваченное подвыражение вместе с именами связанных переменных, видимых в месте захвата.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchResult {
	pub expression: Expression,
	/// От внешней области к внутренней.
	pub bound_variable_names: Vec<Vec<String>>,
	/// Где в сопоставляемом выражении находится захват (первое вхождение).
	pub path: Path,
}

/// Хранилище захватов. Номер слота - порядок первого появления переменной в шаблоне.
#[derive(Default, Debug, Clone)]
struct BindingStorage {
	slots: BTreeMap<String, usize>,
	captures: Vec<(MatchResult, String)>,
}

impl BindingStorage {
	/// Добавляет захват. Если слот уже занят, проверяет что сериализации совпадают. Если это не так, возвращает None.
	fn add(&mut self, name: &str, expression: &Expression, scope: &Scope, path: &[usize]) -> Option<()> {
		let serialized = expression.serialize();
		match self.slots.get(name) {
			Some(slot) => {
				if self.captures[*slot].1 == serialized {
					Some(())
				} else {
					trace!("slot `{}` already holds `{}`, got `{}`", name, self.captures[*slot].1, serialized);
					None
				}
			},
			None => {
				self.slots.insert(name.to_string(), self.captures.len());
				self.captures.push((MatchResult {
					expression: expression.clone(),
					bound_variable_names: scope.to_vec(),
					path: path.into(),
				}, serialized));
				Some(())
			},
		}
	}

	fn into_results(self) -> Vec<MatchResult> {
		self.captures.into_iter().map(|(result, _)| result).collect()
	}
}

fn find_bindings(
	template: &Expression,
	expression: &Expression,
	template_scope: &Scope,
	expression_scope: &Scope,
	path: &mut Vec<usize>,
	storage: &mut BindingStorage,
) -> Option<()> {
	use Expression::*;

	match (template, expression) {
		(Variable { name, .. }, _) => storage.add(name, expression, expression_scope, path),

		// Утверждение о типе равно своей развёрнутой форме, сравниваются развёрнутые формы.
		(Type(template), _) => {
			let (flattened, _) = template.flatten();
			find_bindings(&flattened, expression, template_scope, expression_scope, path, storage)
		},
		(_, Type(expression)) => {
			let (flattened, _) = expression.flatten();
			find_bindings(template, &flattened, template_scope, expression_scope, path, storage)
		},

		(FunctionParameter { level, index }, FunctionParameter { level: expr_level, index: expr_index }) => {
			if level == expr_level && index == expr_index { Some(()) } else { None }
		},

		(
			Defined { definition, bound_names, components },
			Defined { definition: expr_definition, bound_names: expr_bound_names, components: expr_components },
		) if definition.is_same(expr_definition) && components.len() == expr_components.len() => {
			// Уровни параметров сравниваются относительно своих областей, между сторонами они не переводятся.
			let template_scope = template_scope.push(bound_names);
			let expression_scope = expression_scope.push(expr_bound_names);
			for (position, (component, expr_component)) in components.iter().zip(expr_components.iter()).enumerate() {
				path.push(position);
				let result = find_bindings(component, expr_component, &template_scope, &expression_scope, path, storage);
				path.pop();
				result?;
			}
			Some(())
		},

		(Application { name, args }, Application { name: expr_name, args: expr_args })
			if name == expr_name && args.len() == expr_args.len()
		=> {
			for (position, (arg, expr_arg)) in args.iter().zip(expr_args.iter()).enumerate() {
				path.push(position);
				let result = find_bindings(arg, expr_arg, template_scope, expression_scope, path, storage);
				path.pop();
				result?;
			}
			Some(())
		},

		(template, expression) => {
			trace!("{:?} does not match {:?}", template.kind(), expression.kind());
			None
		},
	}
}

/// Сопоставляет выражение с шаблоном. Переменные шаблона - слоты захвата; результат упорядочен по первому появлению слота.
pub fn match_template(template: &Expression, expression: &Expression) -> Option<Vec<MatchResult>> {
	match_template_in(template, expression, &Scope::Root, &Scope::Root)
}

/// То же, что `match_template`, но обе стороны уже находятся внутри своих областей связывания.
pub fn match_template_in(
	template: &Expression,
	expression: &Expression,
	template_scope: &Scope,
	expression_scope: &Scope,
) -> Option<Vec<MatchResult>> {
	let mut storage = BindingStorage::default();
	find_bindings(template, expression, template_scope, expression_scope, &mut Vec::new(), &mut storage)?;
	Some(storage.into_results())
}

/// Число различных слотов захвата в шаблоне.
pub fn count_capture_slots(template: &Expression) -> usize {
	fn collect(template: &Expression, names: &mut Vec<String>) {
		match template {
			Expression::Variable { name, .. } => {
				if !names.contains(name) {
					names.push(name.clone());
				}
			},
			Expression::Defined { components, .. } => components.iter().for_each(|c| collect(c, names)),
			Expression::Application { args, .. } => args.iter().for_each(|a| collect(a, names)),
			Expression::Type(type_expression) => collect(&type_expression.flatten().0, names),
			Expression::FunctionParameter { .. } => {},
		}
	}

	let mut names = Vec::new();
	collect(template, &mut names);
	names.len()
}
