use log::debug;

use crate::expr::*;
use crate::flatten::{PathMap, TypeField};

/// Заменяет подвыражение по пути.
///
/// Возвращает новое выражение и все пути, где стояло то же логическое вхождение: терм и компоненты уточнения
/// повторяются в каждом элементарном утверждении развёрнутой формы, и заменяются везде сразу.
/// Пути упорядочены: основание, уточнение, свойства, связанные объекты.
pub fn replace_at_path(root: &Expression, path: &[usize], replacement: Expression) -> Result<(Expression, Vec<Path>), InvalidPath> {
	let result = replace(root, path, path, &replacement)?;
	debug!("replaced {:?} with `{}`, {} equivalent paths", path, replacement, result.1.len());
	Ok(result)
}

fn replace(
	expr: &Expression,
	path: &[usize],
	full: &[usize],
	replacement: &Expression,
) -> Result<(Expression, Vec<Path>), InvalidPath> {
	use Expression::*;

	let depth = full.len() - path.len();
	let invalid = || InvalidPath { path: full.into(), depth };

	match path {
		[] => Ok((replacement.clone(), vec![Path::root()])),
		[start, tail @ ..] => match expr {
			Defined { definition, bound_names, components } => {
				let component = components.get(*start).ok_or_else(invalid)?;
				let (component, paths) = replace(component, tail, full, replacement)?;
				let mut components = components.clone();
				components[*start] = component;
				Ok((
					Defined { definition: definition.clone(), bound_names: bound_names.clone(), components },
					prefixed(*start, paths),
				))
			},
			Application { name, args } => {
				let arg = args.get(*start).ok_or_else(invalid)?;
				let (arg, paths) = replace(arg, tail, full, replacement)?;
				let mut args = args.clone();
				args[*start] = arg;
				Ok((Application { name: name.clone(), args }, prefixed(*start, paths)))
			},
			Type(type_expression) => replace_in_type(type_expression, path, full, replacement),
			Variable { .. } | FunctionParameter { .. } => Err(invalid()),
		},
	}
}

fn prefixed(index: usize, paths: Vec<Path>) -> Vec<Path> {
	paths.into_iter()
		.map(|path| {
			let mut result = vec![index];
			result.extend(path.0);
			Path(result)
		})
		.collect()
}

/// Каждое вхождение поля, продолженное каждым путём внутри его значения.
fn spread(map: &PathMap, field: &TypeField, inner: &[Path]) -> Vec<Path> {
	map.occurrences(field)
		.into_iter()
		.flat_map(|occurrence| inner.iter().map(move |path| occurrence.join(&path.0)))
		.collect()
}

fn replace_in_type(
	type_expression: &TypeExpression,
	path: &[usize],
	full: &[usize],
	replacement: &Expression,
) -> Result<(Expression, Vec<Path>), InvalidPath> {
	let (flattened, map) = type_expression.flatten();
	let slot = map.resolve(path).map(|(field, rest)| (field.clone(), rest));
	let invalid = || InvalidPath { path: full.into(), depth: full.len() - path.len() };

	let (result, field, inner) = match slot {
		Some((TypeField::Term, rest)) => {
			let (term, inner) = replace(type_expression.term(), rest, full, replacement)?;
			(type_expression.with_term(term), TypeField::Term, inner)
		},
		Some((TypeField::QualifierComponent(position), rest)) => {
			let component = type_expression.qualifier_components().get(position).ok_or_else(invalid)?;
			let (component, inner) = replace(component, rest, full, replacement)?;
			let result = type_expression.with_qualifier_component(position, component).ok_or_else(invalid)?;
			(result, TypeField::QualifierComponent(position), inner)
		},
		Some((TypeField::RelatedObjectValue(position), rest)) => {
			let value = &type_expression.related_objects().get(position).ok_or_else(invalid)?.value;
			let (value, inner) = replace(value, rest, full, replacement)?;
			let result = type_expression.with_related_object_value(position, value).ok_or_else(invalid)?;
			(result, TypeField::RelatedObjectValue(position), inner)
		},
		// Утверждения, конъюнкции и компоненты по умолчанию не повторяются: заменяем в развёрнутой форме.
		_ => {
			debug!("path {:?} addresses the structure of a type assertion, replacing in its flattened form", path);
			return replace(&flattened, path, full, replacement);
		},
	};

	Ok((Expression::Type(Box::new(result)), spread(&map, &field, &inner)))
}
