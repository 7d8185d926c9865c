mod common;

use common::*;
use proofview::flatten::{ElementaryStatement, TypeField};
use proofview::*;

fn type_expression(expression: &Expression) -> &TypeExpression {
	match expression {
		Expression::Type(type_expression) => type_expression,
		other => panic!("expected a type assertion, got `{}`", other),
	}
}

#[test]
fn function_with_qualifier_and_properties() {
	let definitions = definitions();
	let assertion = function_assertion(&definitions);
	let (flattened, _) = type_expression(&assertion).flatten();

	assert_eq!(
		flattened.serialize(),
		"∧ ∧ ∧ function f functionFrom f A B injectiveFunction f surjectiveFunction f A B",
	);
	assert_eq!(assertion.serialize(), flattened.serialize());
}

#[test]
fn statements_sit_on_the_left_spine() {
	let definitions = definitions();
	let assertion = function_assertion(&definitions);
	let (_, map) = type_expression(&assertion).flatten();

	assert_eq!(map.statement_path(ElementaryStatement::Base), Some(&Path(vec![0, 0, 0])));
	assert_eq!(map.statement_path(ElementaryStatement::Qualifier), Some(&Path(vec![0, 0, 1])));
	assert_eq!(map.statement_path(ElementaryStatement::Property(0)), Some(&Path(vec![0, 1])));
	assert_eq!(map.statement_path(ElementaryStatement::Property(1)), Some(&Path(vec![1])));
	assert_eq!(map.statement_path(ElementaryStatement::RelatedObject(0)), None);

	assert_eq!(
		map.field(&[0, 0]),
		Some(&TypeField::Statements(vec![ElementaryStatement::Base, ElementaryStatement::Qualifier])),
	);
	assert_eq!(map.field(&[]).map(|field| match field {
		TypeField::Statements(statements) => statements.len(),
		_ => 0,
	}), Some(4));

	assert_eq!(map.occurrences(&TypeField::Term), vec![
		&Path(vec![0, 0, 0, 0]),
		&Path(vec![0, 0, 1, 0]),
		&Path(vec![0, 1, 0]),
		&Path(vec![1, 0]),
	]);
	assert_eq!(map.occurrences(&TypeField::QualifierComponent(1)), vec![
		&Path(vec![0, 0, 1, 2]),
		&Path(vec![1, 2]),
	]);
}

#[test]
fn related_objects_fold_after_properties() {
	let definitions = definitions();
	let assertion = binary_operation_assertion(&definitions);
	let (flattened, map) = type_expression(&assertion).flatten();

	assert_eq!(
		flattened.serialize(),
		"∧ ∧ ∧ ∧ binaryOperation o binaryOperationOn o S associative o commutative o identityElement e o",
	);
	assert_eq!(map.statement_path(ElementaryStatement::RelatedObject(0)), Some(&Path(vec![1])));
	assert_eq!(map.field(&[1, 0]), Some(&TypeField::RelatedObjectValue(0)));
	assert_eq!(map.field(&[1, 1]), Some(&TypeField::Term));
}

#[test]
fn no_conjunction_without_folded_statements() {
	let definitions = definitions();
	let bare = json(&definitions, r#"{ "definition": "function", "term": { "name": "g" } }"#);
	let (flattened, map) = type_expression(&bare).flatten();

	assert_eq!(flattened.serialize(), "function g");
	assert_eq!(map.statement_path(ElementaryStatement::Base), Some(&Path::root()));
	assert_eq!(map.field(&[0]), Some(&TypeField::Term));

	let injective = json(&definitions, r#"{ "definition": "function", "term": { "name": "g" }, "properties": ["injectiveFunction"] }"#);
	assert_eq!(injective.serialize(), "∧ function g injectiveFunction g");
}

#[test]
fn default_qualifier_components_fill_the_base() {
	let definitions = definitions();
	let group = json(&definitions, r#"{ "definition": "group", "term": { "name": "G" } }"#);
	let (flattened, map) = type_expression(&group).flatten();

	assert_eq!(flattened.serialize(), "group G ∘");
	assert_eq!(map.field(&[1]), Some(&TypeField::DefaultQualifierComponent(0)));
}

#[test]
fn logical_components_come_from_the_flattened_form() {
	let definitions = definitions();
	let assertion = function_assertion(&definitions);
	let components: Vec<String> = assertion.logical_components().iter().map(Expression::serialize).collect();

	assert_eq!(components, vec![
		"∧ ∧ function f functionFrom f A B injectiveFunction f",
		"surjectiveFunction f A B",
	]);
}
