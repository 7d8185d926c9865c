mod common;

use common::*;
use proofview::definitions::Attribute;
use proofview::*;

fn load(input: &str) -> Result<DefinitionSet, DefinitionError> {
	DefinitionSet::from_json(input)
}

#[test]
fn fixture_loads() {
	let definitions = definitions();

	let conjunction = definitions.conjunction().unwrap();
	assert_eq!(conjunction.symbol, "∧");
	assert!(conjunction.has(Attribute::Conjunction));
	assert_eq!(definitions.definition_for("+", Some("ℕ")).unwrap().key(), "+#ℕ");

	let function = definitions.type_definition("function").unwrap();
	assert_eq!(function.qualifier.as_ref().unwrap().arity(), 2);
	assert!(function.property("surjectiveFunction").unwrap().requires_qualifier);
	assert_eq!(definitions.relations().len(), 4);
	assert_eq!(definitions.relation("<").unwrap().symbol, "<");
	assert_eq!(definitions.shorthands().len(), 1);
}

#[test]
fn relations_combine() {
	let definitions = definitions();

	assert_eq!(definitions.combine("<", "<"), Some("<"));
	assert_eq!(definitions.combine("≤", "<"), Some("<"));
	assert_eq!(definitions.combine("<", "≤"), Some("<"));
	assert_eq!(definitions.combine("=", "<"), None);
	assert_eq!(definitions.combine("∈", "∈"), None);
}

#[test]
fn invalid_sets_are_rejected() {
	assert!(matches!(load(r#"{ "definitions": [{ "symbol": "=", "arity": 2 }] }"#), Err(DefinitionError::Json(_))));
	assert!(matches!(load(r#"{ "axioms": [] }"#), Err(DefinitionError::Json(_))));

	assert!(matches!(load(r#"{ "definitions": [
		{ "symbol": "=", "arity": 2, "format": "%0 = %1" },
		{ "symbol": "=", "arity": 2, "format": "%0 = %1" }
	] }"#), Err(DefinitionError::Duplicate(_))));

	assert!(matches!(load(r#"{ "definitions": [
		{ "symbol": "=", "arity": 2, "format": "%0 = %2" }
	] }"#), Err(DefinitionError::FormatSlot { slot: 2, available: 2, .. })));

	assert!(matches!(load(r#"{ "typeDefinitions": [
		{ "symbol": "set", "name": "set" }
	] }"#), Err(DefinitionError::UnknownDefinition(_))));

	assert!(matches!(load(r#"{
		"definitions": [{ "symbol": "set", "arity": 2, "format": "%0 is a set in %1" }],
		"typeDefinitions": [{ "symbol": "set", "name": "set" }]
	}"#), Err(DefinitionError::WrongArity { expected: 1, actual: 2, .. })));

	assert!(matches!(load(r#"{
		"definitions": [{ "symbol": "∧", "arity": 3, "format": "%0 ∧ %1 ∧ %2", "attributes": ["conjunction"] }]
	}"#), Err(DefinitionError::WrongArity { expected: 2, .. })));

	assert!(matches!(load(r#"{
		"definitions": [{ "symbol": "<", "arity": 2, "format": "%0 < %1" }],
		"relations": [{ "template": { "definition": "<", "components": [{ "name": "a" }, { "name": "a" }] } }]
	}"#), Err(DefinitionError::RelationTemplate { captures: 1, .. })));

	assert!(matches!(load(r#"{
		"definitions": [{ "symbol": "<", "arity": 2, "format": "%0 < %1" }],
		"relations": [{ "template": { "definition": "<", "components": [{ "name": "a" }, { "name": "b" }] } }],
		"transitivities": [{ "first": "<", "second": "≤", "result": "<" }]
	}"#), Err(DefinitionError::UnknownRelation(_))));

	assert!(matches!(load(r#"{
		"shorthands": [{ "template": { "definition": "∧", "components": [] }, "format": "%0" }]
	}"#), Err(DefinitionError::Expression { .. })));
}

#[test]
fn symbols_must_survive_the_text_form() {
	let symbol = |symbol: &str, disambiguator: &str| load(&format!(
		r#"{{ "definitions": [{{ "symbol": "{}", "disambiguator": {}, "arity": 2, "format": "%0 %1" }}] }}"#,
		symbol, disambiguator,
	));

	assert!(matches!(symbol("is in", "null"), Err(DefinitionError::InvalidSymbol(s)) if s == "is in"));
	assert!(matches!(symbol("$1", "null"), Err(DefinitionError::InvalidSymbol(_))));
	assert!(matches!(symbol("+#ℕ", "null"), Err(DefinitionError::InvalidSymbol(_))));
	assert!(matches!(symbol("f(x)", "null"), Err(DefinitionError::InvalidSymbol(_))));
	assert!(matches!(symbol("", "null"), Err(DefinitionError::InvalidSymbol(_))));
	assert!(matches!(symbol("+", r#""ℕ ℝ""#), Err(DefinitionError::InvalidSymbol(s)) if s == "ℕ ℝ"));
	assert!(matches!(symbol("+", r#""""#), Err(DefinitionError::InvalidSymbol(_))));

	let definitions = symbol("∈", r#""ℕ""#).unwrap();
	let expression = parse_expression(
		r#"{ "definition": "∈", "disambiguator": "ℕ", "components": [{ "name": "a" }, { "name": "b" }] }"#,
		&definitions,
	).unwrap();
	assert_eq!(expression.serialize(), "∈#ℕ a b");
	assert_eq!(parse_serialized(&expression.serialize(), &definitions).unwrap(), expression);
}

#[test]
fn huge_format_slot_is_an_error() {
	assert!(matches!(load(r#"{ "definitions": [
		{ "symbol": "=", "arity": 2, "format": "%0 %99999999999999999999999" }
	] }"#), Err(DefinitionError::Format { .. })));

	assert!(matches!(load(r#"{
		"definitions": [{ "symbol": "∧", "arity": 2, "format": "%0 ∧ %1", "attributes": ["conjunction"] }],
		"shorthands": [{ "template": { "definition": "∧", "components": [{ "name": "a" }, { "name": "b" }] }, "format": "%99999999999999999999999" }]
	}"#), Err(DefinitionError::Format { .. })));
}

#[test]
fn relations_are_told_apart_by_disambiguator() {
	let definitions = load(r#"{
		"definitions": [
			{ "symbol": "=", "disambiguator": "ℕ", "arity": 2, "format": "%0 = %1" },
			{ "symbol": "=", "disambiguator": "ℝ", "arity": 2, "format": "%0 = %1" }
		],
		"relations": [
			{ "template": { "definition": "=", "disambiguator": "ℕ", "components": [{ "name": "a" }, { "name": "b" }] }, "chainable": true },
			{ "template": { "definition": "=", "disambiguator": "ℝ", "components": [{ "name": "a" }, { "name": "b" }] }, "transitive": true }
		]
	}"#).unwrap();

	assert_eq!(definitions.relation("=#ℕ").unwrap().symbol, "=");
	assert!(definitions.relation("=#ℝ").unwrap().transitive);
	assert!(definitions.relation("=").is_none());
	assert_eq!(definitions.combine("=#ℝ", "=#ℝ"), Some("=#ℝ"));
	assert_eq!(definitions.combine("=#ℕ", "=#ℝ"), None);

	assert!(matches!(load(r#"{
		"definitions": [{ "symbol": "<", "arity": 2, "format": "%0 < %1" }],
		"relations": [
			{ "template": { "definition": "<", "components": [{ "name": "a" }, { "name": "b" }] } },
			{ "template": { "definition": "<", "components": [{ "name": "b" }, { "name": "a" }] } }
		]
	}"#), Err(DefinitionError::Duplicate(key)) if key == "<"));
}
