#![allow(dead_code)]

use proofview::{parse_expression, parse_serialized, DefinitionSet, Expression};

pub const DEFINITIONS: &str = r#"{
	"definitions": [
		{ "symbol": "∧", "arity": 2, "format": "%0 ∧ %1", "attributes": ["conjunction"] },
		{ "symbol": "→", "arity": 2, "format": "%0 → %1", "attributes": ["requiresBrackets"] },
		{ "symbol": "=", "arity": 2, "format": "%0 = %1", "attributes": ["equality"] },
		{ "symbol": "<", "arity": 2, "format": "%0 < %1" },
		{ "symbol": "≤", "arity": 2, "format": "%0 ≤ %1" },
		{ "symbol": "∈", "arity": 2, "format": "%0 ∈ %1" },
		{ "symbol": "+", "disambiguator": "ℕ", "arity": 2, "format": "%0 + %1", "attributes": ["requiresBrackets"] },
		{ "symbol": "∀", "arity": 1, "boundVariables": 1, "format": "∀%0 %1" },
		{ "symbol": "∃", "arity": 1, "boundVariables": 1, "format": "∃%0 %1" },
		{ "symbol": "function", "arity": 1, "format": "%0 is a function" },
		{ "symbol": "functionFrom", "arity": 3, "format": "%0 is a function from %1 to %2" },
		{ "symbol": "injectiveFunction", "arity": 1, "format": "%0 is injective" },
		{ "symbol": "surjectiveFunction", "arity": 3, "format": "%0 is surjective from %1 to %2" },
		{ "symbol": "binaryOperation", "arity": 1, "format": "%0 is a binary operation" },
		{ "symbol": "binaryOperationOn", "arity": 2, "format": "%0 is a binary operation on %1" },
		{ "symbol": "associative", "arity": 1, "format": "%0 is associative" },
		{ "symbol": "commutative", "arity": 1, "format": "%0 is commutative" },
		{ "symbol": "identityElement", "arity": 2, "format": "%0 is an identity of %1" },
		{ "symbol": "group", "arity": 2, "format": "%0 is a group under %1" }
	],
	"typeDefinitions": [
		{
			"symbol": "function",
			"name": "function",
			"qualifier": { "symbol": "functionFrom", "format": "from %0 → %1" },
			"properties": [
				{ "symbol": "injectiveFunction", "name": "injective" },
				{ "symbol": "surjectiveFunction", "name": "surjective", "requiresQualifier": true }
			]
		},
		{
			"symbol": "binaryOperation",
			"name": "binary operation",
			"qualifier": { "symbol": "binaryOperationOn", "format": "on %0" },
			"properties": [
				{ "symbol": "associative", "name": "associative" },
				{ "symbol": "commutative", "name": "commutative" }
			],
			"relatedObjects": [
				{ "symbol": "identityElement", "name": "identity" }
			]
		},
		{
			"symbol": "group",
			"name": "group",
			"defaultQualifierComponents": [{ "name": "∘" }]
		}
	],
	"relations": [
		{ "template": { "definition": "<", "components": [{ "name": "a" }, { "name": "b" }] }, "transitive": true, "chainable": true },
		{ "template": { "definition": "≤", "components": [{ "name": "a" }, { "name": "b" }] }, "transitive": true, "chainable": true },
		{ "template": { "definition": "=", "components": [{ "name": "a" }, { "name": "b" }] }, "transitive": true, "chainable": true },
		{ "template": { "definition": "∈", "components": [{ "name": "a" }, { "name": "b" }] } }
	],
	"transitivities": [
		{ "first": "≤", "second": "<", "result": "<" },
		{ "first": "<", "second": "≤", "result": "<" }
	],
	"shorthands": [
		{
			"template": {
				"definition": "∧",
				"components": [
					{ "definition": "=", "components": [{ "name": "A" }, { "name": "C" }] },
					{ "definition": "=", "components": [{ "name": "B" }, { "name": "C" }] }
				]
			},
			"format": "%0 = %2 = %1",
			"splitOnFailure": true
		}
	]
}"#;

pub const FUNCTION_ASSERTION: &str = r#"{
	"definition": "function",
	"term": { "name": "f" },
	"qualifier": { "definition": "functionFrom", "components": [{ "name": "A" }, { "name": "B" }] },
	"properties": ["injectiveFunction", "surjectiveFunction"]
}"#;

pub const BINARY_OPERATION_ASSERTION: &str = r#"{
	"definition": "binaryOperation",
	"term": { "name": "o" },
	"qualifier": { "definition": "binaryOperationOn", "components": [{ "name": "S" }] },
	"properties": ["associative", "commutative"],
	"relatedObjects": [{ "definition": "identityElement", "value": { "name": "e" } }]
}"#;

pub fn definitions() -> DefinitionSet {
	DefinitionSet::from_json(DEFINITIONS).unwrap()
}

/// Выражение из текстовой формы.
pub fn expr(definitions: &DefinitionSet, serialized: &str) -> Expression {
	parse_serialized(serialized, definitions).unwrap()
}

pub fn json(definitions: &DefinitionSet, input: &str) -> Expression {
	parse_expression(input, definitions).unwrap()
}

pub fn function_assertion(definitions: &DefinitionSet) -> Expression {
	json(definitions, FUNCTION_ASSERTION)
}

pub fn binary_operation_assertion(definitions: &DefinitionSet) -> Expression {
	json(definitions, BINARY_OPERATION_ASSERTION)
}
