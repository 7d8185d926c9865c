mod common;

use common::*;
use proofview::binding::{count_capture_slots, match_template_in};
use proofview::expr::Scope;
use proofview::*;

fn captures(result: &[MatchResult]) -> Vec<String> {
	result.iter().map(|capture| capture.expression.serialize()).collect()
}

#[test]
fn captures_in_first_occurrence_order() {
	let definitions = definitions();
	let template = expr(&definitions, "∧ = b a < a c");
	let expression = expr(&definitions, "∧ = φ(x) ∀ y ∈ $0 A < ∀ y ∈ $0 A c");

	let result = match_template(&template, &expression).unwrap();
	assert_eq!(captures(&result), vec!["φ(x)", "∀ y ∈ $0 A", "c"]);
	assert_eq!(result[0].path, Path(vec![0, 0]));
	assert_eq!(result[1].path, Path(vec![0, 1]));
	assert_eq!(result[2].path, Path(vec![1, 1]));
	assert_eq!(count_capture_slots(&template), 3);
}

#[test]
fn repeated_slot_must_capture_the_same_expression() {
	let definitions = definitions();
	let template = expr(&definitions, "= a a");

	assert!(match_template(&template, &expr(&definitions, "= φ(x) φ(x)")).is_some());
	assert!(match_template(&template, &expr(&definitions, "= φ(x) φ(y)")).is_none());
}

#[test]
fn shape_mismatch_is_failure() {
	let definitions = definitions();

	assert!(match_template(&expr(&definitions, "= a b"), &expr(&definitions, "< x y")).is_none());
	assert!(match_template(&expr(&definitions, "φ(a)"), &expr(&definitions, "ψ(x)")).is_none());
	assert!(match_template(&expr(&definitions, "φ(a)"), &expr(&definitions, "φ(x, y)")).is_none());
	assert!(match_template(&expr(&definitions, "= a b"), &expr(&definitions, "x")).is_none());
	assert!(match_template(&expr(&definitions, "+#ℕ a b"), &expr(&definitions, "+#ℕ x y")).is_some());
}

#[test]
fn parameters_compare_relative_to_their_binders() {
	let definitions = definitions();
	let template = expr(&definitions, "∀ x = $0 a");

	let result = match_template(&template, &expr(&definitions, "∀ y = $0 b")).unwrap();
	assert_eq!(captures(&result), vec!["b"]);
	assert_eq!(result[0].bound_variable_names, vec![vec!["y".to_string()]]);
	assert_eq!(result[0].path, Path(vec![0, 1]));

	assert!(match_template(&template, &expr(&definitions, "∀ y = b $0")).is_none());

	// Параметр в слоте захвата попадает в результат вместе с именами своей области.
	let captured = match_template(&expr(&definitions, "∀ x = a b"), &expr(&definitions, "∀ y = $0 c")).unwrap();
	assert_eq!(captures(&captured), vec!["$0", "c"]);
	assert_eq!(captured[0].bound_variable_names, vec![vec!["y".to_string()]]);
}

#[test]
fn sides_keep_their_own_scopes() {
	let definitions = definitions();
	let names = vec!["z".to_string()];
	let root = Scope::Root;
	let outer = root.push(&names);

	// Выражение уже внутри области: `$$0` ссылается на внешний `z`.
	let template = expr(&definitions, "∀ x = $0 a");
	let expression = Expression::Defined {
		definition: definitions.definition("∀").unwrap().clone(),
		bound_names: vec!["y".to_string()],
		components: vec![Expression::Defined {
			definition: definitions.definition("=").unwrap().clone(),
			bound_names: vec![],
			components: vec![
				Expression::FunctionParameter { level: 0, index: 0 },
				Expression::FunctionParameter { level: 1, index: 0 },
			],
		}],
	};

	let result = match_template_in(&template, &expression, &Scope::Root, &outer).unwrap();
	assert_eq!(captures(&result), vec!["$$0"]);
	assert_eq!(result[0].bound_variable_names, vec![vec!["z".to_string()], vec!["y".to_string()]]);
}

#[test]
fn matching_is_deterministic() {
	let definitions = definitions();
	let template = expr(&definitions, "∧ = b a < a c");
	let expression = expr(&definitions, "∧ = d e < e f");

	assert_eq!(match_template(&template, &expression), match_template(&template, &expression));
}

#[test]
fn unrelated_siblings_do_not_affect_the_match() {
	let definitions = definitions();
	let template = expr(&definitions, "∧ = a b c");

	let first = match_template(&template, &expr(&definitions, "∧ = x y ∀ z < $0 w")).unwrap();
	let second = match_template(&template, &expr(&definitions, "∧ = x y q")).unwrap();
	assert_eq!(first[..2], second[..2]);
}

#[test]
fn type_assertions_match_as_their_flattened_form() {
	let definitions = definitions();
	let template = expr(&definitions, "∧ ∧ ∧ function g functionFrom g X Y injectiveFunction g surjectiveFunction g X Y");

	let result = match_template(&template, &function_assertion(&definitions)).unwrap();
	assert_eq!(captures(&result), vec!["f", "A", "B"]);
	assert_eq!(result[1].path, Path(vec![0, 0, 1, 1]));

	let reversed = match_template(&function_assertion(&definitions), &expr(&definitions, "∧ ∧ ∧ function h functionFrom h C D injectiveFunction h surjectiveFunction h C D"));
	assert_eq!(captures(&reversed.unwrap()), vec!["h", "C", "D"]);
}
