//! Property tests for substitution and step edits.

use proptest::prelude::*;
use rest_flow::flow::{apply_edits, FlowStep, StepEdits};
use rest_flow::variables::{substitute_variables, VariableContext, VariableStore};
use std::collections::BTreeSet;

fn steps(n: usize) -> Vec<FlowStep> {
    (0..n).map(|i| FlowStep::new(format!("s{}", i))).collect()
}

fn sorted_names(steps: &[FlowStep]) -> Vec<String> {
    let mut names: Vec<String> = steps.iter().map(|s| s.template.clone()).collect();
    names.sort();
    names
}

proptest! {
    #[test]
    fn text_without_prefix_is_unchanged(text in "[^$]{0,64}") {
        let store = VariableStore::new();
        let context = VariableContext::new(&store);
        prop_assert_eq!(substitute_variables(&text, &context).unwrap(), text);
    }

    #[test]
    fn escaped_placeholder_loses_one_prefix(name in "[A-Za-z0-9_-]{1,12}") {
        let store = VariableStore::new();
        let context = VariableContext::new(&store);
        let escaped = format!("$${{{}}}", name);
        prop_assert_eq!(
            substitute_variables(&escaped, &context).unwrap(),
            format!("${{{}}}", name)
        );
    }

    #[test]
    fn defined_variable_is_substituted(
        name in "[A-Za-z][A-Za-z0-9_]{0,8}",
        value in "[^$]{0,16}",
    ) {
        let mut store = VariableStore::new();
        store.set(&name, value.clone());
        let context = VariableContext::new(&store);
        let text = format!("<${{{}}}>", name.to_lowercase());
        prop_assert_eq!(substitute_variables(&text, &context).unwrap(), format!("<{}>", value));
    }

    #[test]
    fn edits_change_length_by_inserts_minus_deletes(
        n in 1usize..12,
        removals in prop::collection::vec(1usize..12, 0..6),
        inserts in prop::collection::vec(prop::option::of(0usize..15), 0..4),
    ) {
        let removals: Vec<usize> = removals.into_iter().filter(|&r| r <= n).collect();
        let unique: BTreeSet<usize> = removals.iter().copied().collect();
        prop_assume!(unique.len() < n || !inserts.is_empty());

        let edits = StepEdits {
            removals,
            insertions: inserts
                .iter()
                .map(|slot| (*slot, "new".to_string()))
                .collect(),
            moves: vec![],
        };
        let result = apply_edits(&steps(n), &edits, |_| true).unwrap();
        prop_assert_eq!(result.len(), n - unique.len() + inserts.len());
    }

    #[test]
    fn moves_keep_every_step(
        n in 1usize..10,
        moves in prop::collection::vec((0usize..10, 0usize..20), 0..6),
    ) {
        let moves: Vec<(usize, usize)> = moves.into_iter().filter(|&(from, _)| from < n).collect();
        let original = steps(n);
        let edits = StepEdits { moves, ..Default::default() };

        let result = apply_edits(&original, &edits, |_| true).unwrap();
        prop_assert_eq!(sorted_names(&result), sorted_names(&original));
    }
}
