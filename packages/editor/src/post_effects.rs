//! # Post-Effect System
//!
//! Mutations trigger cascading effects to maintain document integrity.
//!
//! ## Design
//!
//! When a mutation is applied, it may require additional changes to keep the
//! document consistent. Selecting an annotation, for instance, must
//! deselect every other one so that at most one is selected at a time.
//!
//! Post-effects inspect the mutation together with the document *after* it
//! was applied and return secondary mutations. They never run for a
//! mutation that did not change anything.

use crate::document::Document;
use crate::mutations::{Edit, Mutation, MutationError, MutationOutcome};
use crate::path::Path;
use crate::value::Value;

/// Post-effect that can be triggered by a mutation
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    /// Analyze the mutation and generate secondary mutations if needed
    fn analyze(&self, mutation: &Mutation, doc: &Document) -> Vec<Mutation>;
}

/// Keep exactly one annotation selected once any is selected
#[derive(Debug)]
pub struct SingleSelection;

impl SingleSelection {
    /// Index of the annotation this mutation just selected, if any
    fn selected_by(mutation: &Mutation, doc: &Document) -> Option<usize> {
        let segments = mutation.path.segments();
        let index = match segments {
            [collection, index, key] if collection == "annotations" && key == "isSelected" => index,
            [collection, index] if collection == "annotations" => index,
            _ => return None,
        };
        if !matches!(mutation.edit, Edit::Set(_) | Edit::Input(_)) {
            return None;
        }

        let index: usize = index.parse().ok()?;
        let annotation = doc.annotations().get(index)?;
        (annotation.get("isSelected") == Some(&Value::Bool(true))).then_some(index)
    }
}

impl PostEffect for SingleSelection {
    fn analyze(&self, mutation: &Mutation, doc: &Document) -> Vec<Mutation> {
        let Some(selected) = Self::selected_by(mutation, doc) else {
            return vec![];
        };

        deselection_targets(doc.root(), selected)
            .into_iter()
            .map(|i| Mutation::new(Path::annotation(i, &["isSelected"]), Edit::Set(Value::Bool(false))))
            .collect()
    }
}

/// Annotation mappings other than `keep` whose `isSelected` is not already `false`
fn deselection_targets(root: &Value, keep: usize) -> Vec<usize> {
    root.get("annotations")
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter(|(i, a)| *i != keep && a.as_map().is_some() && a.get("isSelected") != Some(&Value::Bool(false)))
                .map(|(i, _)| i)
                .collect()
        })
        .unwrap_or_default()
}

/// Force every annotation except `just_selected` to `isSelected = false`.
///
/// Returns how many annotations were changed.
pub fn enforce_single_selection(doc: &mut Document, just_selected: usize) -> usize {
    let targets = deselection_targets(doc.root(), just_selected);
    let Some(Value::List(items)) = doc.root_mut().as_map_mut().and_then(|m| m.get_mut("annotations")) else {
        return 0;
    };

    for &i in &targets {
        if let Some(Value::Map(annotation)) = items.get_mut(i) {
            annotation.insert("isSelected".to_string(), Value::Bool(false));
        }
    }
    targets.len()
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(SingleSelection)],
        }
    }

    /// Engine that runs no effects
    pub fn empty() -> Self {
        Self { effects: Vec::new() }
    }

    pub fn register(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.push(effect);
    }

    /// Analyze a mutation and generate all secondary mutations
    pub fn analyze(&self, mutation: &Mutation, doc: &Document) -> Vec<Mutation> {
        let mut secondary_mutations = Vec::new();

        for effect in &self.effects {
            let mut effect_mutations = effect.analyze(mutation, doc);
            secondary_mutations.append(&mut effect_mutations);
        }

        secondary_mutations
    }

    /// Apply a mutation with all its post-effects.
    ///
    /// Returns the mutations that actually changed the document, primary
    /// first. An empty list means the primary mutation was a no-op. The
    /// document is only updated when the primary mutation and every
    /// secondary one succeed.
    pub fn apply_with_effects(
        &self,
        mutation: Mutation,
        doc: &mut Document,
    ) -> Result<Vec<Mutation>, MutationError> {
        let mut staged = doc.clone();
        if let MutationOutcome::Unchanged = staged.apply(&mutation)? {
            return Ok(vec![]);
        }

        let secondary = self.analyze(&mutation, &staged);
        let mut applied_mutations = vec![mutation];
        for secondary_mutation in secondary {
            if staged.apply(&secondary_mutation)?.is_changed() {
                applied_mutations.push(secondary_mutation);
            }
        }

        *doc = staged;
        Ok(applied_mutations)
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotation;

    fn doc_with(count: usize) -> Document {
        let annotations: Vec<Value> = (0..count).map(|i| Annotation::new(i as i64).to_value()).collect();
        let mut doc = Document::default();
        Mutation::set("$.annotations", annotations)
            .unwrap()
            .apply(doc.root_mut())
            .unwrap();
        doc
    }

    #[test]
    fn test_post_effect_engine_creation() {
        let engine = PostEffectEngine::new();
        assert_eq!(engine.effects.len(), 1);
    }

    #[test]
    fn test_selecting_deselects_others() {
        let mut doc = doc_with(3);
        let engine = PostEffectEngine::new();

        engine
            .apply_with_effects(Mutation::set("$.annotations.0.isSelected", true).unwrap(), &mut doc)
            .unwrap();
        let applied = engine
            .apply_with_effects(Mutation::set("$.annotations.2.isSelected", true).unwrap(), &mut doc)
            .unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1].path.to_string(), "$.annotations.0.isSelected");
        assert_eq!(doc.selected_indices(), vec![2]);
    }

    #[test]
    fn test_deselection_has_no_effects() {
        let mut doc = doc_with(2);
        let engine = PostEffectEngine::new();
        engine
            .apply_with_effects(Mutation::set("$.annotations.1.isSelected", true).unwrap(), &mut doc)
            .unwrap();

        let applied = engine
            .apply_with_effects(Mutation::set("$.annotations.1.isSelected", false).unwrap(), &mut doc)
            .unwrap();
        assert_eq!(applied.len(), 1);
        assert!(doc.selected_indices().is_empty());
    }

    #[test]
    fn test_text_input_true_selects() {
        let mut doc = doc_with(2);
        let engine = PostEffectEngine::new();
        engine
            .apply_with_effects(Mutation::set("$.annotations.0.isSelected", true).unwrap(), &mut doc)
            .unwrap();
        engine
            .apply_with_effects(Mutation::input("$.annotations.1.isSelected", "true").unwrap(), &mut doc)
            .unwrap();
        assert_eq!(doc.selected_indices(), vec![1]);
    }

    #[test]
    fn test_whole_annotation_write_triggers() {
        let mut doc = doc_with(1);
        let engine = PostEffectEngine::new();
        engine
            .apply_with_effects(Mutation::set("$.annotations.0.isSelected", true).unwrap(), &mut doc)
            .unwrap();

        let mut added = Annotation::new(1);
        added.is_selected = true;
        engine
            .apply_with_effects(Mutation::set("$.annotations.1", added.to_value()).unwrap(), &mut doc)
            .unwrap();

        assert_eq!(doc.selected_indices(), vec![1]);
    }

    #[test]
    fn test_noop_skips_effects() {
        let mut doc = doc_with(2);
        let engine = PostEffectEngine::new();
        let applied = engine
            .apply_with_effects(Mutation::set("$.annotations.0.hidden", false).unwrap(), &mut doc)
            .unwrap();
        assert!(applied.is_empty());
    }

    #[test]
    fn test_non_mapping_annotations_are_skipped() {
        let mut doc =
            Document::from_json(r#"{"annotations": [{"id": 0, "isSelected": false}, [], {"id": 2, "isSelected": true}]}"#)
                .unwrap();
        let engine = PostEffectEngine::new();

        let applied = engine
            .apply_with_effects(Mutation::set("$.annotations.0.isSelected", true).unwrap(), &mut doc)
            .unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(doc.selected_indices(), vec![0]);
        assert_eq!(doc.get("$.annotations.1").unwrap(), Some(&Value::list()));
    }

    #[derive(Debug)]
    struct WritesThroughName;

    impl PostEffect for WritesThroughName {
        fn analyze(&self, _mutation: &Mutation, _doc: &Document) -> Vec<Mutation> {
            vec![Mutation::set("$.name.first", 1i64).unwrap()]
        }
    }

    #[test]
    fn test_failed_secondary_leaves_document_untouched() {
        let mut doc = doc_with(2);
        let before = doc.clone();
        let mut engine = PostEffectEngine::empty();
        engine.register(Box::new(WritesThroughName));

        let result = engine.apply_with_effects(Mutation::set("$.annotations.0.hidden", true).unwrap(), &mut doc);

        assert!(result.is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_enforce_single_selection_directly() {
        let mut doc = Document::from_json(
            r#"{"annotations": [{"isSelected": true}, {"isSelected": true}, {"isSelected": false}, {}]}"#,
        )
        .unwrap();

        let changed = enforce_single_selection(&mut doc, 1);
        assert_eq!(changed, 2);
        assert_eq!(doc.selected_indices(), vec![1]);
        assert_eq!(doc.get("$.annotations.3.isSelected").unwrap(), Some(&Value::Bool(false)));
    }
}
