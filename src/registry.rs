//! Model lookup by short identifier.
//!
//! The built-in table maps `jm`, `go`, `s`, `gm`, `svr`, `hybrid` and `bp`
//! (plus long-form aliases) to default-configured models. Host applications add
//! their own models with [`ModelRegistry::register`].

use crate::bp_neural::BpNeuralNetworkModel;
use crate::errors::{ReliabilityError, ReliabilityResult};
use crate::goel_okumoto::GoelOkumotoModel;
use crate::grey_model::GreyModel;
use crate::hybrid::HybridModel;
use crate::jelinski_moranda::JelinskiMorandaModel;
use crate::reliability_model::ReliabilityModel;
use crate::s_shaped::SShapedModel;
use crate::svr::SupportVectorRegressionModel;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Builds a fresh model instance.
pub type ModelFactory = Arc<dyn Fn() -> Box<dyn ReliabilityModel> + Send + Sync>;

/// Identifier to factory table.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    factories: Vec<ModelFactory>,
    ids: BTreeMap<String, usize>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("ids", &self.ids.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelRegistry {
    /// Registry without any entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in model.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_aliases(&["jm", "jelinski-moranda"], || {
            Box::new(JelinskiMorandaModel::new())
        });
        registry.register_aliases(&["go", "goel-okumoto"], || {
            Box::new(GoelOkumotoModel::default())
        });
        registry.register_aliases(&["s", "s-shaped"], || Box::new(SShapedModel::default()));
        registry.register_aliases(&["gm"], || Box::new(GreyModel::default()));
        registry.register_aliases(&["svr"], || {
            Box::new(SupportVectorRegressionModel::default())
        });
        registry.register_aliases(&["hybrid"], || Box::new(HybridModel::default()));
        registry.register_aliases(&["bp"], || Box::new(BpNeuralNetworkModel::default()));
        registry
    }

    /// Add a model under `id` (case-insensitive), replacing any previous
    /// binding of that identifier.
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Box<dyn ReliabilityModel> + Send + Sync + 'static,
    {
        self.register_aliases(&[id], factory);
    }

    /// Add one model reachable under several identifiers.
    ///
    /// When the identifiers are exactly the ones bound to an existing entry,
    /// that entry's factory is replaced in place and keeps its position.
    /// Otherwise the model is appended and entries left without any
    /// identifier are dropped.
    pub fn register_aliases<F>(&mut self, ids: &[&str], factory: F)
    where
        F: Fn() -> Box<dyn ReliabilityModel> + Send + Sync + 'static,
    {
        let ids: Vec<String> = ids.iter().map(|id| id.to_lowercase()).collect();
        let factory: ModelFactory = Arc::new(factory);
        if let Some(slot) = self.sole_slot(&ids) {
            self.factories[slot] = factory;
            return;
        }

        let index = self.factories.len();
        self.factories.push(factory);
        for id in ids {
            self.ids.insert(id, index);
        }
        self.prune();
    }

    /// Slot bound to every identifier in `ids` and to nothing else.
    fn sole_slot(&self, ids: &[String]) -> Option<usize> {
        let slot = *self.ids.get(ids.first()?)?;
        let bound: Vec<&String> = self
            .ids
            .iter()
            .filter(|&(_, &index)| index == slot)
            .map(|(id, _)| id)
            .collect();
        let same_set = bound.len() == ids.iter().collect::<BTreeSet<_>>().len()
            && bound.iter().all(|id| ids.contains(*id));
        same_set.then_some(slot)
    }

    /// Drop factories no identifier points to and renumber the rest.
    fn prune(&mut self) {
        let mut remap = vec![None; self.factories.len()];
        let mut kept = Vec::with_capacity(self.factories.len());
        for (old, factory) in self.factories.drain(..).enumerate() {
            if self.ids.values().any(|&index| index == old) {
                remap[old] = Some(kept.len());
                kept.push(factory);
            }
        }
        self.factories = kept;
        for index in self.ids.values_mut() {
            if let Some(new) = remap[*index] {
                *index = new;
            }
        }
    }

    /// Build the model registered as `id`.
    ///
    /// # Errors
    /// `UnknownModel` when nothing is registered under `id`.
    pub fn create(&self, id: &str) -> ReliabilityResult<Box<dyn ReliabilityModel>> {
        self.ids
            .get(&id.to_lowercase())
            .map(|&index| (self.factories[index])())
            .ok_or_else(|| ReliabilityError::UnknownModel {
                name: id.to_string(),
            })
    }

    /// One instance of every distinct registered model, in registration order.
    ///
    /// A factory whose identifiers were all rebound to other models is omitted.
    pub fn create_all(&self) -> Vec<Box<dyn ReliabilityModel>> {
        let mut live: Vec<usize> = self.ids.values().copied().collect();
        live.sort_unstable();
        live.dedup();
        live.into_iter().map(|index| (self.factories[index])()).collect()
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }

    /// True when `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(&id.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_aliases() {
        let registry = ModelRegistry::with_builtins();
        assert_eq!(registry.create("jm").unwrap().name(), "Jelinski-Moranda");
        assert_eq!(
            registry.create("Jelinski-Moranda").unwrap().name(),
            "Jelinski-Moranda"
        );
        assert_eq!(registry.create("goel-okumoto").unwrap().name(), "Goel-Okumoto");
        assert_eq!(registry.create("s").unwrap().name(), "Yamada S-Shaped");
        assert_eq!(registry.create("gm").unwrap().name(), "GM(1,1)");
        assert_eq!(registry.create("svr").unwrap().name(), "SVR");
        assert_eq!(registry.create("hybrid").unwrap().name(), "EMD-SVR/GM Hybrid");
        assert_eq!(registry.create("bp").unwrap().name(), "BP Neural Network");
        assert_eq!(registry.ids().count(), 10);
    }

    #[test]
    fn test_unknown_identifier() {
        match ModelRegistry::with_builtins().create("weibull") {
            Err(ReliabilityError::UnknownModel { name }) => assert_eq!(name, "weibull"),
            other => panic!("expected UnknownModel, got {:?}", other.map(|m| m.name().to_string())),
        }
    }

    #[test]
    fn test_create_all_is_distinct() {
        let models = ModelRegistry::with_builtins().create_all();
        let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "Jelinski-Moranda");
        assert_eq!(names[6], "BP Neural Network");
    }

    #[test]
    fn test_custom_registration_overrides() {
        let mut registry = ModelRegistry::with_builtins();
        registry.register("gm", || Box::new(HybridModel::default()));
        assert_eq!(registry.create("gm").unwrap().name(), "EMD-SVR/GM Hybrid");
        assert_eq!(registry.create_all().len(), 7);
        assert_eq!(registry.factories.len(), 7);
        // replaced in place: still fourth in registration order
        assert_eq!(registry.create_all()[3].name(), "EMD-SVR/GM Hybrid");
    }

    #[test]
    fn test_repeated_registration_does_not_grow() {
        let mut registry = ModelRegistry::empty();
        for _ in 0..5 {
            registry.register("Custom", || Box::new(GreyModel::default()));
        }
        assert_eq!(registry.factories.len(), 1);
        assert_eq!(registry.create_all().len(), 1);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["custom"]);
    }

    #[test]
    fn test_partial_alias_rebinding_drops_orphans() {
        let mut registry = ModelRegistry::with_builtins();
        registry.register("jm", || Box::new(GreyModel::default()));
        // "jelinski-moranda" still reaches the original model
        assert_eq!(
            registry.create("jelinski-moranda").unwrap().name(),
            "Jelinski-Moranda"
        );
        assert_eq!(registry.create("jm").unwrap().name(), "GM(1,1)");
        assert_eq!(registry.factories.len(), 8);

        registry.register("jelinski-moranda", || Box::new(GreyModel::default()));
        assert!(registry.create_all().iter().all(|m| m.name() != "Jelinski-Moranda"));
        assert_eq!(registry.factories.len(), 8);
        assert_eq!(registry.create_all().len(), 8);
    }
}
