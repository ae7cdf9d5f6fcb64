use std::collections::BTreeMap;

use instinct_core::Species;

use crate::{
    BaboonModule, BlobModule, CoilheadModule, FlowermanModule, GenericModule, HoarderModule,
    InstinctWorld, MouthDogModule, SandSpiderModule, SandWormModule, SpeciesModule, ThumperModule,
};

/// Tree factory table keyed by species tag.
///
/// Species without a registered module get the generic instincts.
pub struct SpeciesRegistry<W>
where
    W: InstinctWorld + 'static,
{
    generic: Box<dyn SpeciesModule<W>>,
    modules: BTreeMap<Species, Box<dyn SpeciesModule<W>>>,
}

impl<W> Default for SpeciesRegistry<W>
where
    W: InstinctWorld + 'static,
{
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl<W> SpeciesRegistry<W>
where
    W: InstinctWorld + 'static,
{
    /// Only the generic fallback.
    pub fn new() -> Self {
        Self {
            generic: Box::new(GenericModule),
            modules: BTreeMap::new(),
        }
    }

    /// Every module shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SandWormModule));
        registry.register(Box::new(ThumperModule));
        registry.register(Box::new(MouthDogModule));
        registry.register(Box::new(CoilheadModule));
        registry.register(Box::new(BaboonModule));
        registry.register(Box::new(BlobModule));
        registry.register(Box::new(FlowermanModule));
        registry.register(Box::new(HoarderModule));
        registry.register(Box::new(SandSpiderModule));
        registry
    }

    /// Register `module` for its species, replacing any previous one.
    pub fn register(&mut self, module: Box<dyn SpeciesModule<W>>) {
        if module.species() == Species::Generic {
            self.generic = module;
        } else {
            self.modules.insert(module.species(), module);
        }
    }

    pub fn contains(&self, species: Species) -> bool {
        species == Species::Generic || self.modules.contains_key(&species)
    }

    pub fn module(&self, species: Species) -> &dyn SpeciesModule<W> {
        self.modules
            .get(&species)
            .unwrap_or(&self.generic)
            .as_ref()
    }
}
