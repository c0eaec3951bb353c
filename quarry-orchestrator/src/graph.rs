//! Pipeline graph
//!
//! A flat, immutable name → stage table built from a definition. Routing
//! between stages lives in each stage's `handle` mapping and is resolved by
//! stage execution, so no traversal or cycle detection happens here.

use indexmap::IndexMap;
use quarry_core::domain::pipeline::StageDescriptor;

/// A named node of a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub descriptor: StageDescriptor,
}

impl Stage {
    /// Stage names this stage routes its output to, in declaration order
    pub fn successors(&self) -> impl Iterator<Item = &str> {
        self.descriptor.handle.values().map(String::as_str)
    }
}

/// Stages of a pipeline keyed by name, in definition order
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    stages: IndexMap<String, Stage>,
}

impl PipelineGraph {
    /// Builds the graph
    ///
    /// Never fails: whether the entry stage exists is checked when a run is
    /// attempted.
    pub fn new(stages: IndexMap<String, StageDescriptor>) -> Self {
        let stages = stages
            .into_iter()
            .map(|(name, descriptor)| {
                let stage = Stage {
                    name: name.clone(),
                    descriptor,
                };
                (name, stage)
            })
            .collect();
        Self { stages }
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// `(stage, target)` pairs whose route target is not a stage of this graph
    pub fn dangling_routes(&self) -> Vec<(&str, &str)> {
        self.iter()
            .flat_map(|stage| {
                stage
                    .successors()
                    .filter(|target| !self.contains(target))
                    .map(move |target| (stage.name.as_str(), target))
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a PipelineGraph {
    type Item = &'a Stage;
    type IntoIter = indexmap::map::Values<'a, String, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.values()
    }
}
