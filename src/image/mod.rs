//! Image type definitions and the dependency chain between them.
//!
//! Each image type names at most one parent; a child Dockerfile starts
//! `FROM <parent tag>` and adds only its own layer. The set walks parents
//! before children so every base image is generated before its dependents.

mod naming;

pub use naming::{
    target_suffix, ImageNaming, DEFAULT_CUDA_VERSION, DEFAULT_CUDNN_VERSION, DEFAULT_REPOSITORY,
};

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Static description of one image type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTypeSpec {
    pub name: String,
    /// Image type this one builds on; `None` for root images.
    pub parent: Option<String>,
    /// Whether one image is generated per runtime release.
    pub runtime_specific: bool,
    /// Whether the chain is rooted at the CUDA base image.
    pub gpu: bool,
    pub description: String,
}

impl ImageTypeSpec {
    pub fn root(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            runtime_specific: false,
            gpu: false,
            description: description.into(),
        }
    }

    pub fn child(
        name: impl Into<String>,
        parent: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::root(name, description)
        }
    }

    pub fn with_runtime_specific(mut self, runtime_specific: bool) -> Self {
        self.runtime_specific = runtime_specific;
        self
    }

    pub fn with_gpu(mut self, gpu: bool) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Validated set of image types kept in parent-before-child order.
#[derive(Debug, Clone)]
pub struct ImageTypeSet {
    types: Vec<ImageTypeSpec>,
}

impl ImageTypeSet {
    /// Validates parent references and orders types so parents come first.
    ///
    /// Declaration order is kept wherever the parent constraint allows it.
    pub fn new(specs: Vec<ImageTypeSpec>) -> Result<Self, ResolveError> {
        let by_name: BTreeMap<&str, &ImageTypeSpec> =
            specs.iter().map(|s| (s.name.as_str(), s)).collect();

        for spec in &specs {
            if let Some(parent) = &spec.parent {
                if !by_name.contains_key(parent.as_str()) {
                    return Err(ResolveError::UnknownParent {
                        name: spec.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let mut placed: HashSet<String> = HashSet::new();
        let mut ordered = Vec::with_capacity(specs.len());
        let mut remaining: Vec<&ImageTypeSpec> = specs.iter().collect();

        while !remaining.is_empty() {
            let before = remaining.len();
            let mut pending = Vec::new();
            for spec in remaining {
                let ready = spec
                    .parent
                    .as_ref()
                    .map_or(true, |parent| placed.contains(parent));
                if ready {
                    placed.insert(spec.name.clone());
                    ordered.push(spec.clone());
                } else {
                    pending.push(spec);
                }
            }
            if pending.len() == before {
                return Err(ResolveError::CyclicChain(pending[0].name.clone()));
            }
            remaining = pending;
        }

        Ok(Self { types: ordered })
    }

    /// The CPU chain (minimal → standard → python) and its GPU counterpart.
    pub fn builtin() -> Self {
        Self {
            types: vec![
                ImageTypeSpec::root("gpu", "CUDA runtime base with Java and R")
                    .with_gpu(true),
                ImageTypeSpec::root("minimal", "Ubuntu base with Java and core tooling"),
                ImageTypeSpec::child("minimal-gpu", "gpu", "Minimal image on the CUDA base")
                    .with_gpu(true),
                ImageTypeSpec::child("standard", "minimal", "Minimal plus FUSE and OpenSSH"),
                ImageTypeSpec::child("standard-gpu", "minimal-gpu", "Standard image on the CUDA base")
                    .with_gpu(true),
                ImageTypeSpec::child("python", "standard", "Runtime-specific Python environment")
                    .with_runtime_specific(true),
                ImageTypeSpec::child("python-gpu", "standard-gpu", "Runtime-specific Python environment on the CUDA base")
                    .with_runtime_specific(true)
                    .with_gpu(true),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&ImageTypeSpec> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Looks up an image type, failing with `ImageTypeNotFound`.
    pub fn require(&self, name: &str) -> Result<&ImageTypeSpec, ResolveError> {
        self.get(name)
            .ok_or_else(|| ResolveError::ImageTypeNotFound(name.to_string()))
    }

    /// Image types in parent-before-child order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageTypeSpec> {
        self.types.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn parent_of(&self, spec: &ImageTypeSpec) -> Option<&ImageTypeSpec> {
        spec.parent.as_deref().and_then(|p| self.get(p))
    }

    /// The chain ending at `name`, root first.
    pub fn chain(&self, name: &str) -> Result<Vec<&ImageTypeSpec>, ResolveError> {
        let mut chain = vec![self.require(name)?];
        while let Some(parent) = self.parent_of(chain[chain.len() - 1]) {
            if chain.len() > self.types.len() {
                return Err(ResolveError::CyclicChain(name.to_string()));
            }
            chain.push(parent);
        }
        chain.reverse();
        Ok(chain)
    }
}

impl Default for ImageTypeSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_is_parent_first() {
        let set = ImageTypeSet::builtin();
        let rebuilt = ImageTypeSet::new(set.iter().cloned().collect()).expect("builtin is valid");
        assert_eq!(rebuilt.names(), set.names());

        let names = set.names();
        for spec in set.iter() {
            if let Some(parent) = &spec.parent {
                let child_pos = names.iter().position(|n| *n == spec.name);
                let parent_pos = names.iter().position(|n| *n == parent.as_str());
                assert!(parent_pos < child_pos, "{parent} must precede {}", spec.name);
            }
        }
    }

    #[test]
    fn test_chain_walk() {
        let set = ImageTypeSet::builtin();
        let chain: Vec<&str> = set
            .chain("python-gpu")
            .expect("python-gpu exists")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(chain, vec!["gpu", "minimal-gpu", "standard-gpu", "python-gpu"]);

        let chain = set.chain("minimal").expect("minimal exists");
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_unknown_type() {
        let set = ImageTypeSet::builtin();
        let err = set.require("scala").unwrap_err();
        assert!(matches!(err, ResolveError::ImageTypeNotFound(n) if n == "scala"));
    }

    #[test]
    fn test_new_reorders_children_after_parents() {
        let set = ImageTypeSet::new(vec![
            ImageTypeSpec::child("python", "standard", ""),
            ImageTypeSpec::child("standard", "minimal", ""),
            ImageTypeSpec::root("minimal", ""),
        ])
        .expect("valid set");
        assert_eq!(set.names(), vec!["minimal", "standard", "python"]);
    }

    #[test]
    fn test_new_rejects_unknown_parent_and_cycles() {
        let err = ImageTypeSet::new(vec![ImageTypeSpec::child("python", "standard", "")])
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownParent { .. }));

        let err = ImageTypeSet::new(vec![
            ImageTypeSpec::child("a", "b", ""),
            ImageTypeSpec::child("b", "a", ""),
        ])
        .unwrap_err();
        assert!(matches!(err, ResolveError::CyclicChain(_)));
    }
}
