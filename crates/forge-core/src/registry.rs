//! Plugin registry and namespace routing
//!
//! Holds the registered solution and resource plugins and routes namespaced
//! requests: the first `/`-separated segment selects a plugin, the remaining
//! segments are opaque to the engine and forwarded verbatim.

use dashmap::DashMap;
use forge_api::{Capability, CoreError, ResourcePlugin, SolutionPlugin};
use std::sync::Arc;

/// Plugin selected by namespace routing
#[derive(Clone)]
pub enum RoutedPlugin {
    /// A top-level solution plugin
    Solution(Arc<dyn SolutionPlugin>),
    /// A resource plugin
    Resource(Arc<dyn ResourcePlugin>),
}

impl std::fmt::Debug for RoutedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solution(p) => f.debug_tuple("Solution").field(&p.name()).finish(),
            Self::Resource(p) => f.debug_tuple("Resource").field(&p.name()).finish(),
        }
    }
}

impl RoutedPlugin {
    /// Identifier of the routed plugin
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Solution(p) => p.name(),
            Self::Resource(p) => p.name(),
        }
    }

    /// Capability query on the routed plugin
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        match self {
            Self::Solution(p) => p.supports(capability),
            Self::Resource(p) => p.supports(capability),
        }
    }
}

/// Registry of named pluggable units
#[derive(Default)]
pub struct PluginRegistry {
    solutions: DashMap<String, Arc<dyn SolutionPlugin>>,
    resources: DashMap<String, Arc<dyn ResourcePlugin>>,
}

impl PluginRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a solution plugin (idempotent upsert)
    pub fn register_solution(&self, plugin: Arc<dyn SolutionPlugin>) {
        self.solutions.insert(plugin.name().to_string(), plugin);
    }

    /// Register a resource plugin (idempotent upsert)
    pub fn register_resource(&self, plugin: Arc<dyn ResourcePlugin>) {
        self.resources.insert(plugin.name().to_string(), plugin);
    }

    /// Look up a solution plugin by identifier
    #[must_use]
    pub fn solution(&self, name: &str) -> Option<Arc<dyn SolutionPlugin>> {
        self.solutions.get(name).map(|entry| Arc::clone(&entry))
    }

    /// Look up a resource plugin by identifier
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<Arc<dyn ResourcePlugin>> {
        self.resources.get(name).map(|entry| Arc::clone(&entry))
    }

    /// Identifiers of all registered solutions (unordered)
    #[must_use]
    pub fn solution_names(&self) -> Vec<String> {
        self.solutions.iter().map(|e| e.key().clone()).collect()
    }

    /// Route a namespaced request to a plugin
    ///
    /// Solutions shadow resources with the same identifier.
    pub fn route(&self, namespace: &str) -> Result<RoutedPlugin, CoreError> {
        let key = namespace
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::RouteNotFound {
                namespace: namespace.to_string(),
            })?;

        if let Some(solution) = self.solution(key) {
            return Ok(RoutedPlugin::Solution(solution));
        }
        if let Some(resource) = self.resource(key) {
            return Ok(RoutedPlugin::Resource(resource));
        }
        Err(CoreError::RouteNotFound {
            namespace: namespace.to_string(),
        })
    }

    /// Route a namespaced request and require an optional capability
    pub fn route_for_capability(
        &self,
        namespace: &str,
        capability: Capability,
    ) -> Result<RoutedPlugin, CoreError> {
        let plugin = self.route(namespace)?;
        if !plugin.supports(capability) {
            return Err(CoreError::CapabilityNotSupported {
                plugin: plugin.name().to_string(),
                capability: capability.as_str().to_string(),
            });
        }
        Ok(plugin)
    }
}
