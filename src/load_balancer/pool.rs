//! Backend pool management.
//!
//! # Responsibilities
//! - Manage collections of backends grouped by name
//! - Resolve a group name (the call key) to a candidate per attempt
//! - Expose backends for statistics reporting

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::context::CallContext;
use crate::load_balancer::{
    backend::{parse_base_url, Backend, UpstreamBackend},
    round_robin::RoundRobin,
    BackendResolver,
};

/// Static backend groups from configuration.
#[derive(Debug, Default)]
pub struct BackendManager {
    /// Map of group name -> (Backends, selector).
    groups: HashMap<String, (Vec<Arc<UpstreamBackend>>, RoundRobin)>,
}

impl BackendManager {
    /// Create a new backend manager from configuration.
    pub fn new(configs: &[BackendConfig]) -> Self {
        let mut groups: HashMap<String, (Vec<Arc<UpstreamBackend>>, RoundRobin)> = HashMap::new();

        for config in configs {
            match parse_base_url(&config.address) {
                Ok(url) => {
                    let backend = Arc::new(UpstreamBackend::new(config.name.clone(), url));
                    groups
                        .entry(config.group.clone())
                        .or_default()
                        .0
                        .push(backend);
                }
                Err(reason) => {
                    tracing::warn!(backend = %config.name, %reason, "Skipping invalid backend address");
                }
            }
        }

        Self { groups }
    }

    /// Select a backend of the given group for an attempt index.
    pub fn get(&self, group_name: &str, attempt: usize) -> Option<Arc<UpstreamBackend>> {
        let Some((backends, selector)) = self.groups.get(group_name) else {
            tracing::debug!(group = %group_name, "Group not found in BackendManager");
            return None;
        };
        let selected = selector.next_server(backends, attempt);
        if selected.is_none() {
            tracing::debug!(
                group = %group_name,
                attempt,
                backend_count = backends.len(),
                "No candidate left in group"
            );
        }
        selected
    }

    /// Backends of one group, in configuration order.
    pub fn group(&self, group_name: &str) -> Option<&[Arc<UpstreamBackend>]> {
        self.groups.get(group_name).map(|(backends, _)| backends.as_slice())
    }

    /// Return a list of all backends (for statistics reporting).
    pub fn all_backends(&self) -> Vec<Arc<UpstreamBackend>> {
        self.groups
            .values()
            .flat_map(|(backends, _)| backends.iter())
            .cloned()
            .collect()
    }
}

impl BackendResolver for BackendManager {
    fn resolve(&self, key: &str, _ctx: &CallContext, attempt: usize) -> Option<Arc<dyn Backend>> {
        self.get(key, attempt).map(|backend| backend as Arc<dyn Backend>)
    }
}
