use crate::request::RequestDescriptor;
use serde_json::Value;
use skelerest_core::{Context, Error, Result};
use std::collections::HashMap;

/// Declared requests keyed by command id, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<(String, RequestDescriptor)>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build a descriptor for every request config, in order.
    pub async fn load(ctx: &Context, configs: &[Value]) -> Result<Self> {
        let mut descriptors = Vec::with_capacity(configs.len());
        for config in configs {
            descriptors.push(RequestDescriptor::build(ctx, config).await?);
        }

        Self::from_descriptors(descriptors)
    }

    /// Index already built descriptors.
    ///
    /// Two descriptors sharing a command id are rejected.
    pub fn from_descriptors(descriptors: Vec<RequestDescriptor>) -> Result<Self> {
        let mut registry = Self::default();

        for desc in descriptors {
            let id = desc.command_id();
            if registry.index.contains_key(&id) {
                return Err(Error::config_invalid(format!(
                    "command {id} is declared more than once"
                )));
            }

            registry.index.insert(id.clone(), registry.entries.len());
            registry.entries.push((id, desc));
        }

        Ok(registry)
    }

    /// Look up the descriptor registered as `command_id`.
    pub fn get(&self, command_id: &str) -> Result<&RequestDescriptor> {
        self.index
            .get(command_id)
            .map(|&idx| &self.entries[idx].1)
            .ok_or_else(|| Error::not_found(format!("no request registered as {command_id}")))
    }

    /// Command ids in declaration order.
    pub fn command_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Iterate over `(command_id, descriptor)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestDescriptor)> {
        self.entries.iter().map(|(id, desc)| (id.as_str(), desc))
    }

    /// Number of registered requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no request is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
