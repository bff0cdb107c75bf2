//! Dialect plugins and the registry that resolves them.

mod descriptor;
mod registry;

pub use descriptor::PluginDescriptor;
pub use registry::PluginRegistry;
