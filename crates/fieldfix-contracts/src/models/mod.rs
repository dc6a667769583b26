mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec};
pub use selectors::{capability_for, ModelSelection, ModelSelector};
