use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    pub fn new(name: &str, provider: &str, capabilities: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            provider: provider.to_string(),
            capabilities: capabilities.iter().map(|item| item.to_string()).collect(),
        }
    }

    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

/// Built-in models. Order matters: the first entry supporting a capability is its default.
const DEFAULT_MODELS: &[(&str, &str, &[&str])] = &[
    ("gemini-2.5-flash", "gemini", &["text", "vision", "thinking"]),
    ("gemini-2.5-pro", "gemini", &["text", "vision", "thinking"]),
    ("gemini-3-pro-preview", "gemini", &["text", "vision", "thinking"]),
    ("gemini-2.0-flash", "gemini", &["text", "vision"]),
    ("dryrun-text-1", "dryrun", &["text", "vision"]),
];

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(|| {
                DEFAULT_MODELS
                    .iter()
                    .map(|(name, provider, capabilities)| {
                        (name.to_string(), ModelSpec::new(name, provider, capabilities))
                    })
                    .collect()
            }),
        }
    }

    /// Registry holding exactly `specs`, in order.
    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self::new(Some(
            specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        ))
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn default_for(&self, capability: &str) -> Option<&ModelSpec> {
        self.models.values().find(|model| model.supports(capability))
    }
}
