use super::registry::{ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    /// Set when an explicitly requested model could not be used.
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

/// Capability a solve call needs: `vision` when an image rides along, `text` otherwise.
pub fn capability_for(has_image: bool) -> &'static str {
    if has_image {
        "vision"
    } else {
        "text"
    }
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    /// Picks `requested` when it is registered and has `capability`, else the registry default.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        let found = requested.and_then(|name| self.registry.get(name));
        if let Some(model) = found.filter(|model| model.supports(capability)) {
            return Ok(ModelSelection {
                model: model.clone(),
                fallback_reason: None,
            });
        }

        let Some(default) = self.registry.default_for(capability) else {
            return Err(format!("No models available for capability '{capability}'."));
        };
        let fallback_reason = requested.map(|name| match found {
            Some(_) => format!(
                "Model '{name}' does not support '{capability}'; using {}.",
                default.name
            ),
            None => format!("Model '{name}' is not registered; using {}.", default.name),
        });
        Ok(ModelSelection {
            model: default.clone(),
            fallback_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{capability_for, ModelSelector};
    use crate::models::{ModelRegistry, ModelSpec};

    #[test]
    fn image_requests_need_vision() {
        assert_eq!(capability_for(true), "vision");
        assert_eq!(capability_for(false), "text");
    }

    #[test]
    fn requested_model_is_used_when_it_supports_the_capability() {
        let selection = ModelSelector::new(None)
            .select(Some("gemini-2.5-pro"), "vision")
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-pro");
        assert_eq!(selection.model.provider, "gemini");
        assert!(selection.fallback_reason.is_none());
    }

    #[test]
    fn falls_back_when_requested_model_lacks_vision() {
        let registry = ModelRegistry::from_specs([
            ModelSpec::new("text-only", "dryrun", &["text"]),
            ModelSpec::new("seeing", "dryrun", &["text", "vision"]),
        ]);
        let selection = ModelSelector::new(Some(registry))
            .select(Some("text-only"), "vision")
            .unwrap();
        assert_eq!(selection.model.name, "seeing");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Model 'text-only' does not support 'vision'; using seeing.")
        );
    }

    #[test]
    fn unknown_model_falls_back_with_a_reason() {
        let selection = ModelSelector::new(None)
            .select(Some("no-such-model"), "text")
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-flash");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Model 'no-such-model' is not registered; using gemini-2.5-flash.")
        );
    }

    #[test]
    fn no_request_uses_the_default_silently() {
        for requested in [None, Some("  ")] {
            let selection = ModelSelector::new(None).select(requested, "text").unwrap();
            assert_eq!(selection.model.name, "gemini-2.5-flash");
            assert!(selection.fallback_reason.is_none());
        }
    }

    #[test]
    fn errors_when_no_model_has_the_capability() {
        let registry = ModelRegistry::from_specs([ModelSpec::new("text-only", "dryrun", &["text"])]);
        let err = ModelSelector::new(Some(registry))
            .select(None, "vision")
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'vision'.");
    }
}
