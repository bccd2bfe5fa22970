use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::backend::Decoder;
use super::backends::{RqrrDecoder, StubDecoder};

/// Registry of named decoder backends.
///
/// Decoders are stateless, so backends are shared as `Arc<dyn Decoder>` with no
/// locking.
pub struct DecoderRegistry {
    backends: HashMap<String, Arc<dyn Decoder>>,
    default_name: Option<String>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry holding every built-in backend, `rqrr` as default.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RqrrDecoder::new());
        registry.register(StubDecoder::new());
        registry
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<D: Decoder + 'static>(&mut self, decoder: D) {
        let name = decoder.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(decoder));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("decoder '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Decoder>> {
        self.backends.get(name).cloned()
    }

    /// Look a backend up by name, failing with the list of known names.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Decoder>> {
        self.get(name).ok_or_else(|| {
            let mut known = self.list();
            known.sort();
            anyhow!(
                "unknown decoder '{}' (available: {})",
                name,
                known.join(", ")
            )
        })
    }

    pub fn default_decoder(&self) -> Option<Arc<dyn Decoder>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_backend_is_default() {
        let registry = DecoderRegistry::with_builtin();
        let default = registry.default_decoder().expect("default decoder");
        assert_eq!(default.name(), "rqrr");
    }

    #[test]
    fn set_default_rejects_unknown_names() -> Result<()> {
        let mut registry = DecoderRegistry::with_builtin();
        registry.set_default("stub")?;
        assert_eq!(registry.default_decoder().map(|d| d.name()), Some("stub"));
        assert!(registry.set_default("zxing").is_err());
        assert!(registry.require("zxing").is_err());
        Ok(())
    }
}
