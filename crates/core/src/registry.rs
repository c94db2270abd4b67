//! Catalogue of selectable models, grouped by category.
//!
//! Capability flags are derived from the backend id once, when an entry is
//! built, so nothing downstream inspects model names again.

use std::collections::HashSet;

use thiserror::Error;

pub const DEFAULT_CATEGORY: &str = "🔮 Mistral Models";
pub const DEFAULT_MODEL: &str = "Mistral Mixtral-8x7B";

const BUILTIN: &[(&str, &str, &str)] = &[
    ("🦙 Llama 3 Models", "Llama 3.1 (70B)", "meta-llama/Llama-3.1-70B-Instruct"),
    ("🦙 Llama 3 Models", "Llama 3.2 (70B)", "meta-llama/Llama-3.2-70B-Instruct"),
    ("🦙 Llama 3 Models", "Llama 3.3 (70B)", "meta-llama/Llama-3.3-70B-Instruct"),
    ("🦙 Llama 2 Models", "Llama 2 (7B)", "meta-llama/Llama-2-7b-chat-hf"),
    ("🦙 Llama 2 Models", "Llama 2 (13B)", "meta-llama/Llama-2-13b-chat-hf"),
    ("🦙 Llama 2 Models", "Llama 2 (70B)", "meta-llama/Llama-2-70b-chat-hf"),
    ("🔮 Mistral Models", "Mistral 7B", "mistralai/Mistral-7B-Instruct-v0.1"),
    ("🔮 Mistral Models", "Mistral Mixtral-8x7B", "mistralai/Mixtral-8x7B-Instruct-v0.1"),
    ("🔮 Mistral Models", "Mistral 13B", "mistralai/Mistral-13B-Instruct-v0.1"),
    ("🤖 GPT Models", "GPT-2", "gpt2"),
    ("🤖 GPT Models", "GPT-Neo", "EleutherAI/gpt-neo-1.3B"),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Consumes a multi-turn transcript with an `Assistant:` cue.
    pub dialogue: bool,
    /// Small completion model: lower length ceiling and forced token cap.
    pub lightweight: bool,
    /// Access must be requested from the model owner first.
    pub gated: bool,
}

impl Capabilities {
    pub fn infer(backend_id: &str) -> Self {
        let id = backend_id.to_lowercase();
        Self {
            dialogue: id.contains("llama") || id.contains("mistral"),
            lightweight: id.contains("gpt"),
            gated: id.starts_with("meta-llama/"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelEntry {
    pub label: String,
    pub backend_id: String,
    pub category: String,
    pub caps: Capabilities,
}

impl ModelEntry {
    pub fn new<L, B, C>(label: L, backend_id: B, category: C) -> Self
    where
        L: Into<String>,
        B: Into<String>,
        C: Into<String>,
    {
        let backend_id = backend_id.into();
        let caps = Capabilities::infer(&backend_id);
        Self {
            label: label.into(),
            backend_id,
            category: category.into(),
            caps,
        }
    }

    pub fn is_dialogue(&self) -> bool {
        self.caps.dialogue
    }

    pub fn is_lightweight(&self) -> bool {
        self.caps.lightweight
    }

    pub fn is_gated(&self) -> bool {
        self.caps.gated
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model '{0}' has an empty backend id")]
    EmptyBackendId(String),
    #[error("duplicate model label '{0}'")]
    DuplicateLabel(String),
    #[error("registry has no models")]
    Empty,
}

#[derive(Clone, Debug)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    categories: Vec<String>,
}

impl ModelRegistry {
    pub fn new(entries: Vec<ModelEntry>) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = HashSet::new();
        for e in &entries {
            if e.backend_id.trim().is_empty() {
                return Err(RegistryError::EmptyBackendId(e.label.clone()));
            }
            if !seen.insert(e.label.as_str()) {
                return Err(RegistryError::DuplicateLabel(e.label.clone()));
            }
        }
        Ok(Self::from_entries(entries))
    }

    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(cat, label, id)| ModelEntry::new(*label, *id, *cat))
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<ModelEntry>) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for e in &entries {
            if !categories.iter().any(|c| c == &e.category) {
                categories.push(e.category.clone());
            }
        }
        Self {
            entries,
            categories,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn labels(&self, category: &str) -> Vec<&str> {
        self.in_category(category).map(|e| e.label.as_str()).collect()
    }

    pub fn entry(&self, label: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn backend_id(&self, label: &str) -> Option<&str> {
        self.entry(label).map(|e| e.backend_id.as_str())
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// The remembered label if it belongs to `category`, otherwise the first
    /// model of that category. `None` only for an unknown category.
    pub fn select(&self, category: &str, remembered: &str) -> Option<&ModelEntry> {
        self.in_category(category)
            .find(|e| e.label == remembered)
            .or_else(|| self.in_category(category).next())
    }

    pub fn default_entry(&self) -> &ModelEntry {
        self.select(DEFAULT_CATEGORY, DEFAULT_MODEL)
            .unwrap_or(&self.entries[0])
    }

    fn in_category<'s, 'c>(
        &'s self,
        category: &'c str,
    ) -> impl Iterator<Item = &'s ModelEntry> + 'c
    where
        's: 'c,
    {
        self.entries.iter().filter(move |e| e.category == category)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_categories_keep_order() {
        let r = ModelRegistry::builtin();
        assert_eq!(
            r.categories(),
            &[
                "🦙 Llama 3 Models",
                "🦙 Llama 2 Models",
                "🔮 Mistral Models",
                "🤖 GPT Models"
            ]
        );
        assert_eq!(r.labels("🤖 GPT Models"), vec!["GPT-2", "GPT-Neo"]);
    }

    #[test]
    fn builtin_passes_validation() {
        let r = ModelRegistry::builtin();
        assert!(ModelRegistry::new(r.entries().to_vec()).is_ok());
    }

    #[test]
    fn backend_id_lookup() {
        let r = ModelRegistry::builtin();
        assert_eq!(r.backend_id("GPT-Neo"), Some("EleutherAI/gpt-neo-1.3B"));
        assert_eq!(r.backend_id("Nope"), None);
    }

    #[test]
    fn default_selection_is_mixtral() {
        let r = ModelRegistry::builtin();
        assert_eq!(
            r.default_entry().backend_id,
            "mistralai/Mixtral-8x7B-Instruct-v0.1"
        );
    }

    #[test]
    fn select_falls_back_to_first_in_category() {
        let r = ModelRegistry::builtin();
        let e = r.select("🦙 Llama 2 Models", DEFAULT_MODEL).unwrap();
        assert_eq!(e.label, "Llama 2 (7B)");
        let e = r.select("🦙 Llama 2 Models", "Llama 2 (13B)").unwrap();
        assert_eq!(e.label, "Llama 2 (13B)");
        assert!(r.select("unknown", DEFAULT_MODEL).is_none());
    }

    #[test]
    fn lookups_outlive_the_category_argument() {
        let r = ModelRegistry::builtin();
        let (labels, picked) = {
            let category = String::from("🤖 GPT Models");
            (r.labels(&category), r.select(&category, "GPT-Neo"))
        };
        assert_eq!(labels, vec!["GPT-2", "GPT-Neo"]);
        assert_eq!(picked.map(|e| e.backend_id.as_str()), Some("EleutherAI/gpt-neo-1.3B"));
    }

    #[test]
    fn capabilities_from_backend_id() {
        let r = ModelRegistry::builtin();
        let llama = r.entry("Llama 3.1 (70B)").unwrap();
        assert!(llama.is_dialogue() && llama.is_gated() && !llama.is_lightweight());
        let mixtral = r.entry("Mistral Mixtral-8x7B").unwrap();
        assert!(mixtral.is_dialogue() && !mixtral.is_gated());
        for label in ["GPT-2", "GPT-Neo"] {
            let e = r.entry(label).unwrap();
            assert!(!e.is_dialogue() && e.is_lightweight() && !e.is_gated());
        }
    }

    #[test]
    fn rejects_invalid_entries() {
        let err = ModelRegistry::new(vec![ModelEntry::new("a", " ", "c")]).unwrap_err();
        assert_eq!(err, RegistryError::EmptyBackendId("a".into()));
        let err = ModelRegistry::new(vec![
            ModelEntry::new("a", "x/1", "c"),
            ModelEntry::new("a", "x/2", "c"),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateLabel("a".into()));
        assert_eq!(ModelRegistry::new(vec![]).unwrap_err(), RegistryError::Empty);
    }
}
