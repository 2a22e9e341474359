// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow i18n service an `agent_step` consults when its prompt is
//! given as a translation key rather than a literal string. Deliberately
//! thin per spec §9: a key/attrs lookup and an existence check, nothing
//! resembling a template engine.

use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;

pub type I18nAttrs = HashMap<String, Value>;

/// Resolves translation keys to strings.
pub trait Translator: Send + Sync {
    /// Resolve `key`, interpolating `attrs`. Returns `None` if the key is
    /// not declared.
    fn t(&self, key: &str, attrs: &I18nAttrs) -> Option<String>;

    fn exists(&self, key: &str) -> bool;

    /// Resolve a list-valued key, e.g. `<name>.cached_prompts`. Defaults to
    /// empty; translators that only model single strings can leave this.
    fn t_list(&self, _key: &str) -> Vec<String> {
        Vec::new()
    }
}

/// A translator with no entries; every lookup misses. Useful where a
/// pipeline only uses literal prompts.
#[derive(Debug, Clone, Default)]
pub struct NullTranslator;

impl Translator for NullTranslator {
    fn t(&self, _key: &str, _attrs: &I18nAttrs) -> Option<String> {
        None
    }

    fn exists(&self, _key: &str) -> bool {
        false
    }
}

/// A translator backed by a fixed key -> template map, with `{{attr}}`
/// substitution against the supplied attrs. A test double, not a general
/// template engine.
#[derive(Debug, Clone, Default)]
pub struct MapTranslator {
    templates: BTreeMap<String, String>,
    lists: BTreeMap<String, Vec<String>>,
}

impl MapTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }

    pub fn with_list(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.lists.insert(key.into(), values);
        self
    }
}

impl Translator for MapTranslator {
    fn t(&self, key: &str, attrs: &I18nAttrs) -> Option<String> {
        let template = self.templates.get(key)?;
        let mut rendered = template.clone();
        for (name, value) in attrs {
            let placeholder = format!("{{{{{name}}}}}");
            let value_str = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &value_str);
        }
        Some(rendered)
    }

    fn exists(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    fn t_list(&self, key: &str) -> Vec<String> {
        self.lists.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
