//! Localised message catalogs.
//!
//! Each language has a `messages-<code>.toml` file whose nested tables are
//! flattened into dotted keys:
//!
//! ```toml
//! [group-commands.show]
//! message-no-group = "&7You are not in any group."
//! ```
//!
//! becomes `group-commands.show.message-no-group`. Arrays of strings are
//! multi-line messages and are joined with `\n`.
//!
//! English and German catalogs are compiled in; files found in the
//! configured messages directory override them key by key.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::LanguageConfig;
use crate::error::{GroupError, Result};

const BUILTIN_EN: &str = include_str!("../resources/messages-en.toml");
const BUILTIN_DE: &str = include_str!("../resources/messages-de.toml");

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageValue {
    /// Single-line message.
    Text(String),
    /// Multi-line message.
    Lines(Vec<String>),
}

impl MessageValue {
    /// The message as one string, lines separated by `\n`.
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }
}

/// All messages of one language, keyed by dotted path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    entries: HashMap<String, MessageValue>,
}

impl Messages {
    /// Parse a TOML message file.
    ///
    /// # Errors
    /// Returns `GroupError::Config` if the TOML is invalid or an array holds
    /// something other than strings.
    pub fn from_toml(source: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(source).map_err(|e| GroupError::Config(e.to_string()))?;
        let mut entries = HashMap::new();
        flatten("", &toml::Value::Table(table), &mut entries)?;
        Ok(Self { entries })
    }

    /// Look up a message by dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MessageValue> {
        self.entries.get(key)
    }

    /// Overlay `other` on top of this catalog.
    pub fn merge(&mut self, other: Messages) {
        self.entries.extend(other.entries);
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut HashMap<String, MessageValue>) -> Result<()> {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out)?;
            }
        }
        toml::Value::Array(items) => {
            let lines = items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| GroupError::Config(format!("{prefix}: message lines must be strings")))
                })
                .collect::<Result<Vec<_>>>()?;
            out.insert(prefix.to_string(), MessageValue::Lines(lines));
        }
        toml::Value::String(text) => {
            out.insert(prefix.to_string(), MessageValue::Text(text.clone()));
        }
        other => {
            out.insert(prefix.to_string(), MessageValue::Text(other.to_string()));
        }
    }
    Ok(())
}

/// Message catalogs for every known language.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    default_code: String,
    languages: HashMap<String, Messages>,
}

impl MessageCatalog {
    /// Catalog containing only the compiled-in languages.
    ///
    /// # Errors
    /// Returns `GroupError::Config` if a built-in catalog fails to parse.
    pub fn builtin(default_code: impl Into<String>) -> Result<Self> {
        let mut languages = HashMap::new();
        languages.insert("en".to_string(), Messages::from_toml(BUILTIN_EN)?);
        languages.insert("de".to_string(), Messages::from_toml(BUILTIN_DE)?);
        Ok(Self {
            default_code: default_code.into(),
            languages,
        })
    }

    /// Built-in catalogs overlaid with `messages-<code>.toml` files from
    /// `config.messages_dir` for every code in `codes`.
    ///
    /// Missing files are skipped; unreadable or malformed files are errors.
    ///
    /// # Errors
    /// Returns `GroupError::Io` or `GroupError::Config` for bad files.
    pub fn load(config: &LanguageConfig, codes: &[String]) -> Result<Self> {
        let mut catalog = Self::builtin(config.default_code.clone())?;
        if let Some(dir) = &config.messages_dir {
            for code in codes {
                catalog.load_override(dir, code)?;
            }
        }
        if !catalog.languages.contains_key(&catalog.default_code) {
            warn!(code = %catalog.default_code, "No messages for the default language");
        }
        Ok(catalog)
    }

    fn load_override(&mut self, dir: &Path, code: &str) -> Result<()> {
        let path = dir.join(format!("messages-{code}.toml"));
        if !path.exists() {
            debug!(path = %path.display(), "No message override file");
            return Ok(());
        }
        let content = std::fs::read_to_string(&path)?;
        let messages = Messages::from_toml(&content)?;
        debug!(code, keys = messages.len(), "Loaded message overrides");
        self.languages.entry(code.to_string()).or_default().merge(messages);
        Ok(())
    }

    /// Add or overlay a language.
    pub fn insert(&mut self, code: impl Into<String>, messages: Messages) {
        self.languages.entry(code.into()).or_default().merge(messages);
    }

    /// Whether a catalog exists for `code`.
    #[must_use]
    pub fn has_language(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    /// The fallback language code.
    #[must_use]
    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Resolve `key` in `code`, then the default language, then fall back to
    /// the key itself.
    #[must_use]
    pub fn lookup(&self, code: &str, key: &str) -> String {
        let found = self
            .languages
            .get(code)
            .and_then(|m| m.get(key))
            .or_else(|| self.languages.get(&self.default_code).and_then(|m| m.get(key)));
        if let Some(value) = found {
            value.joined()
        } else {
            warn!(code, key, "Missing message key");
            key.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogs_cover_the_same_keys() {
        let en = Messages::from_toml(BUILTIN_EN).expect("en");
        let de = Messages::from_toml(BUILTIN_DE).expect("de");
        assert_eq!(en.len(), de.len());
        for key in en.entries.keys() {
            assert!(de.get(key).is_some(), "German catalog misses {key}");
        }
    }

    #[test]
    fn nested_tables_flatten_to_dotted_keys() {
        let messages = Messages::from_toml(
            r#"
            [a.b]
            c = "hello"
            lines = ["one", "two"]
            "#,
        )
        .expect("parse");
        assert_eq!(messages.get("a.b.c"), Some(&MessageValue::Text("hello".into())));
        assert_eq!(messages.get("a.b.lines").map(MessageValue::joined), Some("one\ntwo".into()));
    }

    #[test]
    fn non_string_lines_are_rejected() {
        assert!(Messages::from_toml("x = [1, 2]").is_err());
    }

    #[test]
    fn lookup_falls_back_to_default_then_key() {
        let mut catalog = MessageCatalog::builtin("en").expect("builtin");
        catalog.insert("fr", Messages::from_toml("[language]\nsuccess = \"ok\"").expect("fr"));
        assert_eq!(catalog.lookup("fr", "language.success"), "ok");
        assert_eq!(
            catalog.lookup("fr", "language.usage"),
            catalog.lookup("en", "language.usage")
        );
        assert_eq!(catalog.lookup("fr", "no.such.key"), "no.such.key");
    }

    #[test]
    fn overrides_from_directory_replace_single_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("messages-en.toml"),
            "[language]\nsuccess = \"custom\"\n",
        )
        .expect("write");
        let config = LanguageConfig {
            messages_dir: Some(dir.path().to_path_buf()),
            ..LanguageConfig::default()
        };
        let catalog = MessageCatalog::load(&config, &["en".to_string(), "es".to_string()]).expect("load");
        assert_eq!(catalog.lookup("en", "language.success"), "custom");
        assert_ne!(catalog.lookup("en", "language.usage"), "language.usage");
        assert!(!catalog.has_language("es"));
    }
}
