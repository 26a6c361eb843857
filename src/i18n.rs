use color_eyre::eyre::{eyre, Result};
use std::collections::HashMap;
use std::path::Path;

/// Looks up display strings by key, falling back to the caller's default text.
///
/// Templates use positional placeholders: `"Steps {0}"`.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    messages: HashMap<String, String>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }

    /// Loads overrides from a flat JSON object of `key -> template`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read messages file {path:?}: {e}"))?;
        let messages: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| eyre!("Invalid messages file {path:?}: {e}"))?;
        tracing::debug!("loaded {} message overrides", messages.len());
        Ok(Self { messages })
    }

    pub fn t(&self, key: &str, default: &str, args: &[&str]) -> String {
        let template = self.messages.get(key).map_or(default, String::as_str);
        interpolate(template, args)
    }
}

fn interpolate(template: &str, args: &[&str]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |acc, (i, arg)| {
            acc.replace(&format!("{{{i}}}"), arg)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        let t = Translator::new();
        assert_eq!(
            t.t("rundetail.pipeline.queued.message", "Waiting for run to start", &[]),
            "Waiting for run to start"
        );
    }

    #[test]
    fn override_wins() {
        let t = Translator::with_messages(HashMap::from([(
            "rundetail.pipeline.nosteps".to_string(),
            "Keine Logs".to_string(),
        )]));
        assert_eq!(t.t("rundetail.pipeline.nosteps", "There are no logs", &[]), "Keine Logs");
    }

    #[test]
    fn positional_args() {
        let t = Translator::new();
        assert_eq!(t.t("rundetail.pipeline.steps", "Steps {0}", &["Build"]), "Steps Build");
    }

    #[test]
    fn missing_arg_leaves_placeholder() {
        let t = Translator::new();
        assert_eq!(t.t("k", "{0} and {1}", &["a"]), "a and {1}");
    }

    #[test]
    fn load_rejects_non_object() {
        let dir = std::env::temp_dir().join(format!("plw-i18n-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("messages.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(Translator::load(&path).is_err());

        std::fs::write(&path, r#"{"rundetail.pipeline.steps": "Schritte {0}"}"#).unwrap();
        let t = Translator::load(&path).unwrap();
        assert_eq!(t.t("rundetail.pipeline.steps", "Steps {0}", &["Test"]), "Schritte Test");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
