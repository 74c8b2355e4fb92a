//! Language-keyed tokenizers applied before text reaches the FTS index.
//!
//! Languages without a registered tokenizer pass through unchanged, leaving
//! word splitting to FTS5 itself. Languages written without spaces (Japanese,
//! Chinese) register a segmenter that inserts them.

use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;

use crate::config::SegmenterConfig;

pub type TokenizeFn = dyn Fn(&str) -> String + Send + Sync;

#[derive(Clone, Default)]
pub struct Tokenizers {
    by_lang: HashMap<String, Arc<TokenizeFn>>,
}

impl std::fmt::Debug for Tokenizers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut langs: Vec<&String> = self.by_lang.keys().collect();
        langs.sort();
        f.debug_struct("Tokenizers").field("langs", &langs).finish()
    }
}

impl Tokenizers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        lang: impl Into<String>,
        tokenize: impl Fn(&str) -> String + Send + Sync + 'static,
    ) {
        self.by_lang.insert(lang.into(), Arc::new(tokenize));
    }

    pub fn is_registered(&self, lang: &str) -> bool {
        self.by_lang.contains_key(lang)
    }

    pub fn tokenize(&self, value: &str, lang: Option<&str>) -> String {
        match lang.and_then(|l| self.by_lang.get(l)) {
            Some(f) => f(value),
            None => value.to_string(),
        }
    }

    /// Register an external segmenter command for every configured language.
    pub fn from_config(segmenters: &HashMap<String, SegmenterConfig>) -> Self {
        let mut out = Self::new();
        for (lang, cfg) in segmenters {
            if cfg.command.is_empty() {
                tracing::warn!(lang = %lang, "segmenter has an empty command; ignoring");
                continue;
            }
            let command = cfg.command.clone();
            let lang_name = lang.clone();
            out.register(lang.clone(), move |value| {
                run_segmenter(&command, value).unwrap_or_else(|| {
                    tracing::warn!(lang = %lang_name, "segmenter failed; indexing value as is");
                    value.to_string()
                })
            });
            tracing::info!(lang = %lang, program = %cfg.command[0], "segmenter registered");
        }
        out
    }
}

/// Run `command` with `value` appended as the final argument; stdout is the result.
fn run_segmenter(command: &[String], value: &str) -> Option<String> {
    let (program, args) = command.split_first()?;
    let output = Command::new(program).args(args).arg(value).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim_end_matches(['\r', '\n']).to_string())
}
