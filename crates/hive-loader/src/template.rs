//! `{{VAR}}` placeholder substitution over an injected variable source.

use std::collections::HashMap;
use std::sync::OnceLock;

use hive_core::Value;
use regex::{Captures, Regex};

/// Where placeholder values come from.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{([A-Z_][A-Z0-9_]*)\}\}").expect("placeholder pattern is valid")
    })
}

/// Replace every resolvable placeholder in `text`. Unresolved names are
/// appended to `unresolved` and their placeholders kept verbatim.
pub fn substitute(text: &str, env: &dyn EnvSource, unresolved: &mut Vec<String>) -> String {
    placeholder()
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            match env.var(name) {
                Some(value) => value,
                None => {
                    if !unresolved.iter().any(|n| n == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Substitute placeholders in every string leaf of a parsed tree.
///
/// Returns the names that had no value, in first-seen order.
pub fn substitute_value(value: &mut Value, env: &dyn EnvSource) -> Vec<String> {
    let mut unresolved = Vec::new();
    value.map_strings(&mut |s: &str| {
        if s.contains("{{") {
            Some(substitute(s, env, &mut unresolved))
        } else {
            None
        }
    });
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::Mapping;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_known_variables() {
        let mut missing = Vec::new();
        let vars = env(&[("TOPIC", "rust"), ("LANG", "en")]);
        let out = substitute("Topic: {{TOPIC}} in {{LANG}}", &vars, &mut missing);
        assert_eq!(out, "Topic: rust in en");
        assert!(missing.is_empty());
    }

    #[test]
    fn keeps_unresolved_verbatim() {
        let mut missing = Vec::new();
        let out = substitute("a {{NOPE}} b {{NOPE}}", &env(&[]), &mut missing);
        assert_eq!(out, "a {{NOPE}} b {{NOPE}}");
        assert_eq!(missing, vec!["NOPE".to_string()]);
    }

    #[test]
    fn ignores_non_matching_braces() {
        let mut missing = Vec::new();
        let out = substitute("{{lower}} {{ SPACED }}", &env(&[("lower", "x")]), &mut missing);
        assert_eq!(out, "{{lower}} {{ SPACED }}");
        assert!(missing.is_empty());
    }

    #[test]
    fn walks_nested_values() {
        let mut inner = Mapping::new();
        inner.insert("system", Value::Str("Write in {{LANG}}".into()));
        let mut root = Mapping::new();
        root.insert("prompts", Value::Map(inner));
        root.insert(
            "goals",
            Value::Seq(vec![Value::Str("{{GOAL}}".into()), Value::Int(3)]),
        );
        let mut value = Value::Map(root);

        let missing = substitute_value(&mut value, &env(&[("LANG", "French")]));
        assert_eq!(missing, vec!["GOAL".to_string()]);
        assert_eq!(
            value.get("prompts").unwrap().get("system").unwrap().as_str(),
            Some("Write in French")
        );
        assert_eq!(
            value.get("goals").unwrap().as_seq().unwrap()[0].as_str(),
            Some("{{GOAL}}")
        );
    }
}
