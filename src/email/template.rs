use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::warn;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{|\}\}|\{(\w+)\}").expect("valid regex"));

/// Substitute `{key}` placeholders. `{{` and `}}` produce literal braces;
/// a placeholder with no value is left as written.
pub fn render(template: &str, values: &BTreeMap<&str, &str>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match caps.get(1) {
            Some(key) => match values.get(key.as_str()) {
                Some(value) => value.to_string(),
                None => {
                    warn!("Unknown placeholder {{{}}} left in message", key.as_str());
                    caps[0].to_string()
                }
            },
            None if &caps[0] == "{{" => "{".to_string(),
            None => "}".to_string(),
        })
        .into_owned()
}
