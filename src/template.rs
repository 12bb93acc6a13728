//! # Text Templating
//!
//! Zone text may contain `%name%` placeholders. Expansion belongs to the host
//! firmware; the controller only calls [`TemplateExpander::expand`] right before
//! handing text to the driver.

use std::collections::HashMap;

/// Resolves placeholders in zone text.
pub trait TemplateExpander {
    fn expand(&self, text: &str) -> String;
}

/// Leaves text untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl TemplateExpander for PlainText {
    fn expand(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Substitutes `%name%` from a variable map.
///
/// Unknown names and a lone `%` are kept as written.
#[derive(Debug, Default, Clone)]
pub struct VariableTemplates {
    variables: HashMap<String, String>,
}

impl VariableTemplates {
    pub fn new(variables: HashMap<String, String>) -> Self {
        VariableTemplates { variables }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }
}

impl TemplateExpander for VariableTemplates {
    fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) => {
                    let name = &after[..end];
                    match self.variables.get(name) {
                        Some(value) => {
                            out.push_str(value);
                            rest = &after[end + 1..];
                        }
                        None => {
                            // Keep the opening '%'; the closing one may start a real placeholder
                            out.push('%');
                            rest = after;
                        }
                    }
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> VariableTemplates {
        let mut t = VariableTemplates::default();
        t.set("sysname", "kitchen");
        t.set("temp", "21.5");
        t
    }

    #[test]
    fn test_expands_known_variables() {
        assert_eq!(templates().expand("%sysname%: %temp%C"), "kitchen: 21.5C");
    }

    #[test]
    fn test_keeps_unknown_and_stray_percent() {
        assert_eq!(templates().expand("100% %nope% x"), "100% %nope% x");
        assert_eq!(templates().expand("50%%temp%"), "50%21.5");
    }

    #[test]
    fn test_plain_text_is_identity() {
        assert_eq!(PlainText.expand("%sysname%"), "%sysname%");
    }
}
