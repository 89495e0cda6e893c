//! Style descriptions
//!
//! Minimal style collaborator consumed by the `css` combinator: a description
//! is either raw stylesheet text or a list of selector rules, rendered to text
//! before being installed into a shadow boundary.

/// One selector with its declarations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    selector: String,
    declarations: Vec<(String, String)>,
}

impl StyleRule {
    /// Start a rule for the given selector
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            declarations: Vec::new(),
        }
    }

    /// Add a property declaration
    pub fn declare(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.declarations.push((property.into(), value.into()));
        self
    }
}

/// A style description: raw text or structured rules
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleSheet {
    /// Raw stylesheet text, installed verbatim
    Raw(String),
    /// Structured rules, rendered on installation
    Rules(Vec<StyleRule>),
}

impl StyleSheet {
    /// Render the description to stylesheet text
    pub fn to_css_text(&self) -> String {
        match self {
            StyleSheet::Raw(text) => text.clone(),
            StyleSheet::Rules(rules) => rules
                .iter()
                .map(|rule| {
                    let body = rule
                        .declarations
                        .iter()
                        .map(|(property, value)| format!("{property}:{value}"))
                        .collect::<Vec<_>>()
                        .join(";");
                    format!("{}{{{body};}}", rule.selector)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for StyleSheet {
    fn from(text: &str) -> Self {
        StyleSheet::Raw(text.to_owned())
    }
}

impl From<String> for StyleSheet {
    fn from(text: String) -> Self {
        StyleSheet::Raw(text)
    }
}

impl From<Vec<StyleRule>> for StyleSheet {
    fn from(rules: Vec<StyleRule>) -> Self {
        StyleSheet::Rules(rules)
    }
}

impl From<StyleRule> for StyleSheet {
    fn from(rule: StyleRule) -> Self {
        StyleSheet::Rules(vec![rule])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_passes_through() {
        let sheet: StyleSheet = "p { color: red; }".into();
        assert_eq!(sheet.to_css_text(), "p { color: red; }");
    }

    #[test]
    fn test_rules_render() {
        let sheet: StyleSheet = vec![
            StyleRule::new("p").declare("color", "red").declare("margin", "0"),
            StyleRule::new(".title").declare("font-weight", "bold"),
        ]
        .into();

        assert_eq!(
            sheet.to_css_text(),
            "p{color:red;margin:0;}\n.title{font-weight:bold;}"
        );
    }
}
