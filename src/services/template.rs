//! Prompt template resolution.
//!
//! Templates mark inputs with `{{name}}`. Resolution is a single left-to-right
//! pass: substituted values are never scanned again, and placeholders with no
//! supplied value are left in the output untouched.

use std::collections::HashMap;

/// A piece of a scanned template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    /// `name` is trimmed; `raw` is the full `{{ name }}` text
    Placeholder { name: &'a str, raw: &'a str },
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['{', '}'])
}

/// Split a template into literals and placeholders.
fn scan(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find("{{") {
        let open = cursor + offset;
        let inner_start = open + 2;
        let Some(close_offset) = template[inner_start..].find("}}") else {
            break;
        };
        let inner = &template[inner_start..inner_start + close_offset];

        if inner.contains('{') {
            // "{{{name}}": the placeholder starts at a later brace
            cursor = open + 1;
            continue;
        }

        let name = inner.trim();
        if !is_valid_name(name) {
            cursor = inner_start;
            continue;
        }

        let close = inner_start + close_offset + 2;
        if literal_start < open {
            segments.push(Segment::Literal(&template[literal_start..open]));
        }
        segments.push(Segment::Placeholder {
            name,
            raw: &template[open..close],
        });
        literal_start = close;
        cursor = close;
    }

    if literal_start < template.len() {
        segments.push(Segment::Literal(&template[literal_start..]));
    }
    segments
}

/// Substitute every placeholder that has a value in `values`.
pub fn resolve(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in scan(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder { name, raw } => match values.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(raw),
            },
        }
    }
    out
}

/// Placeholder names in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in scan(template) {
        if let Segment::Placeholder { name, .. } = segment {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Placeholder names that `values` does not supply.
pub fn unresolved(template: &str, values: &HashMap<String, String>) -> Vec<String> {
    placeholders(template)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_resolves_known_placeholders() {
        let out = resolve("Write about {{topic}} in {{length}}.", &values(&[("topic", "tea"), ("length", "50 words")]));
        assert_eq!(out, "Write about tea in 50 words.");
    }

    #[test]
    fn test_keeps_unknown_placeholders() {
        let out = resolve("{{a}} and {{b}}", &values(&[("a", "1")]));
        assert_eq!(out, "1 and {{b}}");
    }

    #[test]
    fn test_does_not_rescan_substituted_values() {
        let out = resolve("{{a}}", &values(&[("a", "{{b}}"), ("b", "nope")]));
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn test_names_are_literal() {
        let out = resolve("{{a.b}} {{a*}}", &values(&[("a.b", "dot"), ("a", "plain")]));
        assert_eq!(out, "dot {{a*}}");
    }

    #[test]
    fn test_repeated_placeholder_replaced_everywhere() {
        let out = resolve("{{x}}-{{x}}-{{ x }}", &values(&[("x", "y")]));
        assert_eq!(out, "y-y-y");
    }

    #[test]
    fn test_extra_braces_and_unterminated() {
        assert_eq!(resolve("{{{x}}}", &values(&[("x", "v")])), "{v}");
        assert_eq!(resolve("open {{x", &values(&[("x", "v")])), "open {{x");
        assert_eq!(resolve("{{}} {{ }}", &values(&[])), "{{}} {{ }}");
    }

    #[test]
    fn test_placeholders_in_first_appearance_order() {
        assert_eq!(placeholders("{{b}} {{a}} {{b}} {{c}}"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_unresolved_lists_missing() {
        let missing = unresolved("{{topic}} {{tone}}", &values(&[("topic", "t")]));
        assert_eq!(missing, vec!["tone"]);
    }
}
