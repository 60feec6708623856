//! Placeholder substitution for transform actions.

use serde_json::Value;

use crate::event::Event;

/// Replace `{{placeholder}}` occurrences with event field values.
///
/// Unresolved placeholders are left verbatim; rendering never fails.
pub fn render(template: &str, event: &Event) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        match after_open.find("}}") {
            Some(close) => {
                let name = after_open[..close].trim();
                match event.get(name) {
                    Some(value) => out.push_str(&stringify(value)),
                    None => {
                        // Unresolved: keep the placeholder as-is.
                        out.push_str(&rest[open..open + 2 + close + 2]);
                    }
                }
                rest = &after_open[close + 2..];
            }
            None => {
                // Unterminated braces: emit the remainder verbatim.
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_substitution() {
        let event = Event::new()
            .with("host", json!("db-1"))
            .with("usage", json!(92));
        assert_eq!(
            render("Disk on {{host}} at {{usage}}%", &event),
            "Disk on db-1 at 92%"
        );
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let event = Event::new().with("name", json!("Ada"));
        assert_eq!(render("Hi {{ name }}!", &event), "Hi Ada!");
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        let event = Event::new();
        assert_eq!(render("Hello {{who}}", &event), "Hello {{who}}");
    }

    #[test]
    fn test_unterminated_braces() {
        let event = Event::new().with("a", json!(1));
        assert_eq!(render("x {{a", &event), "x {{a");
    }

    #[test]
    fn test_no_placeholders() {
        let event = Event::new();
        assert_eq!(render("plain text", &event), "plain text");
    }
}
