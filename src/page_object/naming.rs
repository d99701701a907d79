//! Page keys and identifier casing

use url::Url;

use crate::models::ElementDescriptor;

const BASE_URL: &str = "http://localhost";

/// Words of an arbitrary label: split on anything non-alphanumeric and on
/// lower-to-upper camelCase boundaries
pub fn words(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in value.split(|c: char| !c.is_alphanumeric()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in chunk.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

pub fn pascal_case(value: &str) -> String {
    words(value).iter().map(|w| capitalize(w)).collect()
}

pub fn camel_case(value: &str) -> String {
    let pascal = pascal_case(value);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Make a camelCase string safe as an identifier
fn identifier(value: String, fallback: &str) -> String {
    match value.chars().next() {
        None => fallback.to_string(),
        Some(c) if c.is_ascii_digit() => format!("{}{}", fallback, capitalize(&value)),
        Some(_) => value,
    }
}

/// Path of a URL, ignoring query and fragment. Relative URLs are taken
/// against a local origin.
pub fn url_path(raw: &str) -> String {
    let parsed = Url::parse(raw).or_else(|_| Url::parse(BASE_URL).and_then(|base| base.join(raw)));
    match parsed {
        Ok(url) => url.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Page-object class name for a URL: path segments PascalCased and joined,
/// `Home` for the root, suffixed with `Page`
pub fn page_key(raw_url: &str) -> String {
    let path = url_path(raw_url);
    let base = pascal_case(&path);
    if base.is_empty() {
        "HomePage".to_string()
    } else if base.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("Page{}Page", base)
    } else {
        format!("{}Page", base)
    }
}

fn tag_suffix(tag: &str) -> String {
    match tag {
        "a" => "Link".to_string(),
        "input" => "Input".to_string(),
        "button" => "Button".to_string(),
        "select" => "Select".to_string(),
        "textarea" => "Textarea".to_string(),
        "" => "Element".to_string(),
        other => pascal_case(other),
    }
}

/// Readable base for an element's name before the tag suffix
pub fn element_base(element: &ElementDescriptor) -> String {
    if let Some(name) = element.field_name() {
        return name.to_string();
    }
    if let Some(testid) = element.attribute("data-testid") {
        return testid.to_string();
    }
    let text = element.text_content.trim();
    if !text.is_empty() {
        return words(text).into_iter().take(4).collect::<Vec<_>>().join(" ");
    }
    String::new()
}

/// Binding name such as `userInput` or `submitButton`
pub fn element_name(element: &ElementDescriptor) -> String {
    let suffix = tag_suffix(&element.tag_name);
    let base = pascal_case(&element_base(element));
    let name = if base.ends_with(&suffix) {
        camel_case(&base)
    } else {
        camel_case(&format!("{}{}", base, suffix))
    };
    identifier(name, "element")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_keys() {
        assert_eq!(page_key("/"), "HomePage");
        assert_eq!(page_key("https://example.com"), "HomePage");
        assert_eq!(page_key("/login"), "LoginPage");
        assert_eq!(page_key("/user/settings"), "UserSettingsPage");
        assert_eq!(page_key("https://example.com/my-account/"), "MyAccountPage");
    }

    #[test]
    fn test_query_is_ignored() {
        assert_eq!(page_key("/login?x=1"), page_key("/login"));
        assert_eq!(page_key("https://example.com/login?next=%2F#top"), "LoginPage");
    }

    #[test]
    fn test_casing() {
        assert_eq!(pascal_case("sign in"), "SignIn");
        assert_eq!(pascal_case("first_name"), "FirstName");
        assert_eq!(camel_case("Sign In"), "signIn");
        assert_eq!(words("userName"), vec!["user", "Name"]);
    }

    #[test]
    fn test_element_names() {
        assert_eq!(element_name(&ElementDescriptor::new("input").with_id("user")), "userInput");
        assert_eq!(element_name(&ElementDescriptor::new("button").with_id("submit")), "submitButton");
        assert_eq!(
            element_name(&ElementDescriptor::new("button").with_text("Save button")),
            "saveButton"
        );
        assert_eq!(element_name(&ElementDescriptor::new("a").with_text("Home")), "homeLink");
        assert_eq!(element_name(&ElementDescriptor::new("div")), "div");
    }
}
