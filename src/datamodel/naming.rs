//! Identifier helpers shared by inference and normalization

use heck::ToLowerCamelCase;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("mouse", "mice"),
    ("tooth", "teeth"),
    ("foot", "feet"),
];

const UNCOUNTABLE: &[&str] = &[
    "data", "equipment", "information", "metadata", "news", "series", "species",
];

/// Uppercase the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character
pub fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn camel_case(s: &str) -> String {
    s.to_lower_camel_case()
}

/// True for names without any lowercase letter, e.g. `USER` or `HTTP_LOG`
pub fn is_all_uppercase(s: &str) -> bool {
    s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_lowercase)
}

/// Strip a trailing `Id`, `_id` or `_ID`
pub fn remove_id_suffix(s: &str) -> &str {
    let s = s.strip_suffix("Id").unwrap_or(s);
    let s = s.strip_suffix("_id").unwrap_or(s);
    s.strip_suffix("_ID").unwrap_or(s)
}

pub fn plural(word: &str) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    if UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return word.to_string();
    }
    if let Some((singular, plural)) = IRREGULAR.iter().find(|(s, _)| lower.ends_with(s)) {
        return replace_tail(word, singular.len(), plural);
    }
    if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        return replace_tail(word, 1, "ies");
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return replace_tail(word, 0, "es");
    }
    replace_tail(word, 0, "s")
}

pub fn singular(word: &str) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    if UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return word.to_string();
    }
    if let Some((singular, plural)) = IRREGULAR.iter().find(|(_, p)| lower.ends_with(p)) {
        return replace_tail(word, plural.len(), singular);
    }
    if lower.len() > 3 && lower.ends_with("ies") {
        return replace_tail(word, 3, "y");
    }
    if ["sses", "xes", "zes", "ches", "shes"]
        .iter()
        .any(|s| lower.ends_with(s))
    {
        return replace_tail(word, 2, "");
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }
    if lower.len() > 1 && lower.ends_with('s') {
        return replace_tail(word, 1, "");
    }
    word.to_string()
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut rev = lower.chars().rev();
    rev.next();
    matches!(rev.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

/// Replace the last `len` bytes with `suffix`, keeping an all-uppercase word uppercase
fn replace_tail(word: &str, len: usize, suffix: &str) -> String {
    let stem = &word[..word.len() - len];
    if is_all_uppercase(word) {
        format!("{stem}{}", suffix.to_uppercase())
    } else {
        let keep_capital = len > 0 && stem.is_empty() && word.starts_with(char::is_uppercase);
        if keep_capital {
            capitalize(suffix)
        } else {
            format!("{stem}{suffix}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural("Post"), "Posts");
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("day"), "days");
        assert_eq!(plural("box"), "boxes");
        assert_eq!(plural("Person"), "People");
        assert_eq!(plural("USER"), "USERS");
    }

    #[test]
    fn test_singular() {
        assert_eq!(singular("users"), "user");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("status"), "status");
        assert_eq!(singular("people"), "person");
        assert_eq!(singular("address"), "address");
    }

    #[test]
    fn test_remove_id_suffix() {
        assert_eq!(remove_id_suffix("author_id"), "author");
        assert_eq!(remove_id_suffix("authorId"), "author");
        assert_eq!(remove_id_suffix("AUTHOR_ID"), "AUTHOR");
        assert_eq!(remove_id_suffix("title"), "title");
    }

    #[test]
    fn test_casing() {
        assert_eq!(camel_case("user_profiles"), "userProfiles");
        assert_eq!(capitalize(&camel_case("order_items")), "OrderItems");
        assert!(is_all_uppercase("USER_LOG"));
        assert!(!is_all_uppercase("User"));
    }
}
