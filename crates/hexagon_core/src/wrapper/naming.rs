//! Identifier case helpers used for wrapper aliases and field fallbacks.

/// `first_name` -> `firstName`, `OrderItem` -> `orderItem`.
pub fn to_camel(value: &str) -> String {
    let mut camel = String::with_capacity(value.len());
    let words = value
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty());

    for (index, word) in words.enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                camel.extend(first.to_lowercase());
            } else {
                camel.extend(first.to_uppercase());
            }
            camel.push_str(chars.as_str());
        }
    }
    camel
}

/// `firstName` -> `first_name`, `FirstName` -> `first_name`.
pub fn to_snake(value: &str) -> String {
    let mut snake = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        if ch == '-' || ch.is_whitespace() {
            if !snake.ends_with('_') {
                snake.push('_');
            }
        } else if ch.is_uppercase() {
            if !snake.is_empty() && !snake.ends_with('_') {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
        } else {
            snake.push(ch);
        }
    }
    snake
}

/// Alias of a wrapper type: its base name without the `Wrapper` suffix,
/// camel-cased. `shop::CategoryWrapper` -> `category`.
pub fn model_alias(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let base = base.rsplit("::").next().unwrap_or(base);
    let base = base.strip_suffix("Wrapper").unwrap_or(base);
    to_camel(base)
}

#[cfg(test)]
mod tests {
    use super::{model_alias, to_camel, to_snake};

    #[test]
    fn camel_case_conversions() {
        assert_eq!(to_camel("first_name"), "firstName");
        assert_eq!(to_camel("OrderItem"), "orderItem");
        assert_eq!(to_camel("category"), "category");
    }

    #[test]
    fn snake_case_conversions() {
        assert_eq!(to_snake("firstName"), "first_name");
        assert_eq!(to_snake("FirstName"), "first_name");
        assert_eq!(to_snake("already_snake"), "already_snake");
    }

    #[test]
    fn alias_strips_path_generics_and_suffix() {
        assert_eq!(model_alias("shop::wrappers::CategoryWrapper"), "category");
        assert_eq!(model_alias("OrderItemWrapper"), "orderItem");
        assert_eq!(model_alias("a::InvoiceWrapper<b::Thing>"), "invoice");
    }
}
