//! identifier rules for generated code

/// group acronym runs so case conversion treats them as one word
///
/// a run of capitals/digits becomes title case when it is followed by
/// another capital/digit or ends the name: `loadContainerFromID` ->
/// `loadContainerFromId`, `HTTPServer` -> `HttpServer`.
pub fn group_acronyms(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let in_run = |ch: char| ch.is_ascii_uppercase() || ch.is_ascii_digit();

    let mut out = String::with_capacity(name.len());
    let mut idx = 0;
    while idx < chars.len() {
        if !in_run(chars[idx]) {
            out.push(chars[idx]);
            idx += 1;
            continue;
        }

        let mut end = idx;
        while end < chars.len() && in_run(chars[end]) {
            end += 1;
        }
        // the last capital of a run that continues in lowercase starts the next word
        let matched = if end == chars.len() { end } else { end - 1 };
        if matched > idx {
            out.push_str(&title_case(&chars[idx..matched]));
            idx = matched;
        } else {
            out.push(chars[idx]);
            idx += 1;
        }
    }
    out
}

fn title_case(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut prev_letter = false;
    for &ch in chars {
        if prev_letter {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        prev_letter = ch.is_alphabetic();
    }
    out
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if idx > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// rust method, field, or parameter name for a schema name
pub fn field_name(name: &str) -> String {
    let out = camel_to_snake(&group_acronyms(name));
    if is_rust_keyword(&out) {
        format!("{out}_")
    } else {
        out
    }
}

/// rust type name for a schema type name
pub fn type_name(name: &str) -> String {
    let grouped = group_acronyms(name);
    let mut out = String::with_capacity(grouped.len());
    let mut upper = true;
    for ch in grouped.chars() {
        if ch == '_' || ch == '-' {
            upper = true;
            continue;
        }
        if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    if is_rust_keyword(&out) {
        format!("{out}_")
    } else {
        out
    }
}

/// rust variant name for an enum value
///
/// `SCREAMING_CASE` values are split on underscores, anything else is
/// treated like a type name.
pub fn variant_name(value: &str) -> String {
    let screaming = value
        .chars()
        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_');
    if !screaming {
        return type_name(value);
    }

    let mut out = String::with_capacity(value.len());
    for part in value.split('_').filter(|part| !part.is_empty()) {
        let chars: Vec<char> = part.chars().collect();
        out.push_str(&title_case(&chars));
    }
    if out.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if is_rust_keyword(&out) {
        out.push('_');
    }
    out
}

/// pascal case, used to build companion type names like `ContainerWithExecOpts`
pub fn pascal(name: &str) -> String {
    type_name(&field_name(name).trim_end_matches('_').replace('_', "-"))
}

/// rewrite backticked schema names in a deprecation note to rust method names
pub fn rewrite_backticks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('`') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('`') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        let plain = !inner.is_empty()
            && inner
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        out.push('`');
        if plain {
            out.push_str(&field_name(inner));
        } else {
            out.push_str(inner);
        }
        out.push('`');
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

pub fn is_rust_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "break"
            | "const"
            | "continue"
            | "crate"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
            | "gen"
    )
}
