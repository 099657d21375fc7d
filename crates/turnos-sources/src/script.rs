//! Pulling data literals out of JavaScript sources.
//!
//! Some sites ship their schedule as `const turnos = [...]` inside a script.
//! [`extract_js_value`] finds the declaration, cuts out the balanced literal,
//! rewrites it as JSON with [`js_to_json`] and parses it.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde_json::Value;

pub fn extract_js_value(js: &str, var_name: &str) -> Result<Value> {
    let decl = Regex::new(&format!(r"\b(?:const|let|var)\s+{}\s*=\s*", regex::escape(var_name)))
        .context("building declaration pattern")?;
    let Some(m) = decl.find(js) else {
        bail!("variable `{var_name}` not found");
    };
    let literal = balanced_literal(&js[m.end()..])
        .with_context(|| format!("`{var_name}` is not a closed object or array literal"))?;
    let json = js_to_json(literal);
    serde_json::from_str(&json).with_context(|| format!("`{var_name}` does not convert to valid JSON"))
}

/// The leading `{...}` or `[...]` of `src`, skipping strings and comments.
fn balanced_literal(src: &str) -> Option<&str> {
    let bytes = src.as_bytes();
    let open = *bytes.first()?;
    let close = match open {
        b'[' => b']',
        b'{' => b'}',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'/' if matches!(bytes.get(i + 1), Some(b'/') | Some(b'*')) => {
                i += if bytes[i + 1] == b'/' {
                    src[i..].find('\n').unwrap_or(src.len() - i)
                } else {
                    src[i + 2..].find("*/").map_or(src.len() - i, |end| end + 4)
                };
                continue;
            }
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&src[..=i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Rewrite a JavaScript data literal as JSON: comments dropped, single-quoted
/// and template strings turned into JSON strings, bare object keys quoted,
/// trailing commas removed.
pub fn js_to_json(js: &str) -> String {
    let chars: Vec<char> = js.chars().collect();
    let mut out = String::with_capacity(js.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' | '`' => {
                i = copy_string(&chars, i, &mut out);
                continue;
            }
            '/' if matches!(chars.get(i + 1), Some('/') | Some('*')) => {
                i = skip_comment(&chars, i);
                continue;
            }
            ',' if matches!(next_significant(&chars, i + 1), Some(']') | Some('}')) => {}
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if next_significant(&chars, i) == Some(':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Copy the string literal starting at `start` as a JSON string; returns the
/// index just past its closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                match chars.get(i + 1) {
                    Some('\'') | Some('`') => out.push(chars[i + 1]),
                    Some(&next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => {}
                }
                i += 2;
                continue;
            }
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }
    out.push('"');
    i
}

fn skip_comment(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    if chars[start + 1] == '/' {
        while i < chars.len() && chars[i] != '\n' {
            i += 1;
        }
        i
    } else {
        while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
            i += 1;
        }
        (i + 2).min(chars.len())
    }
}

/// Next character at or after `from` that is neither whitespace nor comment.
fn next_significant(chars: &[char], mut from: usize) -> Option<char> {
    while from < chars.len() {
        let c = chars[from];
        if c.is_whitespace() {
            from += 1;
        } else if c == '/' && matches!(chars.get(from + 1), Some('/') | Some('*')) {
            from = skip_comment(chars, from);
        } else {
            return Some(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_js_literal_quirks() {
        let js = r#"{
            // listado
            dia: 'Lunes 3', /* fin */
            "farmacia": 'D\'Angelo',
            nota: 'dice "hola"',
            lista: [1, 2, 3,],
        }"#;
        let value: Value = serde_json::from_str(&js_to_json(js)).unwrap();
        assert_eq!(
            value,
            json!({"dia": "Lunes 3", "farmacia": "D'Angelo", "nota": "dice \"hola\"", "lista": [1, 2, 3]})
        );
    }

    #[test]
    fn every_string_literal_is_closed() {
        assert_eq!(js_to_json(r#"['a', "b", `c`]"#), r#"["a", "b", "c"]"#);
        assert_eq!(js_to_json("{k: 'x'}"), r#"{"k": "x"}"#);
    }

    #[test]
    fn extracts_array_and_object_from_script() {
        let js = r#"
            import x from './x.js';
            const turnos = [
              { dia: "Lunes 2", farmacias: { "Zárate": ["Farmacia Sol"] } },
              { dia: "Martes 3", farmacias: { "Zárate": "Farmacia Luna" } }, // ]
            ];
            const farmacias = {
              "Zárate": [ { farmacia: "Farmacia Sol", "dirección": "Justa Lima 100" } ],
            };
            render(turnos, farmacias);
        "#;

        let turnos = extract_js_value(js, "turnos").unwrap();
        assert_eq!(turnos.as_array().unwrap().len(), 2);
        assert_eq!(turnos[1]["farmacias"]["Zárate"], "Farmacia Luna");

        let farmacias = extract_js_value(js, "farmacias").unwrap();
        assert_eq!(farmacias["Zárate"][0]["dirección"], "Justa Lima 100");
    }

    #[test]
    fn brackets_inside_strings_do_not_close_the_literal() {
        let js = r#"let x = ["a]b", 'c[d'];"#;
        assert_eq!(extract_js_value(js, "x").unwrap(), json!(["a]b", "c[d"]));
    }

    #[test]
    fn missing_or_unterminated_variable_is_an_error() {
        assert!(extract_js_value("const y = [];", "x").is_err());
        assert!(extract_js_value("const x = [1, 2", "x").is_err());
        assert!(extract_js_value("const x = 42;", "x").is_err());
    }
}
