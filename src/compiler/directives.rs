//! Source preprocessing for the WGSL dialect
//!
//! WGSL has no user attributes and no string literals, so the playground
//! extensions ride on comments and a pseudo-call:
//!
//! ```wgsl
//! //! playground_RAND(1024)
//! @group(0) @binding(3) var<storage, read_write> noise: array<f32>;
//!
//! print_begin(getStringHash("x = %d\n"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::playground::reflection::{AttributeArgument, UserAttribute};
use crate::utils::playground_constants::DIRECTIVE_PREFIX;

/// Declaration a directive block is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectiveTarget {
    Global(String),
    Member(String),
    Function(String),
}

pub type Directives = HashMap<DirectiveTarget, Vec<UserAttribute>>;

const DIRECTIVE_COMMENT: &str = "//!";

fn declaration_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"\bvar(?:\s*<[^>]*>)?\s+([A-Za-z_][A-Za-z0-9_]*)").expect("var pattern"),
            Regex::new(r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)").expect("fn pattern"),
            Regex::new(r"^\s*(?:@[^:]*\s)?([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("member pattern"),
        )
    })
}

/// Collect `//! playground_*` comment blocks and attach each to the next declaration.
pub fn extract_directives(source: &str) -> Result<Directives, String> {
    let (var_re, fn_re, member_re) = declaration_regexes();
    let mut directives = Directives::new();
    let mut pending: Vec<UserAttribute> = Vec::new();
    let mut struct_depth = 0usize;

    for (line_no, raw) in source.lines().enumerate() {
        let line = raw.trim();

        if let Some(body) = line.strip_prefix(DIRECTIVE_COMMENT) {
            let body = body.trim();
            if body.starts_with(DIRECTIVE_PREFIX) {
                let attribute = parse_directive(body)
                    .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                pending.push(attribute);
            }
            continue;
        }

        let code = line.split("//").next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }

        if !pending.is_empty() {
            let target = if let Some(c) = fn_re.captures(code) {
                Some(DirectiveTarget::Function(c[1].to_string()))
            } else if let Some(c) = var_re.captures(code) {
                Some(DirectiveTarget::Global(c[1].to_string()))
            } else if struct_depth > 0 {
                member_re
                    .captures(code)
                    .map(|c| DirectiveTarget::Member(c[1].to_string()))
            } else {
                None
            };

            match target {
                Some(target) => directives
                    .entry(target)
                    .or_default()
                    .append(&mut pending),
                // attribute-only lines such as `@compute @workgroup_size(64)`
                None if code.starts_with('@') => {}
                None => {
                    return Err(format!(
                        "line {}: {} is not followed by a variable, struct member or function",
                        line_no + 1,
                        pending[0].name
                    ))
                }
            }
        }

        if code.starts_with("struct ") && code.contains('{') {
            struct_depth += 1;
        }
        if struct_depth > 0 && code.contains('}') {
            struct_depth -= 1;
        }
    }

    if let Some(dangling) = pending.first() {
        return Err(format!("{} is not attached to any declaration", dangling.name));
    }
    Ok(directives)
}

/// Parse `playground_NAME` or `playground_NAME(arg, ...)`.
fn parse_directive(body: &str) -> Result<UserAttribute, String> {
    let (name, rest) = match body.find('(') {
        Some(open) => (&body[..open], Some(&body[open + 1..])),
        None => (body, None),
    };
    let name = name.trim();
    if name.len() <= DIRECTIVE_PREFIX.len() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("malformed directive '{}'", body));
    }

    let arguments = match rest {
        None => Vec::new(),
        Some(rest) => {
            let close = rest
                .rfind(')')
                .ok_or_else(|| format!("unterminated argument list in '{}'", body))?;
            split_arguments(&rest[..close])?
                .into_iter()
                .map(|arg| parse_argument(&arg))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(UserAttribute {
        name: name.to_string(),
        arguments,
    })
}

fn split_arguments(list: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in list.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            ',' => args.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_string {
        return Err(format!("unterminated string in '({})'", list));
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current);
    }
    Ok(args.into_iter().map(|a| a.trim().to_string()).collect())
}

fn parse_argument(arg: &str) -> Result<AttributeArgument, String> {
    if let Some(quoted) = arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')) {
        return Ok(AttributeArgument::String(unescape(quoted)));
    }
    if arg.is_empty() {
        return Err("empty directive argument".to_string());
    }
    match arg.parse::<f64>() {
        Ok(n) => Ok(AttributeArgument::Number(n)),
        Err(_) => Ok(AttributeArgument::String(arg.to_string())),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// 32-bit FNV-1a.
pub fn string_hash(s: &str) -> u32 {
    s.bytes().fold(0x811c_9dc5u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

/// Replace `getStringHash("...")` with its hash literal and record the strings.
pub fn replace_string_hashes(source: &str) -> (String, BTreeMap<u32, String>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"getStringHash\s*\(\s*"((?:[^"\\]|\\.)*)"\s*\)"#).expect("hash pattern")
    });

    let mut hashed = BTreeMap::new();
    let replaced = re.replace_all(source, |caps: &regex::Captures<'_>| {
        let text = unescape(&caps[1]);
        let hash = string_hash(&text);
        if let Some(previous) = hashed.insert(hash, text.clone()) {
            if previous != text {
                log::warn!("[Compiler] Hash collision between {:?} and {:?}", previous, text);
            }
        }
        format!("0x{:08x}u", hash)
    });

    (replaced.into_owned(), hashed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs<'a>(d: &'a Directives, target: DirectiveTarget) -> &'a [UserAttribute] {
        d.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    #[test]
    fn test_directives_attach_to_next_declaration() {
        let src = r#"
struct Params {
    time: f32,
    //! playground_SLIDER(0.5, 0.0, 1.0)
    radius: f32,
}

//! playground_RAND(1024)
@group(0) @binding(3) var<storage, read_write> noise: array<f32>;

//! playground_CALL_SIZE_OF("noise")
//! playground_CALL_ONCE
@compute @workgroup_size(64)
fn step(@builtin(global_invocation_id) id: vec3<u32>) {}
"#;
        let d = extract_directives(src).unwrap();

        let slider = attrs(&d, DirectiveTarget::Member("radius".into()));
        assert_eq!(slider[0].name, "playground_SLIDER");
        assert_eq!(slider[0].numbers(), vec![0.5, 0.0, 1.0]);

        let rand = attrs(&d, DirectiveTarget::Global("noise".into()));
        assert_eq!(rand[0].number(0), Some(1024.0));

        let calls = attrs(&d, DirectiveTarget::Function("step".into()));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].string(0), Some("noise"));
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn test_plain_doc_comments_are_ignored() {
        let d = extract_directives("//! just a note\nvar<private> x: f32;\n").unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn test_dangling_directive_is_an_error() {
        let err = extract_directives("var<private> x: f32;\n//! playground_ZEROS(4)\n").unwrap_err();
        assert!(err.contains("playground_ZEROS"));
    }

    #[test]
    fn test_directive_before_statement_is_an_error() {
        let err = extract_directives("//! playground_ZEROS(4)\nconst K = 4;\n").unwrap_err();
        assert!(err.contains("line 2"));
    }

    #[test]
    fn test_url_argument_with_commas() {
        let attr = parse_directive(r#"playground_URL("https://example.com/a,b.png")"#).unwrap();
        assert_eq!(attr.string(0), Some("https://example.com/a,b.png"));
    }

    #[test]
    fn test_malformed_directive() {
        assert!(parse_directive("playground_(1)").is_err());
        assert!(parse_directive("playground_ZEROS(1, 2").is_err());
        assert!(parse_directive(r#"playground_URL("abc)"#).is_err());
    }

    #[test]
    fn test_string_hash_is_fnv1a() {
        assert_eq!(string_hash(""), 0x811c_9dc5);
        assert_eq!(string_hash("a"), 0xe40c_292c);
    }

    #[test]
    fn test_replace_string_hashes() {
        let (out, table) = replace_string_hashes(r#"print_begin(getStringHash("v=%d\n"));"#);
        let hash = string_hash("v=%d\n");
        assert_eq!(out, format!("print_begin(0x{:08x}u);", hash));
        assert_eq!(table.get(&hash).map(String::as_str), Some("v=%d\n"));
    }
}
