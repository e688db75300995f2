//! C-style printf format decoder
//!
//! Parses `%[flags][width][.precision]type` specifiers and renders them
//! against values recovered from the GPU log buffer, following the C
//! conventions for padding, signs, alternate forms and precision.

use crate::utils::ShaderError;

/// One value recovered from a log record.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintfArg {
    Int(u32),
    Float(f32),
    Str(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub left: bool,
    pub plus: bool,
    pub space: bool,
    pub alternate: bool,
    pub zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub conversion: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatToken {
    Text(String),
    Spec(FormatSpec),
}

const CONVERSIONS: &str = "diuoxXfFeEgGcs";
const LENGTH_MODIFIERS: &str = "hlLzjtq";

/// Upper bound for a specifier's width and precision.
pub const MAX_FIELD_WIDTH: usize = 4096;

/// Tokenize a format string into literal text and conversion specifiers.
pub fn parse_format(format: &str) -> Result<Vec<FormatToken>, ShaderError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            text.push(c);
            continue;
        }

        let mut flags = Flags::default();
        while let Some(&f) = chars.peek() {
            match f {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '#' => flags.alternate = true,
                '0' => flags.zero = true,
                _ => break,
            }
            chars.next();
        }

        let width = take_number(&mut chars);
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            Some(take_number(&mut chars).unwrap_or(0))
        } else {
            None
        };
        while chars.peek().is_some_and(|c| LENGTH_MODIFIERS.contains(*c)) {
            chars.next();
        }
        if let Some(field) = width.into_iter().chain(precision).find(|n| *n > MAX_FIELD_WIDTH) {
            return Err(ShaderError::Format(format!(
                "Field width {} exceeds the maximum of {}",
                field, MAX_FIELD_WIDTH
            )));
        }

        match chars.next() {
            Some('%') => text.push('%'),
            Some(conversion) if CONVERSIONS.contains(conversion) => {
                if !text.is_empty() {
                    tokens.push(FormatToken::Text(std::mem::take(&mut text)));
                }
                tokens.push(FormatToken::Spec(FormatSpec {
                    flags,
                    width,
                    precision,
                    conversion,
                }));
            }
            Some(other) => {
                return Err(ShaderError::Format(format!("Unsupported specifier: {}", other)));
            }
            None => {
                return Err(ShaderError::Format(
                    "Unsupported specifier: format string ends inside a specifier".to_string(),
                ));
            }
        }
    }

    if !text.is_empty() {
        tokens.push(FormatToken::Text(text));
    }
    Ok(tokens)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    value
}

/// Render tokens against arguments. Specifiers past the last argument print `undef`.
pub fn format_tokens(tokens: &[FormatToken], args: &[PrintfArg]) -> String {
    let mut out = String::new();
    let mut next_arg = args.iter();

    for token in tokens {
        match token {
            FormatToken::Text(text) => out.push_str(text),
            FormatToken::Spec(spec) => match next_arg.next() {
                Some(arg) => out.push_str(&format_spec(spec, arg)),
                None => out.push_str(&pad("", "", "undef", spec, false)),
            },
        }
    }
    out
}

pub fn format_printf(format: &str, args: &[PrintfArg]) -> Result<String, ShaderError> {
    Ok(format_tokens(&parse_format(format)?, args))
}

impl PrintfArg {
    fn as_signed(&self) -> i64 {
        match self {
            PrintfArg::Int(v) => i64::from(*v as i32),
            PrintfArg::Float(f) => *f as i64,
            PrintfArg::Str(_) => 0,
        }
    }

    fn as_unsigned(&self) -> u64 {
        match self {
            PrintfArg::Int(v) => u64::from(*v),
            PrintfArg::Float(f) => u64::from(*f as i64 as u32),
            PrintfArg::Str(_) => 0,
        }
    }

    fn as_float(&self) -> f64 {
        match self {
            PrintfArg::Int(v) => f64::from(*v as i32),
            PrintfArg::Float(f) => f64::from(*f),
            PrintfArg::Str(_) => 0.0,
        }
    }

    fn as_text(&self) -> String {
        match self {
            PrintfArg::Int(v) => v.to_string(),
            PrintfArg::Float(f) => f.to_string(),
            PrintfArg::Str(s) => s.clone(),
        }
    }
}

fn format_spec(spec: &FormatSpec, arg: &PrintfArg) -> String {
    match spec.conversion {
        'd' | 'i' => {
            let value = arg.as_signed();
            let sign = sign_of(value < 0, &spec.flags);
            let body = with_min_digits(value.unsigned_abs().to_string(), spec.precision);
            pad(sign, "", &body, spec, spec.precision.is_none())
        }
        'u' => {
            let body = with_min_digits(arg.as_unsigned().to_string(), spec.precision);
            pad("", "", &body, spec, spec.precision.is_none())
        }
        'o' => {
            let mut body = with_min_digits(format!("{:o}", arg.as_unsigned()), spec.precision);
            if spec.flags.alternate && !body.starts_with('0') {
                body.insert(0, '0');
            }
            pad("", "", &body, spec, spec.precision.is_none())
        }
        'x' | 'X' => {
            let value = arg.as_unsigned();
            let mut body = with_min_digits(format!("{:x}", value), spec.precision);
            let mut prefix = if spec.flags.alternate && value != 0 { "0x" } else { "" };
            if spec.conversion == 'X' {
                body = body.to_uppercase();
                prefix = if prefix.is_empty() { "" } else { "0X" };
            }
            pad("", prefix, &body, spec, spec.precision.is_none())
        }
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => format_float(spec, arg.as_float()),
        'c' => {
            let c = match arg {
                PrintfArg::Str(s) => s.chars().next().unwrap_or('\0'),
                other => char::from_u32(other.as_unsigned() as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
            };
            pad("", "", &c.to_string(), spec, false)
        }
        's' => {
            let text = arg.as_text();
            let text: String = match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            pad("", "", &text, spec, false)
        }
        _ => String::new(),
    }
}

fn sign_of(negative: bool, flags: &Flags) -> &'static str {
    if negative {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    }
}

/// Integer precision: minimum digit count, and `.0` prints nothing for zero.
fn with_min_digits(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(0) if digits == "0" => String::new(),
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

fn pad(sign: &str, prefix: &str, body: &str, spec: &FormatSpec, zero_allowed: bool) -> String {
    let len = sign.len() + prefix.len() + body.chars().count();
    let width = spec.width.unwrap_or(0);
    if width <= len {
        return format!("{}{}{}", sign, prefix, body);
    }
    let fill = width - len;
    if spec.flags.left {
        format!("{}{}{}{}", sign, prefix, body, " ".repeat(fill))
    } else if spec.flags.zero && zero_allowed {
        format!("{}{}{}{}", sign, prefix, "0".repeat(fill), body)
    } else {
        format!("{}{}{}{}", " ".repeat(fill), sign, prefix, body)
    }
}

fn format_float(spec: &FormatSpec, value: f64) -> String {
    let upper = spec.conversion.is_ascii_uppercase();
    let sign = sign_of(value.is_sign_negative() && !value.is_nan(), &spec.flags);

    if !value.is_finite() {
        let body = if value.is_nan() { "nan" } else { "inf" };
        let body = if upper { body.to_uppercase() } else { body.to_string() };
        return pad(sign, "", &body, spec, false);
    }

    let magnitude = value.abs();
    let precision = spec.precision.unwrap_or(6);
    let body = match spec.conversion.to_ascii_lowercase() {
        'f' => fixed(magnitude, precision, spec.flags.alternate),
        'e' => exponential(magnitude, precision, spec.flags.alternate),
        _ => general(magnitude, precision, spec.flags.alternate),
    };
    let body = if upper { body.to_uppercase() } else { body };
    pad(sign, "", &body, spec, true)
}

fn fixed(magnitude: f64, precision: usize, alternate: bool) -> String {
    let mut s = format!("{:.*}", precision, magnitude);
    if alternate && precision == 0 {
        s.push('.');
    }
    s
}

/// `d.ddde±XX` with at least two exponent digits.
fn exponential(magnitude: f64, precision: usize, alternate: bool) -> String {
    let (mantissa, exponent) = split_exponent(magnitude, precision);
    let mut mantissa = mantissa;
    if alternate && precision == 0 {
        mantissa.push('.');
    }
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, exp_sign, exponent.unsigned_abs())
}

fn split_exponent(magnitude: f64, precision: usize) -> (String, i32) {
    let formatted = format!("{:.*e}", precision, magnitude);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (formatted, 0),
    }
}

/// `%g`: shortest of `%e`/`%f` per the C rules, trailing zeros removed unless `#`.
fn general(magnitude: f64, precision: usize, alternate: bool) -> String {
    let p = precision.max(1);
    let exponent = if magnitude == 0.0 {
        0
    } else {
        split_exponent(magnitude, p - 1).1
    };

    let body = if exponent < -4 || exponent >= p as i32 {
        exponential(magnitude, p - 1, alternate)
    } else {
        fixed(magnitude, (p as i32 - 1 - exponent) as usize, alternate)
    };

    if alternate {
        return body;
    }
    match body.split_once('e') {
        Some((mantissa, exp)) => format!("{}e{}", strip_fraction_zeros(mantissa), exp),
        None => strip_fraction_zeros(&body).to_string(),
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(format: &str, args: &[PrintfArg]) -> String {
        format_printf(format, args).unwrap()
    }

    fn int(v: i32) -> PrintfArg {
        PrintfArg::Int(v as u32)
    }

    #[test]
    fn test_width_and_precision_float() {
        assert_eq!(f("Value: %5.2f!", &[PrintfArg::Float(3.14159)]), "Value:  3.14!");
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(f("%d", &[int(-42)]), "-42");
        assert_eq!(f("%i|%u", &[int(7), PrintfArg::Int(4_294_967_295)]), "7|4294967295");
        assert_eq!(f("%x %X %#x", &[int(255), int(255), int(255)]), "ff FF 0xff");
        assert_eq!(f("%o %#o", &[int(8), int(8)]), "10 010");
    }

    #[test]
    fn test_integer_flags() {
        assert_eq!(f("[%05d]", &[int(-42)]), "[-0042]");
        assert_eq!(f("[%-5d]", &[int(42)]), "[42   ]");
        assert_eq!(f("[%+d] [% d]", &[int(5), int(5)]), "[+5] [ 5]");
        assert_eq!(f("[%.3d]", &[int(7)]), "[007]");
        assert_eq!(f("[%08.3d]", &[int(7)]), "[     007]");
        assert_eq!(f("[%.0d]", &[int(0)]), "[]");
    }

    #[test]
    fn test_exponential() {
        assert_eq!(f("%e", &[PrintfArg::Float(1234.5)]), "1.234500e+03");
        assert_eq!(f("%.2E", &[PrintfArg::Float(0.000123)]), "1.23E-04");
        assert_eq!(f("%e", &[PrintfArg::Float(0.0)]), "0.000000e+00");
    }

    #[test]
    fn test_general() {
        assert_eq!(f("%g", &[PrintfArg::Float(100000.0)]), "100000");
        assert_eq!(f("%g", &[PrintfArg::Float(1000000.0)]), "1e+06");
        assert_eq!(f("%g", &[PrintfArg::Float(0.5)]), "0.5");
        assert_eq!(f("%g", &[PrintfArg::Float(0.0001)]), "0.0001");
        assert_eq!(f("%G", &[PrintfArg::Float(0.00001)]), "1E-05");
        assert_eq!(f("%.3g", &[PrintfArg::Float(3.14159)]), "3.14");
    }

    #[test]
    fn test_strings_and_chars() {
        let hello = PrintfArg::Str("Hello, world".into());
        assert_eq!(f("%.5s!", &[hello.clone()]), "Hello!");
        assert_eq!(f("[%8s]", &[PrintfArg::Str("ab".into())]), "[      ab]");
        assert_eq!(f("[%-4s]", &[PrintfArg::Str("ab".into())]), "[ab  ]");
        assert_eq!(f("%c", &[int(65)]), "A");
    }

    #[test]
    fn test_percent_consumes_no_argument() {
        assert_eq!(f("100%% %d", &[int(3)]), "100% 3");
    }

    #[test]
    fn test_missing_arguments_render_undef() {
        assert_eq!(f("a=%d b=%d", &[int(1)]), "a=1 b=undef");
    }

    #[test]
    fn test_negative_and_special_floats() {
        assert_eq!(f("%.1f", &[PrintfArg::Float(-2.25)]), "-2.2");
        assert_eq!(f("%+.1f", &[PrintfArg::Float(2.0)]), "+2.0");
        assert_eq!(f("%f", &[PrintfArg::Float(f32::INFINITY)]), "inf");
        assert_eq!(f("%F", &[PrintfArg::Float(f32::NAN)]), "NAN");
        assert_eq!(f("[%07.2f]", &[PrintfArg::Float(-1.5)]), "[-001.50]");
    }

    #[test]
    fn test_length_modifiers_are_skipped() {
        assert_eq!(f("%lu %lld", &[int(3), int(-3)]), "3 -3");
    }

    #[test]
    fn test_unknown_specifier_names_letter() {
        let err = format_printf("bad %q here", &[]).unwrap_err();
        assert_eq!(err, ShaderError::Format("Unsupported specifier: q".into()));
        assert!(format_printf("dangling %", &[]).is_err());
    }

    #[test]
    fn test_huge_field_width_is_rejected() {
        let err = format_printf("%1000000000000d", &[PrintfArg::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            ShaderError::Format("Field width 1000000000000 exceeds the maximum of 4096".into())
        );
        assert!(format_printf("%.99999f", &[PrintfArg::Float(1.0)]).is_err());

        let padded = format_printf("%4096d", &[PrintfArg::Int(7)]).unwrap();
        assert_eq!(padded.len(), MAX_FIELD_WIDTH);
    }

    #[test]
    fn test_tokens() {
        let tokens = parse_format("x=%-08.3f;").unwrap();
        assert_eq!(tokens.len(), 3);
        match &tokens[1] {
            FormatToken::Spec(spec) => {
                assert!(spec.flags.left && spec.flags.zero);
                assert_eq!(spec.width, Some(8));
                assert_eq!(spec.precision, Some(3));
                assert_eq!(spec.conversion, 'f');
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
