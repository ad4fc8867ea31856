//! Canonical text encoding.
//!
//! The output is what snapshots store, so it must stay byte-stable:
//!
//! - `null`, `true`, `false`
//! - integers in decimal; floats as C `%.17g`; non-finite floats as `null`
//! - strings double-quoted with JSON escapes, `\u00xx` for other control
//!   characters, everything else verbatim
//! - arrays `[a, b]`
//! - objects `{"k".v, "k2".v2}`: the key/value separator is `.` so an
//!   encoded value never needs the snapshot line delimiter `:`

use super::{Number, Value};

const HEX: &[u8; 16] = b"0123456789abcdef";

impl Value {
    /// Canonical text form.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }

    /// Append the canonical text form to `out`.
    pub fn encode_into(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Number(Number::Int(i)) => out.push_str(&i.to_string()),
            Value::Number(Number::Float(f)) => encode_float(*f, out),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::String(s) => encode_str(s, out),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.encode_into(out);
                }
                out.push(']');
            }
            Value::Object(fields) => {
                out.push('{');
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    encode_str(key, out);
                    out.push('.');
                    value.encode_into(out);
                }
                out.push('}');
            }
        }
    }
}

fn encode_str(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) <= 0x1f => {
                let code = c as usize;
                out.push_str("\\u00");
                out.push(HEX[code >> 4] as char);
                out.push(HEX[code & 0xf] as char);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// 17 significant digits, trailing zeros dropped; scientific notation when
/// the decimal exponent is below -4 or at least 17.
fn encode_float(f: f64, out: &mut String) {
    const PRECISION: i32 = 17;

    if !f.is_finite() {
        out.push_str("null");
        return;
    }

    let sci = format!("{:.*e}", (PRECISION - 1) as usize, f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        out.push_str(trim_fraction(mantissa));
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        let digits = exp.unsigned_abs();
        if digits < 10 {
            out.push('0');
        }
        out.push_str(&digits.to_string());
    } else {
        let fixed = format!("{:.*}", (PRECISION - 1 - exp) as usize, f);
        out.push_str(trim_fraction(&fixed));
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
