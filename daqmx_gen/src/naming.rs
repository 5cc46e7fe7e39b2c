/* Identifier conventions shared by the surface and every emitter */

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
    "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
    "super", "trait", "true", "type", "unsafe", "use", "where", "while", "async", "await", "dyn", "abstract",
    "become", "box", "do", "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
    "gen",
];

/// `WriteAnalogF64` -> `write_analog_f64`, `CreateAIVoltageChan` -> `create_ai_voltage_chan`.
/// `UInt` is one word: `GetSystemInfoAttributeUInt32` -> `get_system_info_attribute_uint32`.
pub fn snake_case(name: &str) -> String {
    let normalized = name.replace("UInt", "Uint");
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = String::with_capacity(chars.len() + 8);

    for (idx, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            let prev = if idx > 0 { Some(chars[idx - 1]) } else { None };
            let next = chars.get(idx + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.map(|n| n.is_ascii_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }

    out
}

/// `powerUpStates` -> `PowerUpStates`
pub fn upper_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn escape_rust_keyword(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// Rust identifier for a catalog name.
pub fn rust_ident(name: &str) -> String {
    escape_rust_keyword(&snake_case(name))
}

/// `DAQmxEveryNSamplesEventCallbackPtr` -> `EveryNSamplesEvent`
pub fn callback_stem(token: &str, prefix: &str) -> String {
    let stem = token.strip_prefix(prefix).unwrap_or(token);
    stem.strip_suffix("CallbackPtr").unwrap_or(stem).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_keeps_acronyms_and_uint_together() {
        assert_eq!(snake_case("WriteAnalogF64"), "write_analog_f64");
        assert_eq!(snake_case("CreateAIVoltageChan"), "create_ai_voltage_chan");
        assert_eq!(snake_case("GetSystemInfoAttributeUInt32"), "get_system_info_attribute_uint32");
        assert_eq!(snake_case("everyNSamplesEventType"), "every_n_samples_event_type");
        assert_eq!(snake_case("nSamples"), "n_samples");
        assert_eq!(snake_case("ReadBinaryU16"), "read_binary_u16");
        assert_eq!(snake_case("task"), "task");
    }

    #[test]
    fn keywords_are_raw_identifiers() {
        assert_eq!(rust_ident("type"), "r#type");
        assert_eq!(rust_ident("value"), "value");
    }

    #[test]
    fn callback_stem_strips_prefix_and_suffix() {
        assert_eq!(callback_stem("DAQmxEveryNSamplesEventCallbackPtr", "DAQmx"), "EveryNSamplesEvent");
        assert_eq!(upper_camel("powerUpStates"), "PowerUpStates");
    }
}
