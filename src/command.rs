//! Declarative command table, parameter validation, tokenizing and alias
//! expansion (spec.md §4.2, §3 `CommandDescriptor`/`ParameterSpec`/`CommandCall`).

use crate::error::ValidationError;
use std::collections::BTreeMap;

/// What kind of value a parameter holds, and therefore how a token for it
/// is parsed and how its bounds are interpreted (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    UnsignedInt,
    SignedInt,
    Float,
    /// A single whitespace-delimited token.
    Word,
    /// The remainder of the line, verbatim, with one leading run of
    /// whitespace stripped.
    RawTail,
}

impl ParamKind {
    fn name(self) -> &'static str {
        match self {
            ParamKind::UnsignedInt => "unsigned int",
            ParamKind::SignedInt => "signed int",
            ParamKind::Float => "float",
            ParamKind::Word => "word",
            ParamKind::RawTail => "string",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    pub kind: ParamKind,
    pub required: bool,
    /// Integer radix; 0 means auto-detect (`0x`/`0X` prefix -> hex, else decimal).
    pub base: u32,
    /// Numeric value for numbers, string length for `Word`/`RawTail`.
    pub lower_bound: Option<i64>,
    pub upper_bound: Option<i64>,
    pub description: &'static str,
}

impl ParameterSpec {
    pub const fn required_uint(description: &'static str) -> Self {
        Self {
            kind: ParamKind::UnsignedInt,
            required: true,
            base: 0,
            lower_bound: None,
            upper_bound: None,
            description,
        }
    }

    pub const fn with_bounds(mut self, lower: Option<i64>, upper: Option<i64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub const fn word(description: &'static str) -> Self {
        Self {
            kind: ParamKind::Word,
            required: true,
            base: 0,
            lower_bound: None,
            upper_bound: None,
            description,
        }
    }

    pub const fn signed(description: &'static str) -> Self {
        Self {
            kind: ParamKind::SignedInt,
            required: true,
            base: 0,
            lower_bound: None,
            upper_bound: None,
            description,
        }
    }

    pub const fn raw_tail(description: &'static str) -> Self {
        Self {
            kind: ParamKind::RawTail,
            required: true,
            base: 0,
            lower_bound: None,
            upper_bound: None,
            description,
        }
    }
}

/// A parsed parameter value, tagged by the kind that produced it
/// (design note: tagged variant instead of an untyped `void*`/union).
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    UInt(u64),
    Int(i64),
    Float(f64),
    Word(String),
    Raw(String),
}

/// One fully-parsed and validated invocation, ready for a handler.
pub struct CommandCall {
    pub origin: crate::transport::Origin,
    pub mtu: usize,
    pub oob: Vec<u8>,
    pub parameters: Vec<Option<ParsedValue>>,
    pub result: String,
    pub result_oob: Vec<u8>,
}

impl CommandCall {
    pub fn uint(&self, i: usize) -> u64 {
        match &self.parameters[i] {
            Some(ParsedValue::UInt(v)) => *v,
            other => panic!("parameter {i} is not an unsigned int: {other:?}"),
        }
    }

    pub fn int(&self, i: usize) -> i64 {
        match &self.parameters[i] {
            Some(ParsedValue::Int(v)) => *v,
            other => panic!("parameter {i} is not a signed int: {other:?}"),
        }
    }

    pub fn float(&self, i: usize) -> f64 {
        match &self.parameters[i] {
            Some(ParsedValue::Float(v)) => *v,
            other => panic!("parameter {i} is not a float: {other:?}"),
        }
    }

    pub fn word(&self, i: usize) -> &str {
        match &self.parameters[i] {
            Some(ParsedValue::Word(v)) => v.as_str(),
            other => panic!("parameter {i} is not a word: {other:?}"),
        }
    }

    pub fn raw(&self, i: usize) -> &str {
        match &self.parameters[i] {
            Some(ParsedValue::Raw(v)) => v.as_str(),
            other => panic!("parameter {i} is not a raw tail: {other:?}"),
        }
    }

    pub fn uint_opt(&self, i: usize) -> Option<u64> {
        match &self.parameters[i] {
            Some(ParsedValue::UInt(v)) => Some(*v),
            None => None,
            other => panic!("parameter {i} is not an unsigned int: {other:?}"),
        }
    }

    pub fn word_opt(&self, i: usize) -> Option<&str> {
        match &self.parameters[i] {
            Some(ParsedValue::Word(v)) => Some(v.as_str()),
            None => None,
            other => panic!("parameter {i} is not a word: {other:?}"),
        }
    }

    pub fn raw_opt(&self, i: usize) -> Option<&str> {
        match &self.parameters[i] {
            Some(ParsedValue::Raw(v)) => Some(v.as_str()),
            None => None,
            other => panic!("parameter {i} is not a raw tail: {other:?}"),
        }
    }
}

pub struct CommandDescriptor {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub help: &'static str,
    pub parameters: &'static [ParameterSpec],
    pub function: fn(&crate::system::System, &mut CommandCall) -> Result<(), crate::error::CommandError>,
}

pub struct CommandTable {
    pub commands: &'static [CommandDescriptor],
}

impl CommandTable {
    pub fn resolve(&self, name: &str) -> Option<&'static CommandDescriptor> {
        self.commands
            .iter()
            .find(|c| c.name == name || c.alias == Some(name))
    }
}

/// Runtime user-defined text substitutions, registered by the `alias`
/// command (spec.md §4.2 step 2) — distinct from `CommandDescriptor::alias`,
/// which is a compile-time alternate name for a single command.
#[derive(Default)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, substitution: &str) {
        self.entries.insert(name.to_string(), substitution.to_string());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    /// If `line`'s first whitespace-delimited word is a recorded alias,
    /// returns the line with that word replaced by the stored substitution.
    pub fn expand(&self, line: &str) -> String {
        let trimmed = line.trim_start();
        let first_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (first, rest) = trimmed.split_at(first_end);
        match self.get(first) {
            Some(substitution) => format!("{substitution}{rest}"),
            None => line.to_string(),
        }
    }
}

/// Cursor-based tokenizer that understands `RawTail` swallowing the rest of
/// the line verbatim — a plain `split_whitespace()` can't express that.
struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn next_word(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (word, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(word)
    }

    /// Strips one leading run of whitespace and returns everything after it,
    /// consuming the rest of the tokenizer.
    fn take_raw_tail(&mut self) -> &'a str {
        let trimmed = self.rest.trim_start();
        self.rest = "";
        trimmed
    }

    fn is_exhausted(&self) -> bool {
        self.rest.trim_start().is_empty()
    }
}

fn parse_uint(token: &str, base: u32) -> Option<u64> {
    if base == 0 {
        if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            return u64::from_str_radix(hex, 16).ok();
        }
        token.parse::<u64>().ok()
    } else {
        u64::from_str_radix(token, base).ok()
    }
}

fn parse_int(token: &str, base: u32) -> Option<i64> {
    if base == 0 {
        if let Some(rest) = token.strip_prefix('-') {
            if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
                return i64::from_str_radix(hex, 16).ok().map(|v| -v);
            }
            return token.parse::<i64>().ok();
        }
        if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16).ok();
        }
        token.parse::<i64>().ok()
    } else {
        i64::from_str_radix(token, base).ok()
    }
}

fn bound_err(
    kind: ParamKind,
    value: impl core::fmt::Display,
    bound: i64,
    below: bool,
) -> ValidationError {
    let mut v = heapless::String::new();
    let _ = core::fmt::write(&mut v, format_args!("{value}"));
    let mut b = heapless::String::new();
    let _ = core::fmt::write(&mut b, format_args!("{bound}"));
    if below {
        ValidationError::BelowLowerBound { kind: kind.name(), value: v, bound: b }
    } else {
        ValidationError::AboveUpperBound { kind: kind.name(), value: v, bound: b }
    }
}

fn parse_and_validate(
    spec: &ParameterSpec,
    token: &str,
) -> Result<ParsedValue, ValidationError> {
    let malformed = || {
        let mut v = heapless::String::new();
        let _ = core::fmt::write(&mut v, format_args!("{token}"));
        ValidationError::Malformed { kind: spec.kind.name(), value: v }
    };

    match spec.kind {
        ParamKind::UnsignedInt => {
            let value = parse_uint(token, spec.base).ok_or_else(malformed)?;
            if let Some(lower) = spec.lower_bound {
                if (value as i64) < lower {
                    return Err(bound_err(spec.kind, value, lower, true));
                }
            }
            if let Some(upper) = spec.upper_bound {
                if (value as i64) > upper {
                    return Err(bound_err(spec.kind, value, upper, false));
                }
            }
            Ok(ParsedValue::UInt(value))
        }
        ParamKind::SignedInt => {
            let value = parse_int(token, spec.base).ok_or_else(malformed)?;
            if let Some(lower) = spec.lower_bound {
                if value < lower {
                    return Err(bound_err(spec.kind, value, lower, true));
                }
            }
            if let Some(upper) = spec.upper_bound {
                if value > upper {
                    return Err(bound_err(spec.kind, value, upper, false));
                }
            }
            Ok(ParsedValue::Int(value))
        }
        ParamKind::Float => {
            let value: f64 = token.parse().map_err(|_| malformed())?;
            if let Some(lower) = spec.lower_bound {
                if value < lower as f64 {
                    return Err(bound_err(spec.kind, value, lower, true));
                }
            }
            if let Some(upper) = spec.upper_bound {
                if value > upper as f64 {
                    return Err(bound_err(spec.kind, value, upper, false));
                }
            }
            Ok(ParsedValue::Float(value))
        }
        ParamKind::Word => {
            if let Some(lower) = spec.lower_bound {
                if (token.len() as i64) < lower {
                    return Err(bound_err(spec.kind, token.len(), lower, true));
                }
            }
            if let Some(upper) = spec.upper_bound {
                if (token.len() as i64) > upper {
                    return Err(bound_err(spec.kind, token.len(), upper, false));
                }
            }
            Ok(ParsedValue::Word(token.to_string()))
        }
        ParamKind::RawTail => {
            if let Some(lower) = spec.lower_bound {
                if (token.len() as i64) < lower {
                    return Err(bound_err(spec.kind, token.len(), lower, true));
                }
            }
            if let Some(upper) = spec.upper_bound {
                if (token.len() as i64) > upper {
                    return Err(bound_err(spec.kind, token.len(), upper, false));
                }
            }
            Ok(ParsedValue::Raw(token.to_string()))
        }
    }
}

/// Tokenizes `rest` (the line with the command name already stripped)
/// against `parameters`, yielding one `Option<ParsedValue>` per declared
/// parameter, or a `ValidationError` on the first problem encountered —
/// spec.md §4.2 steps 3/5/6.
pub fn parse_parameters(
    rest: &str,
    parameters: &[ParameterSpec],
) -> Result<Vec<Option<ParsedValue>>, ValidationError> {
    let mut tokenizer = Tokenizer::new(rest);
    let mut values = Vec::with_capacity(parameters.len());

    for (i, spec) in parameters.iter().enumerate() {
        let token = if spec.kind == ParamKind::RawTail {
            let tail = tokenizer.take_raw_tail();
            if tail.is_empty() { None } else { Some(tail) }
        } else {
            tokenizer.next_word()
        };

        match token {
            Some(t) => values.push(Some(parse_and_validate(spec, t)?)),
            None if spec.required => return Err(ValidationError::MissingParameter(i)),
            None => values.push(None),
        }
    }

    if !tokenizer.is_exhausted() {
        return Err(ValidationError::TooManyParameters);
    }

    Ok(values)
}

/// Splits a command line into `(command_name, rest_of_line)`.
pub fn split_command_name(line: &str) -> (&str, &str) {
    let trimmed = line.trim_start();
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    trimmed.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command_name_separates_first_word() {
        let (name, rest) = split_command_name("hostname test-host A_Board");
        assert_eq!(name, "hostname");
        assert_eq!(rest, " test-host A_Board");
    }

    #[test]
    fn split_command_name_handles_bare_command() {
        let (name, rest) = split_command_name("help");
        assert_eq!(name, "help");
        assert_eq!(rest, "");
    }

    #[test]
    fn parse_parameters_required_missing_errors() {
        let specs = [ParameterSpec::required_uint("n")];
        let err = parse_parameters("", &specs).unwrap_err();
        assert_eq!(err, ValidationError::MissingParameter(0));
    }

    #[test]
    fn parse_parameters_too_many_errors() {
        let specs = [ParameterSpec::word("only one")];
        let err = parse_parameters(" one two", &specs).unwrap_err();
        assert_eq!(err, ValidationError::TooManyParameters);
    }

    #[test]
    fn parse_parameters_bounds_checked() {
        let specs = [ParameterSpec::required_uint("pct").with_bounds(Some(0), Some(100))];
        assert!(parse_parameters(" 50", &specs).is_ok());
        assert!(matches!(
            parse_parameters(" 101", &specs).unwrap_err(),
            ValidationError::AboveUpperBound { .. }
        ));
    }

    #[test]
    fn parse_parameters_lower_bound_violation() {
        let specs = [ParameterSpec::required_uint("pct").with_bounds(Some(10), None)];
        assert!(matches!(
            parse_parameters(" 1", &specs).unwrap_err(),
            ValidationError::BelowLowerBound { .. }
        ));
    }

    #[test]
    fn raw_tail_swallows_remainder_with_one_leading_whitespace_run_stripped() {
        let specs = [ParameterSpec::raw_tail("text")];
        let values = parse_parameters("   hello   world  ", &specs).unwrap();
        assert_eq!(values[0], Some(ParsedValue::Raw("hello   world  ".to_string())));
    }

    #[test]
    fn optional_parameter_absent_is_none() {
        let specs = [ParameterSpec::word("name").optional()];
        let values = parse_parameters("", &specs).unwrap();
        assert_eq!(values[0], None);
    }

    #[test]
    fn auto_base_detects_hex_prefix() {
        let specs = [ParameterSpec::required_uint("addr")];
        let values = parse_parameters(" 0x70", &specs).unwrap();
        assert_eq!(values[0], Some(ParsedValue::UInt(0x70)));
    }

    #[test]
    fn alias_table_expands_first_word_only() {
        let mut aliases = AliasTable::new();
        aliases.set("ll", "sensor-dump all");
        assert_eq!(aliases.expand("ll"), "sensor-dump all");
        assert_eq!(aliases.expand("ll extra"), "sensor-dump all extra");
        assert_eq!(aliases.expand("unrelated ll"), "unrelated ll");
    }

    #[test]
    fn alias_table_remove() {
        let mut aliases = AliasTable::new();
        aliases.set("x", "y");
        assert!(aliases.remove("x"));
        assert!(!aliases.remove("x"));
        assert_eq!(aliases.expand("x"), "x");
    }
}
