//! Typed flags and the factory that picks one for a parameter type.
//!
//! Decoding happens in two phases. While arguments are parsed, every integer
//! kind goes through one signed (`i64`) or unsigned (`u64`) parser and every
//! float kind through the `f64` parser. Only when the value is retrieved is
//! it narrowed to the parameter's width, and a value that does not fit is an
//! [`Error::ValueOutOfRange`] rather than a truncation.

use crate::custom::{CustomFlagRegistry, CustomHandler};
use crate::error::{Error, Result};
use crate::handler::ParamType;
use clap::{Arg, ArgAction, ArgMatches};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// A decoded value on its way to the function, boxed as its concrete type.
pub type FlagValue = Box<dyn Any + Send>;

/// Builds a flag of one fixed type, given the flag name.
pub type FlagConstructor = Box<dyn Fn(&str) -> FlagSpec + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    Native,
    W8,
    W16,
    W32,
    W64,
}

/// What a flag holds, without the custom handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKind {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float32,
    Float64,
    String,
    Custom,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlagKind::Bool => "bool",
            FlagKind::Int(IntWidth::Native) => "isize",
            FlagKind::Int(IntWidth::W8) => "i8",
            FlagKind::Int(IntWidth::W16) => "i16",
            FlagKind::Int(IntWidth::W32) => "i32",
            FlagKind::Int(IntWidth::W64) => "i64",
            FlagKind::Uint(IntWidth::Native) => "usize",
            FlagKind::Uint(IntWidth::W8) => "u8",
            FlagKind::Uint(IntWidth::W16) => "u16",
            FlagKind::Uint(IntWidth::W32) => "u32",
            FlagKind::Uint(IntWidth::W64) => "u64",
            FlagKind::Float32 => "f32",
            FlagKind::Float64 => "f64",
            FlagKind::String => "String",
            FlagKind::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Range a retrieved value must fall in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Signed { min: i64, max: i64 },
    Unsigned { max: u64 },
    /// Largest magnitude allowed, either sign.
    Magnitude(f64),
}

impl FlagKind {
    /// Bounds checked on retrieval. Kinds parsed at their full width have none.
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            FlagKind::Int(IntWidth::W8) => Some(signed(i8::MIN.into(), i8::MAX.into())),
            FlagKind::Int(IntWidth::W16) => Some(signed(i16::MIN.into(), i16::MAX.into())),
            FlagKind::Int(IntWidth::W32) => Some(signed(i32::MIN.into(), i32::MAX.into())),
            FlagKind::Uint(IntWidth::W8) => Some(Bounds::Unsigned { max: u8::MAX.into() }),
            FlagKind::Uint(IntWidth::W16) => Some(Bounds::Unsigned { max: u16::MAX.into() }),
            FlagKind::Uint(IntWidth::W32) => Some(Bounds::Unsigned { max: u32::MAX.into() }),
            FlagKind::Float32 => Some(Bounds::Magnitude(f32::MAX.into())),
            _ => None,
        }
    }
}

fn signed(min: i64, max: i64) -> Bounds {
    Bounds::Signed { min, max }
}

/// Decode strategy for one parameter type.
#[derive(Debug, Clone)]
pub enum FlagType {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float32,
    Float64,
    String,
    Custom(Arc<CustomHandler>),
}

impl FlagType {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagType::Bool => FlagKind::Bool,
            FlagType::Int(width) => FlagKind::Int(*width),
            FlagType::Uint(width) => FlagKind::Uint(*width),
            FlagType::Float32 => FlagKind::Float32,
            FlagType::Float64 => FlagKind::Float64,
            FlagType::String => FlagKind::String,
            FlagType::Custom(_) => FlagKind::Custom,
        }
    }
}

// ── FlagSpec ─────────────────────────────────────────────────────

/// One named flag bound to one parameter.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    name: String,
    ty: FlagType,
}

impl FlagSpec {
    pub fn new(name: impl Into<String>, ty: FlagType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FlagKind {
        self.ty.kind()
    }

    pub fn flag_type(&self) -> &FlagType {
        &self.ty
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.kind().bounds()
    }

    /// Bool flags may be given bare; every other kind needs a value.
    pub fn takes_value(&self) -> bool {
        !matches!(self.ty, FlagType::Bool)
    }

    /// Placeholder shown in usage, e.g. `--x <i8>`.
    pub fn value_name(&self) -> String {
        match &self.ty {
            FlagType::Custom(handler) => handler
                .type_name()
                .rsplit("::")
                .next()
                .unwrap_or("value")
                .to_string(),
            other => other.kind().to_string(),
        }
    }

    /// The clap argument for this flag, with the parse-phase value parser.
    pub fn arg(&self) -> Arg {
        let arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .value_name(self.value_name())
            .action(ArgAction::Set);
        match &self.ty {
            FlagType::Bool => arg
                .value_parser(parse_bool)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true"),
            FlagType::Int(_) => arg.value_parser(parse_signed).allow_hyphen_values(true),
            FlagType::Uint(_) => arg.value_parser(parse_unsigned).allow_hyphen_values(true),
            FlagType::Float32 | FlagType::Float64 => {
                arg.value_parser(parse_float).allow_hyphen_values(true)
            }
            FlagType::String | FlagType::Custom(_) => arg
                .value_parser(clap::value_parser!(String))
                .allow_hyphen_values(true),
        }
    }

    /// Value used when the flag is not given.
    pub fn zero(&self) -> FlagValue {
        match &self.ty {
            FlagType::Bool => Box::new(false),
            FlagType::Int(IntWidth::Native) => Box::new(0isize),
            FlagType::Int(IntWidth::W8) => Box::new(0i8),
            FlagType::Int(IntWidth::W16) => Box::new(0i16),
            FlagType::Int(IntWidth::W32) => Box::new(0i32),
            FlagType::Int(IntWidth::W64) => Box::new(0i64),
            FlagType::Uint(IntWidth::Native) => Box::new(0usize),
            FlagType::Uint(IntWidth::W8) => Box::new(0u8),
            FlagType::Uint(IntWidth::W16) => Box::new(0u16),
            FlagType::Uint(IntWidth::W32) => Box::new(0u32),
            FlagType::Uint(IntWidth::W64) => Box::new(0u64),
            FlagType::Float32 => Box::new(0f32),
            FlagType::Float64 => Box::new(0f64),
            FlagType::String => Box::new(String::new()),
            FlagType::Custom(handler) => handler.zero_value(),
        }
    }

    /// Retrieve this flag's value from parsed matches, narrowed to its type.
    pub fn decode(&self, matches: &ArgMatches) -> Result<FlagValue> {
        match &self.ty {
            FlagType::Bool => Ok(self.or_zero(self.lookup::<bool>(matches)?)),
            FlagType::Int(width) => match self.lookup::<i64>(matches)? {
                Some(v) => self.narrow_signed(v, *width),
                None => Ok(self.zero()),
            },
            FlagType::Uint(width) => match self.lookup::<u64>(matches)? {
                Some(v) => self.narrow_unsigned(v, *width),
                None => Ok(self.zero()),
            },
            FlagType::Float32 => match self.lookup::<f64>(matches)? {
                Some(v) => self.narrow_float(v),
                None => Ok(self.zero()),
            },
            FlagType::Float64 => Ok(self.or_zero(self.lookup::<f64>(matches)?)),
            FlagType::String => Ok(self.or_zero(self.lookup::<String>(matches)?)),
            FlagType::Custom(handler) => match self.lookup::<String>(matches)? {
                Some(raw) => self.unmarshal(handler, raw),
                None => Ok(self.zero()),
            },
        }
    }

    fn or_zero<T: Any + Send>(&self, value: Option<T>) -> FlagValue {
        match value {
            Some(v) => Box::new(v),
            None => self.zero(),
        }
    }

    fn lookup<T>(&self, matches: &ArgMatches) -> Result<Option<T>>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        matches
            .try_get_one::<T>(&self.name)
            .map(|v| v.cloned())
            .map_err(|e| Error::FlagLookup(format!("-{}: {}", self.name, e)))
    }

    fn out_of_range(&self, value: impl ToString) -> Error {
        Error::ValueOutOfRange {
            flag: self.name.clone(),
            value: value.to_string(),
            kind: self.kind(),
        }
    }

    fn narrow_signed(&self, v: i64, width: IntWidth) -> Result<FlagValue> {
        let out = |_| self.out_of_range(v);
        let value: FlagValue = match width {
            IntWidth::Native => Box::new(isize::try_from(v).map_err(out)?),
            IntWidth::W8 => Box::new(i8::try_from(v).map_err(out)?),
            IntWidth::W16 => Box::new(i16::try_from(v).map_err(out)?),
            IntWidth::W32 => Box::new(i32::try_from(v).map_err(out)?),
            IntWidth::W64 => Box::new(v),
        };
        Ok(value)
    }

    fn narrow_unsigned(&self, v: u64, width: IntWidth) -> Result<FlagValue> {
        let out = |_| self.out_of_range(v);
        let value: FlagValue = match width {
            IntWidth::Native => Box::new(usize::try_from(v).map_err(out)?),
            IntWidth::W8 => Box::new(u8::try_from(v).map_err(out)?),
            IntWidth::W16 => Box::new(u16::try_from(v).map_err(out)?),
            IntWidth::W32 => Box::new(u32::try_from(v).map_err(out)?),
            IntWidth::W64 => Box::new(v),
        };
        Ok(value)
    }

    fn narrow_float(&self, v: f64) -> Result<FlagValue> {
        if v.abs() > f64::from(f32::MAX) {
            return Err(self.out_of_range(v));
        }
        Ok(Box::new(v as f32))
    }

    fn unmarshal(&self, handler: &CustomHandler, raw: String) -> Result<FlagValue> {
        let parsed = handler
            .unmarshal(&raw)
            .map_err(|source| Error::CannotUnmarshalCustomFlag {
                flag: self.name.clone(),
                value: raw.clone(),
                source,
            })?;
        handler.extract(&parsed).ok_or_else(|| {
            Error::FlagLookup(format!("-{}: not a {}", self.name, handler.type_name()))
        })
    }
}

// ── Parse phase ──────────────────────────────────────────────────

/// Accepts the same spellings as Go's `strconv.ParseBool`.
pub fn parse_bool(s: &str) -> std::result::Result<bool, String> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(invalid_syntax(s)),
    }
}

/// Splits a `0x`, `0o`, `0b` or leading-`0` prefix off `s`.
fn split_radix(s: &str) -> (&str, u32) {
    let prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    for (prefix, radix) in prefixed {
        if let Some(rest) = s.strip_prefix(prefix) {
            return (rest, radix);
        }
    }
    match s.strip_prefix('0') {
        Some(rest) if !rest.is_empty() => (rest, 8),
        _ => (s, 10),
    }
}

fn parse_magnitude(s: &str) -> std::result::Result<u64, String> {
    let (digits, radix) = split_radix(s);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid_syntax(s));
    }
    u64::from_str_radix(digits, radix).map_err(|e| format!("parse {:?}: {}", s, e))
}

/// Signed integer in base 2, 8, 10 or 16, as wide as the widest signed kind.
pub fn parse_signed(s: &str) -> std::result::Result<i64, String> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = parse_magnitude(body)?;
    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };
    value.ok_or_else(|| format!("parse {:?}: value out of range", s))
}

/// Unsigned integer in base 2, 8, 10 or 16. No sign is allowed.
pub fn parse_unsigned(s: &str) -> std::result::Result<u64, String> {
    if s.starts_with(['+', '-']) {
        return Err(invalid_syntax(s));
    }
    parse_magnitude(s)
}

pub fn parse_float(s: &str) -> std::result::Result<f64, String> {
    s.parse::<f64>().map_err(|_| invalid_syntax(s))
}

fn invalid_syntax(s: &str) -> String {
    format!("parse {:?}: invalid syntax", s)
}

// ── Factory ──────────────────────────────────────────────────────

static PRIMITIVES: LazyLock<HashMap<TypeId, FlagType>> = LazyLock::new(|| {
    HashMap::from([
        (TypeId::of::<bool>(), FlagType::Bool),
        (TypeId::of::<isize>(), FlagType::Int(IntWidth::Native)),
        (TypeId::of::<i8>(), FlagType::Int(IntWidth::W8)),
        (TypeId::of::<i16>(), FlagType::Int(IntWidth::W16)),
        (TypeId::of::<i32>(), FlagType::Int(IntWidth::W32)),
        (TypeId::of::<i64>(), FlagType::Int(IntWidth::W64)),
        (TypeId::of::<usize>(), FlagType::Uint(IntWidth::Native)),
        (TypeId::of::<u8>(), FlagType::Uint(IntWidth::W8)),
        (TypeId::of::<u16>(), FlagType::Uint(IntWidth::W16)),
        (TypeId::of::<u32>(), FlagType::Uint(IntWidth::W32)),
        (TypeId::of::<u64>(), FlagType::Uint(IntWidth::W64)),
        (TypeId::of::<f32>(), FlagType::Float32),
        (TypeId::of::<f64>(), FlagType::Float64),
        (TypeId::of::<String>(), FlagType::String),
    ])
});

/// Picks a [`FlagType`] for a parameter type: registered custom handlers
/// first, then primitive kinds.
#[derive(Debug, Clone, Default)]
pub struct FlagFactory {
    registry: Arc<CustomFlagRegistry>,
}

impl FlagFactory {
    pub fn new(registry: Arc<CustomFlagRegistry>) -> Self {
        Self { registry }
    }

    pub fn flag_type(&self, ty: ParamType) -> Option<FlagType> {
        self.registry
            .get(ty.id())
            .map(FlagType::Custom)
            .or_else(|| PRIMITIVES.get(&ty.id()).cloned())
    }

    /// `None` when the type is unsupported.
    pub fn constructor(&self, ty: ParamType) -> Option<FlagConstructor> {
        let flag_type = self.flag_type(ty)?;
        Some(Box::new(move |name: &str| FlagSpec::new(name, flag_type.clone())))
    }

    /// Same as [`FlagFactory::constructor`], keyed by a representative value.
    pub fn constructor_for<T: 'static>(&self, _value: &T) -> Option<FlagConstructor> {
        self.constructor(ParamType::of::<T>())
    }
}
