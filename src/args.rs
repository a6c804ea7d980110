/// Typed argument lists for the format engine.
///
/// Callers build a slice of [`Arg`] (usually with [`args!`](crate::args))
/// and the engine pulls one entry per directive, reinterpreting it at the
/// width the directive's length modifier asks for.

/// One formatting argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    Int(i64),
    UInt(u64),
    Char(u8),
    Float(f64),
    Str(Option<&'a str>),
    Pointer(usize),
    Bytes(&'a [u8]),
}

/// Integer width requested by a directive (`hh`, `h`, none, `l`, `ll`/`L`, `z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthModifier {
    #[default]
    None,
    Char,
    Short,
    Long,
    LongLong,
    Size,
}

impl LengthModifier {
    /// Narrows a raw 64-bit argument to this width, then widens it back
    /// with sign extension for signed conversions.
    pub fn extend(self, raw: u64, signed: bool) -> u64 {
        match (self, signed) {
            (LengthModifier::Char, true) => raw as i8 as i64 as u64,
            (LengthModifier::Char, false) => raw as u8 as u64,
            (LengthModifier::Short, true) => raw as i16 as i64 as u64,
            (LengthModifier::Short, false) => raw as u16 as u64,
            (LengthModifier::None, true) => raw as i32 as i64 as u64,
            (LengthModifier::None, false) => raw as u32 as u64,
            (LengthModifier::Long | LengthModifier::LongLong | LengthModifier::Size, _) => raw,
        }
    }

    /// Bytes per item for the raw hex dump conversion.
    pub fn item_size(self) -> usize {
        match self {
            LengthModifier::Char => 1,
            LengthModifier::Short => 2,
            LengthModifier::None => 4,
            LengthModifier::Long | LengthModifier::LongLong => 8,
            LengthModifier::Size => std::mem::size_of::<usize>(),
        }
    }
}

impl Arg<'_> {
    fn raw_int(&self) -> u64 {
        match *self {
            Arg::Int(v) => v as u64,
            Arg::UInt(v) => v,
            Arg::Char(c) => c as u64,
            Arg::Pointer(p) => p as u64,
            Arg::Float(f) => f as i64 as u64,
            Arg::Str(_) | Arg::Bytes(_) => 0,
        }
    }
}

/// Sequential reader over an argument slice.
///
/// Running past the end yields zero, null or empty values.
pub struct ArgCursor<'s, 'a> {
    args: &'s [Arg<'a>],
    next: usize,
}

impl<'s, 'a> ArgCursor<'s, 'a> {
    pub fn new(args: &'s [Arg<'a>]) -> Self {
        Self { args, next: 0 }
    }

    pub fn position(&self) -> usize {
        self.next
    }

    pub fn rewind(&mut self, position: usize) {
        self.next = position.min(self.args.len());
    }

    pub fn remaining(&self) -> usize {
        self.args.len() - self.next
    }

    fn pull(&mut self) -> Option<Arg<'a>> {
        let arg = self.args.get(self.next).copied();
        if arg.is_some() {
            self.next += 1;
        }
        arg
    }

    pub fn next_int(&mut self, length: LengthModifier, signed: bool) -> u64 {
        let raw = self.pull().map_or(0, |arg| arg.raw_int());
        length.extend(raw, signed)
    }

    /// A `*` width or precision, read as a C `int`.
    pub fn next_star(&mut self) -> i32 {
        self.next_int(LengthModifier::None, true) as i64 as i32
    }

    pub fn next_char(&mut self) -> u8 {
        self.pull().map_or(0, |arg| arg.raw_int() as u8)
    }

    pub fn next_float(&mut self) -> f64 {
        match self.pull() {
            Some(Arg::Float(f)) => f,
            Some(Arg::Int(v)) => v as f64,
            Some(Arg::UInt(v)) => v as f64,
            Some(Arg::Char(c)) => c as f64,
            _ => 0.0,
        }
    }

    pub fn next_str(&mut self) -> Option<&'a str> {
        match self.pull() {
            Some(Arg::Str(s)) => s,
            _ => None,
        }
    }

    pub fn next_bytes(&mut self) -> &'a [u8] {
        match self.pull() {
            Some(Arg::Bytes(bytes)) => bytes,
            Some(Arg::Str(Some(s))) => s.as_bytes(),
            _ => &[],
        }
    }

    pub fn next_pointer(&mut self) -> u64 {
        self.pull().map_or(0, |arg| arg.raw_int())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg<'_> {
            fn from(value: $t) -> Self {
                Arg::Int(value as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg<'_> {
            fn from(value: $t) -> Self {
                Arg::UInt(value as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for Arg<'_> {
    fn from(value: bool) -> Self {
        Arg::Int(value as i64)
    }
}

impl From<f32> for Arg<'_> {
    fn from(value: f32) -> Self {
        Arg::Float(value as f64)
    }
}

impl From<f64> for Arg<'_> {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

/// Non-ASCII characters have no single-byte rendering and become `?`.
impl From<char> for Arg<'_> {
    fn from(value: char) -> Self {
        Arg::Char(if value.is_ascii() { value as u8 } else { b'?' })
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(value: &'a str) -> Self {
        Arg::Str(Some(value))
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(value: &'a String) -> Self {
        Arg::Str(Some(value.as_str()))
    }
}

impl<'a> From<Option<&'a str>> for Arg<'a> {
    fn from(value: Option<&'a str>) -> Self {
        Arg::Str(value)
    }
}

impl<'a> From<&'a [u8]> for Arg<'a> {
    fn from(value: &'a [u8]) -> Self {
        Arg::Bytes(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Arg<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        Arg::Bytes(value)
    }
}

impl<'a> From<&'a Vec<u8>> for Arg<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Arg::Bytes(value)
    }
}

impl<T> From<*const T> for Arg<'_> {
    fn from(value: *const T) -> Self {
        Arg::Pointer(value as usize)
    }
}

impl<T> From<*mut T> for Arg<'_> {
    fn from(value: *mut T) -> Self {
        Arg::Pointer(value as usize)
    }
}

/// Builds an `[Arg; N]` from heterogeneous values.
///
/// ```
/// use dbg_logger::{args, sprintf};
///
/// let name = "sensor";
/// assert_eq!(sprintf("%s=%d", &args![name, 42]), "sensor=42");
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        [$($crate::Arg::from($arg)),*]
    };
}
