//! printf-style template expansion.
//!
//! A template is walked byte by byte. Literal bytes go straight to the
//! sink; a `%` starts a directive made of flags (`- + space # 0`), an
//! optional width and precision (decimal or `*` pulled from the argument
//! list), an optional length modifier (`hh h l ll L z`) and a conversion
//! letter:
//!
//! | letters     | conversion                                   |
//! |-------------|----------------------------------------------|
//! | `d i u`     | signed / unsigned decimal                    |
//! | `x X o b B` | hex, octal, binary                           |
//! | `c s p %`   | character, string, pointer, literal percent  |
//! | `f F e E g G` | fixed, scientific, general float           |
//! | `q Q`       | raw bytes as hex items, precision = length   |
//!
//! An unknown conversion prints the `%` and resumes right after it.

use std::io::{self, Write};
use std::ops::{BitOr, BitOrAssign};

use crate::args::{Arg, ArgCursor, LengthModifier};
use crate::numeric::{
    decompose_fixed, decompose_scientific, digit_count, with_digits, Base, NumberComponents,
    DEFAULT_PRECISION, MAX_PRECISION,
};
use crate::sink::{MemorySink, Sink, StreamSink};

/// Cache size of the stream sink behind [`printf`].
pub const STDOUT_CACHE_SIZE: usize = 256;

/// Per-directive option bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// `-`: pad on the right.
    pub const LEFT: Self = Self(0x0001);
    /// `+`: always print a sign for signed values.
    pub const PLUS: Self = Self(0x0002);
    /// ` `: print a space where a `+` would go.
    pub const SPACE: Self = Self(0x0004);
    /// `#`: radix prefix, or a decimal point even at precision 0.
    pub const SPECIAL: Self = Self(0x0008);
    /// `0`: pad with zeros after the sign.
    pub const ZEROPAD: Self = Self(0x0010);
    /// Uppercase digits, prefixes and exponent marker.
    pub const LARGE: Self = Self(0x0020);
    pub const SIGNED: Self = Self(0x0040);
    pub const FLOAT_E: Self = Self(0x0080);
    pub const FLOAT_F: Self = Self(0x0100);
    pub const FLOAT_G: Self = Self(0x0200);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for FormatFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Width, precision and length modifier of one directive. `None` means
/// "not given": no padding, or the conversion's default precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSpec {
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub length: LengthModifier,
}

/// Expands `template` into `sink`.
///
/// Returns the number of bytes produced, including any the sink discarded.
/// The sink is not finished; see [`snprintf`] for the bounded variant.
pub fn format_to<S: Sink + ?Sized>(sink: &mut S, template: &str, args: &[Arg<'_>]) -> usize {
    let fmt = template.as_bytes();
    let mut args = ArgCursor::new(args);
    let mut written = 0;
    let mut i = 0;

    while i < fmt.len() {
        if fmt[i] != b'%' {
            sink.write_byte(fmt[i]);
            written += 1;
            i += 1;
            continue;
        }
        let start = i;
        let checkpoint = args.position();
        i += 1;

        let mut flags = FormatFlags::empty();
        while let Some(&byte) = fmt.get(i) {
            match byte {
                b'-' => flags |= FormatFlags::LEFT,
                b'+' => flags |= FormatFlags::PLUS,
                b' ' => flags |= FormatFlags::SPACE,
                b'#' => flags |= FormatFlags::SPECIAL,
                b'0' => flags |= FormatFlags::ZEROPAD,
                _ => break,
            }
            i += 1;
        }

        let mut spec = FieldSpec::default();
        match fmt.get(i) {
            Some(byte) if byte.is_ascii_digit() => spec.width = Some(parse_decimal(fmt, &mut i)),
            Some(b'*') => {
                i += 1;
                let width = args.next_star();
                if width < 0 {
                    flags |= FormatFlags::LEFT;
                }
                spec.width = Some(width.unsigned_abs() as usize);
            }
            _ => {}
        }

        if fmt.get(i) == Some(&b'.') {
            i += 1;
            let precision = match fmt.get(i) {
                Some(byte) if byte.is_ascii_digit() => parse_decimal(fmt, &mut i) as i64,
                Some(b'*') => {
                    i += 1;
                    args.next_star() as i64
                }
                _ => 0,
            };
            spec.precision = Some(precision.max(0) as usize);
        }

        spec.length = match fmt.get(i) {
            Some(b'h') if fmt.get(i + 1) == Some(&b'h') => LengthModifier::Char,
            Some(b'h') => LengthModifier::Short,
            Some(b'l') if fmt.get(i + 1) == Some(&b'l') => LengthModifier::LongLong,
            Some(b'l') => LengthModifier::Long,
            Some(b'L') => LengthModifier::LongLong,
            Some(b'z') => LengthModifier::Size,
            _ => LengthModifier::None,
        };
        i += match spec.length {
            LengthModifier::None => 0,
            LengthModifier::Char => 2,
            LengthModifier::LongLong if fmt.get(i) == Some(&b'l') => 2,
            _ => 1,
        };

        if flags.contains(FormatFlags::LEFT) {
            flags.remove(FormatFlags::ZEROPAD);
        }

        let conversion = fmt.get(i).copied();
        i += 1;
        written += match conversion {
            Some(b's') => {
                let text = args.next_str().unwrap_or("(null)");
                write_str(sink, text.as_bytes(), spec.width, spec.precision, flags)
            }
            Some(b'c') => write_char(sink, args.next_char(), spec.width, flags),
            Some(b'%') => {
                sink.write_byte(b'%');
                1
            }
            Some(b'd' | b'i') => {
                flags |= FormatFlags::SIGNED;
                let value = args.next_int(spec.length, true);
                write_number(sink, value, &spec, flags, Base::Decimal)
            }
            Some(b'u') => {
                let value = args.next_int(spec.length, false);
                write_number(sink, value, &spec, flags, Base::Decimal)
            }
            Some(letter @ (b'x' | b'X')) => {
                if letter == b'X' {
                    flags |= FormatFlags::LARGE;
                }
                let value = args.next_int(spec.length, false);
                write_number(sink, value, &spec, flags, Base::Hex)
            }
            Some(letter @ (b'b' | b'B')) => {
                if letter == b'B' {
                    flags |= FormatFlags::LARGE;
                }
                let value = args.next_int(spec.length, false);
                write_number(sink, value, &spec, flags, Base::Binary)
            }
            Some(b'o') => {
                let value = args.next_int(spec.length, false);
                write_number(sink, value, &spec, flags, Base::Octal)
            }
            Some(b'p') => {
                if spec.width.is_none() {
                    spec.width = Some(2 * std::mem::size_of::<usize>() + 2);
                    flags |= FormatFlags::ZEROPAD | FormatFlags::SPECIAL;
                }
                let value = args.next_pointer();
                write_number(sink, value, &spec, flags, Base::Hex)
            }
            Some(letter @ (b'e' | b'E' | b'f' | b'F' | b'g' | b'G')) => {
                if letter.is_ascii_uppercase() {
                    flags |= FormatFlags::LARGE;
                }
                flags |= match letter.to_ascii_lowercase() {
                    b'e' => FormatFlags::FLOAT_E,
                    b'f' => FormatFlags::FLOAT_F,
                    _ => FormatFlags::FLOAT_G,
                };
                write_float(sink, args.next_float(), &spec, flags)
            }
            Some(letter @ (b'q' | b'Q')) => {
                if letter == b'Q' {
                    flags |= FormatFlags::LARGE;
                }
                write_hex_items(sink, args.next_bytes(), &spec, flags)
            }
            _ => {
                sink.write_byte(b'%');
                i = start + 1;
                args.rewind(checkpoint);
                1
            }
        };
    }
    written
}

/// Formats into `buf`, always terminating it with a zero byte when it is
/// non-empty.
///
/// Output that does not fit is dropped; the return value is the length the
/// full expansion would have had.
///
/// ```
/// use dbg_logger::{args, snprintf};
///
/// let mut buf = [0u8; 8];
/// let n = snprintf(&mut buf, "%5.2f", &args![3.14159]);
/// assert_eq!(n, 5);
/// assert_eq!(&buf[..6], b" 3.14\0");
/// ```
pub fn snprintf(buf: &mut [u8], template: &str, args: &[Arg<'_>]) -> usize {
    let mut sink = MemorySink::new(buf);
    let written = format_to(&mut sink, template, args);
    sink.finish();
    written
}

/// Formats into a new `String`. Bytes that are not valid UTF-8 (for
/// example a string cut by precision mid-character) become U+FFFD.
pub fn sprintf(template: &str, args: &[Arg<'_>]) -> String {
    let mut out = Vec::with_capacity(template.len() + 16);
    format_to(&mut out, template, args);
    match String::from_utf8(out) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Formats to standard output, flushing line by line.
pub fn printf(template: &str, args: &[Arg<'_>]) -> usize {
    let mut sink = StreamSink::<STDOUT_CACHE_SIZE, _>::new(|bytes: &[u8]| {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    });
    let written = format_to(&mut sink, template, args);
    sink.flush();
    written
}

fn parse_decimal(fmt: &[u8], i: &mut usize) -> usize {
    let mut value: usize = 0;
    while let Some(byte) = fmt.get(*i).filter(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add((byte - b'0') as usize);
        *i += 1;
    }
    value
}

#[inline(always)]
fn pad<S: Sink + ?Sized>(sink: &mut S, byte: u8, count: usize) {
    for _ in 0..count {
        sink.write_byte(byte);
    }
}

fn write_char<S: Sink + ?Sized>(
    sink: &mut S,
    ch: u8,
    width: Option<usize>,
    flags: FormatFlags,
) -> usize {
    let fill = width.unwrap_or(0).saturating_sub(1);
    if flags.contains(FormatFlags::LEFT) {
        sink.write_byte(ch);
        pad(sink, b' ', fill);
    } else {
        pad(sink, b' ', fill);
        sink.write_byte(ch);
    }
    fill + 1
}

fn write_str<S: Sink + ?Sized>(
    sink: &mut S,
    text: &[u8],
    width: Option<usize>,
    precision: Option<usize>,
    flags: FormatFlags,
) -> usize {
    let len = precision.map_or(text.len(), |p| p.min(text.len()));
    let fill = width.unwrap_or(0).saturating_sub(len);
    if !flags.contains(FormatFlags::LEFT) {
        pad(sink, b' ', fill);
    }
    sink.write_slice(&text[..len]);
    if flags.contains(FormatFlags::LEFT) {
        pad(sink, b' ', fill);
    }
    len + fill
}

fn write_number<S: Sink + ?Sized>(
    sink: &mut S,
    mut value: u64,
    spec: &FieldSpec,
    mut flags: FormatFlags,
    base: Base,
) -> usize {
    let large = flags.contains(FormatFlags::LARGE);
    let mut sign = None;
    if flags.contains(FormatFlags::SIGNED) {
        if (value as i64) < 0 {
            sign = Some(b'-');
            value = (value as i64).unsigned_abs();
        } else if flags.contains(FormatFlags::PLUS) {
            sign = Some(b'+');
        } else if flags.contains(FormatFlags::SPACE) {
            sign = Some(b' ');
        }
    }

    let prefix: &[u8] = match (flags.contains(FormatFlags::SPECIAL), base, large) {
        (true, Base::Octal, _) => b"0",
        (true, Base::Hex, false) => b"0x",
        (true, Base::Hex, true) => b"0X",
        (true, Base::Binary, false) => b"0b",
        (true, Base::Binary, true) => b"0B",
        _ => b"",
    };

    with_digits(value, base, large, |digits| {
        let mut len = sign.map_or(0, |_| 1) + prefix.len() + digits.len();
        let mut zeros = 0;
        if let Some(precision) = spec.precision {
            flags.remove(FormatFlags::ZEROPAD);
            zeros = precision.saturating_sub(digits.len());
            len += zeros;
        }
        let fill = spec.width.unwrap_or(0).saturating_sub(len);
        let spaces = if flags.contains(FormatFlags::ZEROPAD) {
            zeros += fill;
            0
        } else {
            fill
        };

        if !flags.contains(FormatFlags::LEFT) {
            pad(sink, b' ', spaces);
        }
        if let Some(sign) = sign {
            sink.write_byte(sign);
        }
        sink.write_slice(prefix);
        pad(sink, b'0', zeros);
        sink.write_slice(digits);
        if flags.contains(FormatFlags::LEFT) {
            pad(sink, b' ', spaces);
        }
        len + fill
    })
}

fn write_float<S: Sink + ?Sized>(
    sink: &mut S,
    value: f64,
    spec: &FieldSpec,
    mut flags: FormatFlags,
) -> usize {
    let large = flags.contains(FormatFlags::LARGE);
    if value.is_nan() {
        let token: &[u8] = if large { b"NAN" } else { b"nan" };
        return write_str(sink, token, spec.width, None, flags);
    }
    if value.is_infinite() {
        let mut token = [0u8; 4];
        let mut len = 0;
        let sign = if value < 0.0 {
            Some(b'-')
        } else if flags.contains(FormatFlags::PLUS) {
            Some(b'+')
        } else if flags.contains(FormatFlags::SPACE) {
            Some(b' ')
        } else {
            None
        };
        if let Some(sign) = sign {
            token[0] = sign;
            len = 1;
        }
        token[len..len + 3].copy_from_slice(if large { b"INF" } else { b"inf" });
        len += 3;
        return write_str(sink, &token[..len], spec.width, None, flags);
    }

    let precision = spec.precision.unwrap_or(DEFAULT_PRECISION);
    if flags.contains(FormatFlags::FLOAT_F) || flags.contains(FormatFlags::FLOAT_G) {
        if let Some(parts) = decompose_fixed(value, precision) {
            return write_float_parts(sink, &parts, None, spec.width, precision, flags);
        }
        flags.remove(FormatFlags::FLOAT_F);
        flags.remove(FormatFlags::FLOAT_G);
        flags |= FormatFlags::FLOAT_E;
    }
    let scientific = decompose_scientific(value, precision);
    write_float_parts(
        sink,
        &scientific.components,
        Some(scientific.exponent),
        spec.width,
        precision,
        flags,
    )
}

fn write_float_parts<S: Sink + ?Sized>(
    sink: &mut S,
    parts: &NumberComponents,
    exponent: Option<i32>,
    width: Option<usize>,
    precision: usize,
    flags: FormatFlags,
) -> usize {
    let (precision, trailing_zeros) = if precision > MAX_PRECISION {
        (MAX_PRECISION, precision - MAX_PRECISION)
    } else {
        (precision, 0)
    };

    let sign = if parts.negative {
        Some(b'-')
    } else if flags.contains(FormatFlags::PLUS) {
        Some(b'+')
    } else if flags.contains(FormatFlags::SPACE) {
        Some(b' ')
    } else {
        None
    };
    let dot = precision > 0 || flags.contains(FormatFlags::SPECIAL);

    let integral_len = digit_count(parts.integral, Base::Decimal);
    let (fractional_len, fractional_zeros) = if precision > 0 {
        let len = digit_count(parts.fractional, Base::Decimal);
        (len, precision.saturating_sub(len))
    } else {
        (0, 0)
    };
    let exponent_len = exponent.map_or(0, |e| {
        2 + digit_count(e.unsigned_abs() as u64, Base::Decimal).max(2)
    });

    let len = sign.map_or(0, |_| 1)
        + integral_len
        + dot as usize
        + fractional_zeros
        + fractional_len
        + trailing_zeros
        + exponent_len;
    let fill = width.unwrap_or(0).saturating_sub(len);
    let zero_fill = flags.contains(FormatFlags::ZEROPAD);

    if !flags.contains(FormatFlags::LEFT) && !zero_fill {
        pad(sink, b' ', fill);
    }
    if let Some(sign) = sign {
        sink.write_byte(sign);
    }
    if zero_fill {
        pad(sink, b'0', fill);
    }
    with_digits(parts.integral, Base::Decimal, false, |digits| sink.write_slice(digits));
    if dot {
        sink.write_byte(b'.');
    }
    if precision > 0 {
        pad(sink, b'0', fractional_zeros);
        with_digits(parts.fractional, Base::Decimal, false, |digits| sink.write_slice(digits));
    }
    pad(sink, b'0', trailing_zeros);

    if let Some(exponent) = exponent {
        sink.write_byte(if flags.contains(FormatFlags::LARGE) { b'E' } else { b'e' });
        sink.write_byte(if exponent >= 0 { b'+' } else { b'-' });
        let magnitude = exponent.unsigned_abs() as u64;
        if magnitude < 10 {
            sink.write_byte(b'0');
        }
        with_digits(magnitude, Base::Decimal, false, |digits| sink.write_slice(digits));
    }

    if flags.contains(FormatFlags::LEFT) && !zero_fill {
        pad(sink, b' ', fill);
    }
    len + fill
}

/// `%q`: `precision` bytes printed as space-separated hex items of
/// `length.item_size()` bytes in native byte order. A short final item is
/// completed with `??` in place of the missing bytes.
fn write_hex_items<S: Sink + ?Sized>(
    sink: &mut S,
    bytes: &[u8],
    spec: &FieldSpec,
    flags: FormatFlags,
) -> usize {
    let Some(count) = spec.precision else {
        return 0;
    };
    let bytes = &bytes[..count.min(bytes.len())];
    let item_size = spec.length.item_size();
    let glyphs = crate::numeric::digit_glyphs(flags.contains(FormatFlags::LARGE));
    let items = bytes.len().div_ceil(item_size);
    let len = if items == 0 {
        0
    } else {
        items * item_size * 2 + items - 1
    };
    let fill = spec.width.unwrap_or(0).saturating_sub(len);

    if !flags.contains(FormatFlags::LEFT) {
        pad(sink, b' ', fill);
    }
    for (index, item) in bytes.chunks(item_size).enumerate() {
        if index > 0 {
            sink.write_byte(b' ');
        }
        let missing = item_size - item.len();
        if cfg!(target_endian = "little") {
            pad_placeholders(sink, missing);
            item.iter().rev().for_each(|&byte| write_hex_byte(sink, glyphs, byte));
        } else {
            item.iter().for_each(|&byte| write_hex_byte(sink, glyphs, byte));
            pad_placeholders(sink, missing);
        }
    }
    if flags.contains(FormatFlags::LEFT) {
        pad(sink, b' ', fill);
    }
    len + fill
}

#[inline(always)]
fn write_hex_byte<S: Sink + ?Sized>(sink: &mut S, glyphs: &[u8; 16], byte: u8) {
    sink.write_byte(glyphs[(byte >> 4) as usize]);
    sink.write_byte(glyphs[(byte & 0x0f) as usize]);
}

fn pad_placeholders<S: Sink + ?Sized>(sink: &mut S, count: usize) {
    for _ in 0..count {
        sink.write_slice(b"??");
    }
}
