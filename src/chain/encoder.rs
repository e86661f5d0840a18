//! Canonical binary encoding used for transaction serialization.
//!
//! Integers are fixed-width little-endian unless written through
//! [`Encoder::write_uvarint`]. Strings and collections carry a varint prefix.
//! Every fallible step returns `Result`, so composite encoders abort on the
//! first failure and never hand back a partially written buffer.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("malformed money value '{0}'")]
    MoneyFormat(String),

    #[error("money value '{value}' has more than {max} fractional digits")]
    MoneyPrecision { value: String, max: u8 },

    #[error("money value '{0}' does not fit the fixed-point range")]
    MoneyOverflow(String),

    #[error("asset symbol '{symbol}' is longer than {max} bytes")]
    SymbolTooLong { symbol: String, max: usize },

    #[error("no operation specified")]
    EmptyTransaction,

    #[error("operation '{0}' has no binary encoding")]
    NotSerializable(String),

    #[error("time {0} cannot be encoded as unsigned 32-bit seconds")]
    TimeOutOfRange(String),

    #[error("{0}")]
    MarketShape(String),

    #[error("collection of {len} items exceeds the limit of {max}")]
    CollectionTooLarge { len: usize, max: usize },
}

/// Fixed-point layout of money values: `precision` decimal places and a
/// NUL-padded symbol of `symbol_width` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyFormat {
    pub precision: u8,
    pub symbol_width: usize,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self {
            precision: 9,
            symbol_width: 7,
        }
    }
}

/// A value with a canonical binary form.
pub trait Encode {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError>;
}

#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
    money: MoneyFormat,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_money_format(money: MoneyFormat) -> Self {
        Self {
            buf: Vec::new(),
            money,
        }
    }

    pub fn money_format(&self) -> MoneyFormat {
        self.money
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_uvarint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed byte blob.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_uvarint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_uuid(&mut self, value: &Uuid) {
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Encode `"<amount> <SYMBOL>"` as a scaled i64, the precision byte and the
    /// padded symbol.
    pub fn write_money(&mut self, text: &str) -> Result<(), EncodeError> {
        let (amount, symbol) = parse_money(text, self.money)?;
        if symbol.len() > self.money.symbol_width {
            return Err(EncodeError::SymbolTooLong {
                symbol: symbol.to_string(),
                max: self.money.symbol_width,
            });
        }
        self.write_i64(amount);
        self.write_u8(self.money.precision);
        self.buf.extend_from_slice(symbol.as_bytes());
        self.buf
            .resize(self.buf.len() + self.money.symbol_width - symbol.len(), 0);
        Ok(())
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        value.encode(self)
    }

    /// Varint count followed by every element in order.
    pub fn encode_seq<T: Encode>(&mut self, items: &[T]) -> Result<(), EncodeError> {
        self.write_uvarint(items.len() as u64);
        items.iter().try_for_each(|item| item.encode(self))
    }
}

/// Encode a value into a fresh buffer using the default money format.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut enc = Encoder::new();
    value.encode(&mut enc)?;
    Ok(enc.into_bytes())
}

fn parse_money(text: &str, format: MoneyFormat) -> Result<(i64, &str), EncodeError> {
    let mut tokens = text.split_whitespace();
    let (Some(number), Some(symbol), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(EncodeError::MoneyFormat(text.to_string()));
    };

    let (negative, digits) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let well_formed = !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(EncodeError::MoneyFormat(text.to_string()));
    }
    if frac_part.len() > usize::from(format.precision) {
        return Err(EncodeError::MoneyPrecision {
            value: text.to_string(),
            max: format.precision,
        });
    }

    let padding = usize::from(format.precision) - frac_part.len();
    let scaled = int_part
        .bytes()
        .chain(frac_part.bytes())
        .chain(std::iter::repeat(b'0').take(padding))
        .try_fold(0_i64, |acc, digit| {
            acc.checked_mul(10)?.checked_add(i64::from(digit - b'0'))
        })
        .ok_or_else(|| EncodeError::MoneyOverflow(text.to_string()))?;

    Ok((if negative { -scaled } else { scaled }, symbol))
}

impl Encode for str {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(self);
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_str(self);
        Ok(())
    }
}

impl Encode for bool {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_bool(*self);
        Ok(())
    }
}

impl Encode for Uuid {
    fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
        enc.write_uuid(self);
        Ok(())
    }
}

macro_rules! encode_fixed {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, enc: &mut Encoder) -> Result<(), EncodeError> {
                    enc.$method(*self);
                    Ok(())
                }
            }
        )*
    };
}

encode_fixed! {
    u8 => write_u8,
    i8 => write_i8,
    u16 => write_u16,
    i16 => write_i16,
    u32 => write_u32,
    i32 => write_i32,
    u64 => write_u64,
    i64 => write_i64,
}
