//! Shared rational payloads.
//!
//! A `Number` is an immutable reduced fraction behind an `Rc`. Cloning with
//! [`Number::link`] adds an owner of the same payload, dropping an owner
//! unlinks it, and the payload is released with its last owner.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::byteorder::{self, HALF_BYTES};
use crate::errcode::{self, ErrorCode};

/// Largest decimal exponent accepted in a literal.
pub const MAX_EXPONENT: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("malformed number `{0}`")]
    Malformed(String),
    #[error("exponent too big in `{0}`")]
    ExponentTooBig(String),
}

impl NumberError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NumberError::DivisionByZero => errcode::E_DIVBYZERO,
            NumberError::Malformed(_) => errcode::E_EVAL,
            NumberError::ExponentTooBig(_) => errcode::E_BIGEXP,
        }
    }
}

#[derive(Debug)]
struct Rational {
    num: BigInt,
    den: BigInt,
}

/// Digit summary used to reject most interning candidates without a full
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitProfile {
    pub num_len: usize,
    pub num_low: u32,
    pub den_len: usize,
    pub den_low: u32,
    pub sign: Sign,
}

#[derive(Clone, Debug)]
pub struct Number(Rc<Rational>);

impl Number {
    /// Builds `num / den` reduced to lowest terms with a positive denominator.
    pub fn new(num: BigInt, den: BigInt) -> Result<Self, NumberError> {
        if den.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        let g = num.gcd(&den);
        let (mut num, mut den) = if g.is_one() { (num, den) } else { (num / &g, den / &g) };
        if den.is_negative() {
            num = -num;
            den = -den;
        }
        Ok(Self(Rc::new(Rational { num, den })))
    }

    pub fn from_integer(num: BigInt) -> Self {
        Self(Rc::new(Rational { num, den: BigInt::one() }))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_integer(BigInt::from(value))
    }

    pub fn zero() -> Self {
        Self::from_integer(BigInt::zero())
    }

    /// Parses a numeric literal: decimal with optional fraction and
    /// exponent (`1.25`, `1e3`), `0x`/`0b` integers, or `a/b`.
    pub fn parse(literal: &str) -> Result<Self, NumberError> {
        let s = literal.trim();
        if let Some((n, d)) = s.split_once('/') {
            let n = Self::parse(n)?;
            let d = Self::parse(d)?;
            return Self::new(n.num() * d.den(), n.den() * d.num());
        }
        let malformed = || NumberError::Malformed(literal.to_owned());
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (num, den) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            (parse_digits(hex, 16).ok_or_else(malformed)?, BigInt::one())
        } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
            (parse_digits(bin, 2).ok_or_else(malformed)?, BigInt::one())
        } else {
            parse_decimal(body, literal)?
        };
        Self::new(if negative { -num } else { num }, den)
    }

    pub fn num(&self) -> &BigInt {
        &self.0.num
    }

    pub fn den(&self) -> &BigInt {
        &self.0.den
    }

    pub fn sign(&self) -> Sign {
        self.0.num.sign()
    }

    pub fn is_integer(&self) -> bool {
        self.0.den.is_one()
    }

    pub fn is_zero(&self) -> bool {
        self.0.num.is_zero()
    }

    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() { self.0.num.to_i64() } else { None }
    }

    /// Integer part, truncated toward zero.
    pub fn integer_part(&self) -> BigInt {
        &self.0.num / &self.0.den
    }

    /// Low eight bits of the magnitude of the integer part.
    pub fn low_octet(&self) -> u8 {
        self.integer_part().magnitude().iter_u32_digits().next().unwrap_or(0) as u8
    }

    /// Adds an owner of this payload.
    #[inline]
    pub fn link(&self) -> Number {
        Number(Rc::clone(&self.0))
    }

    #[inline]
    pub fn links(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Number) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn digit_profile(&self) -> DigitProfile {
        let (num_len, num_low) = digit_summary(&self.0.num);
        let (den_len, den_low) = digit_summary(&self.0.den);
        DigitProfile { num_len, num_low, den_len, den_low, sign: self.sign() }
    }

    /// Numerator magnitude as HALF words, least significant first. Zero is
    /// one zero word.
    pub fn numerator_words(&self) -> Vec<u32> {
        let mut words = self.0.num.magnitude().to_u32_digits();
        if words.is_empty() {
            words.push(0);
        }
        words
    }

    pub fn numerator_len(&self) -> usize {
        self.0.num.magnitude().iter_u32_digits().len().max(1)
    }

    /// Raw byte image of the numerator digits.
    pub fn numerator_bytes(&self) -> Vec<u8> {
        byteorder::halves_to_wire(&self.numerator_words())
    }

    /// Clones this number with `bytes` written over the numerator image
    /// starting at word `dsi`.
    ///
    /// The digit count becomes `max(numerator_len, dsi + ceil(bytes / 4))`
    /// with new words zeroed. Sign and denominator carry over; the result is
    /// reduced again.
    pub fn with_numerator_bytes(&self, dsi: usize, bytes: &[u8]) -> Number {
        let mut words = self.numerator_words();
        let needed = dsi + bytes.len().div_ceil(HALF_BYTES);
        if words.len() < needed {
            words.resize(needed, 0);
        }
        let mut image = byteorder::halves_to_wire(&words);
        let start = dsi * HALF_BYTES;
        image[start..start + bytes.len()].copy_from_slice(bytes);
        let magnitude = BigUint::new(byteorder::wire_to_halves(&image));
        let sign = if self.sign() == Sign::Minus { Sign::Minus } else { Sign::Plus };
        let num = BigInt::from_biguint(sign, magnitude);
        let den = self.0.den.clone();
        let g = num.gcd(&den);
        if g.is_one() || g.is_zero() {
            Number(Rc::new(Rational { num, den }))
        } else {
            Number(Rc::new(Rational { num: num / &g, den: den / &g }))
        }
    }
}

fn digit_summary(n: &BigInt) -> (usize, u32) {
    let mut digits = n.magnitude().iter_u32_digits();
    let len = digits.len().max(1);
    (len, digits.next().unwrap_or(0))
}

fn parse_digits(digits: &str, radix: u32) -> Option<BigInt> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

fn parse_decimal(body: &str, literal: &str) -> Result<(BigInt, BigInt), NumberError> {
    let malformed = || NumberError::Malformed(literal.to_owned());
    let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(malformed());
    }
    let digits = format!("{int_part}{frac_part}");
    let num = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(malformed)?;

    let mut scale = -(frac_part.len() as i64);
    if let Some(exp) = exponent {
        let exp: i64 = exp.parse().map_err(|_| malformed())?;
        scale = scale
            .checked_add(exp)
            .ok_or_else(|| NumberError::ExponentTooBig(literal.to_owned()))?;
    }
    if scale.unsigned_abs() > MAX_EXPONENT {
        return Err(NumberError::ExponentTooBig(literal.to_owned()));
    }
    let power = num_traits::pow(BigInt::from(10u32), scale.unsigned_abs() as usize);
    if scale >= 0 { Ok((num * power, BigInt::one())) } else { Ok((num, power)) }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.0.num == other.0.num && self.0.den == other.0.den)
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.num.hash(state);
        self.0.den.hash(state);
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.0.num)
        } else {
            write!(f, "{}/{}", self.0.num, self.0.den)
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::from_i64(value)
    }
}

/// Complex value with rational parts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Complex {
    pub re: Number,
    pub im: Number,
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im.sign() == Sign::Minus {
            write!(f, "{}{}i", self.re, self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reduces_and_normalizes_sign() {
        let n = Number::new(BigInt::from(6), BigInt::from(-8)).unwrap();
        assert_eq!(n.num(), &BigInt::from(-3));
        assert_eq!(n.den(), &BigInt::from(4));
        assert_eq!(n.to_string(), "-3/4");
    }

    #[test]
    fn zero_denominator_is_rejected() {
        let err = Number::new(BigInt::one(), BigInt::zero()).unwrap_err();
        assert_eq!(err, NumberError::DivisionByZero);
        assert_eq!(err.code(), errcode::E_DIVBYZERO);
    }

    #[test]
    fn parse_literal_forms() {
        assert_eq!(Number::parse("12").unwrap(), Number::from_i64(12));
        assert_eq!(Number::parse("1.25").unwrap().to_string(), "5/4");
        assert_eq!(Number::parse("1e3").unwrap(), Number::from_i64(1000));
        assert_eq!(Number::parse("1.5e-2").unwrap().to_string(), "3/200");
        assert_eq!(Number::parse("0x1f").unwrap(), Number::from_i64(31));
        assert_eq!(Number::parse("0b101").unwrap(), Number::from_i64(5));
        assert_eq!(Number::parse("-3/4").unwrap().to_string(), "-3/4");
        assert_eq!(Number::parse(".5").unwrap().to_string(), "1/2");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(Number::parse("1.2.3"), Err(NumberError::Malformed(_))));
        assert!(matches!(Number::parse("0xg"), Err(NumberError::Malformed(_))));
        assert!(matches!(Number::parse(""), Err(NumberError::Malformed(_))));
        assert!(matches!(Number::parse("1e99999999"), Err(NumberError::ExponentTooBig(_))));
        assert_eq!(Number::parse("1/0").unwrap_err(), NumberError::DivisionByZero);
    }

    #[test]
    fn link_and_drop_track_owners() {
        let n = Number::from_i64(7);
        assert_eq!(n.links(), 1);
        let m = n.link();
        assert!(m.ptr_eq(&n));
        assert_eq!(n.links(), 2);
        drop(m);
        assert_eq!(n.links(), 1);
    }

    #[test]
    fn numerator_bytes_are_little_endian_words() {
        let n = Number::from_i64(0x0102_0304_0506);
        assert_eq!(n.numerator_len(), 2);
        assert_eq!(n.numerator_bytes(), vec![6, 5, 4, 3, 2, 1, 0, 0]);
        assert_eq!(Number::zero().numerator_bytes(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn with_numerator_bytes_extends_and_keeps_sign() {
        let n = Number::from_i64(-1);
        let m = n.with_numerator_bytes(1, &[2]);
        assert_eq!(m.numerator_len(), 2);
        assert_eq!(m.num(), &(-(BigInt::from(2u64 << 32) + 1u32)));
        assert_eq!(n, Number::from_i64(-1));
    }

    #[test]
    fn with_numerator_bytes_overwrites_in_place() {
        let n = Number::from_i64(0x1234);
        let m = n.with_numerator_bytes(0, &[0xff]);
        assert_eq!(m, Number::from_i64(0x12ff));
    }

    #[test]
    fn low_octet_uses_integer_part() {
        assert_eq!(Number::from_i64(0x1ff).low_octet(), 0xff);
        assert_eq!(Number::parse("7/2").unwrap().low_octet(), 3);
        assert_eq!(Number::from_i64(-2).low_octet(), 2);
    }

    #[test]
    fn digit_profile_differs_on_sign() {
        let a = Number::from_i64(5).digit_profile();
        let b = Number::from_i64(-5).digit_profile();
        assert_ne!(a, b);
        assert_eq!(a.num_low, b.num_low);
    }
}
