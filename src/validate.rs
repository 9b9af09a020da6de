//! Caller-side checks run before a request is built.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static EMAIL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("valid phone regex"));
static OTP_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("valid otp regex"));
static MPIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}$").expect("valid mpin regex"));

/// Non-blank text.
pub fn required(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(field, "must not be empty"));
  }
  Ok(())
}

pub fn email(value: &str) -> Result<()> {
  if !EMAIL.is_match(value.trim()) {
    return Err(Error::validation("email", "not a valid email address"));
  }
  Ok(())
}

/// 10-15 digits with an optional leading `+`; spaces and dashes are ignored.
pub fn phone(value: &str) -> Result<()> {
  let digits: String = value
    .chars()
    .filter(|c| !c.is_whitespace() && *c != '-')
    .collect();
  if !PHONE.is_match(&digits) {
    return Err(Error::validation("phone", "expected 10 to 15 digits"));
  }
  Ok(())
}

/// One-time login code: exactly six digits.
pub fn otp_code(value: &str) -> Result<()> {
  if !OTP_CODE.is_match(value) {
    return Err(Error::validation("code", "expected a 6 digit code"));
  }
  Ok(())
}

/// Four digit MPIN.
pub fn mpin(value: &str) -> Result<()> {
  if !MPIN.is_match(value) {
    return Err(Error::validation("mpin", "expected 4 digits"));
  }
  Ok(())
}

/// MPIN setup: both entries valid and identical.
pub fn mpin_confirmation(mpin_value: &str, confirmation: &str) -> Result<()> {
  mpin(mpin_value)?;
  if mpin_value != confirmation {
    return Err(Error::validation("mpin", "entries do not match"));
  }
  Ok(())
}
