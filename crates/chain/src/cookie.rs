// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! HTTP cookie descriptors for network disk sources.
//!
//! Validation follows the character rules of RFC 6265 section 4.1.1.

use serde::{Deserialize, Serialize};

use crate::Error;

// see https://tools.ietf.org/html/rfc6265#section-4.1.1
fn value_char_invalid(c: char) -> bool {
    matches!(c, '\x01'..='\x1f' | ' ' | '"' | ',' | ';' | '\\')
}

// in addition the cookie name can't contain these
fn name_char_invalid(c: char) -> bool {
    value_char_invalid(c)
        || matches!(
            c,
            '(' | ')' | '<' | '>' | '@' | ':' | '/' | '[' | ']' | '?' | '=' | '{' | '}'
        )
}

/// One cookie passed along with http/https disk requests
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }

    /// Validates the cookie's name and value character sets. The value may
    /// be wrapped in one matching pair of double quotes.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::EmptyCookieName);
        }

        if self.name.chars().any(name_char_invalid) {
            return Err(Error::InvalidCookieName(self.name.clone()));
        }

        let (value, quoted) = match self.value.strip_prefix('"') {
            Some(rest) => (
                rest.strip_suffix('"')
                    .ok_or_else(|| Error::InvalidCookieValue(self.name.clone()))?,
                true,
            ),
            None => (self.value.as_str(), false),
        };

        // a quoted value may contain spaces, everything else stays forbidden
        if value
            .chars()
            .any(|c| value_char_invalid(c) && !(quoted && c == ' '))
        {
            return Err(Error::InvalidCookieValue(self.name.clone()));
        }

        Ok(())
    }
}

/// Validates every cookie in the list and rejects duplicate names.
/// Order of the list is irrelevant but names are case sensitive.
pub fn validate_all(cookies: &[Cookie]) -> Result<(), Error> {
    for (i, cookie) in cookies.iter().enumerate() {
        cookie.validate()?;

        if cookies[i + 1..].iter().any(|c| c.name == cookie.name) {
            return Err(Error::DuplicateCookie(cookie.name.clone()));
        }
    }

    Ok(())
}
