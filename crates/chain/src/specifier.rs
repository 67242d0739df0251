// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Backing store specifier parsing.
//!
//! When several elements of a backing chain share a target name, a specifier
//! such as `vda[2]` picks one unambiguously. A bare `vda` leaves the index at
//! 0, meaning "the target itself" or "unspecified" depending on the caller.

use std::sync::OnceLock;

use regex::Regex;

use crate::Error;

// target up to the first '[', optionally followed by an indexed suffix
fn specifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^\[]*)(?:\[(\d+)\])?$").unwrap())
}

/// A parsed `name` or `name[n]` backing store specifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackingStoreSpecifier {
    /// Target device portion of the specifier
    pub target: String,
    /// Requested index within the backing chain, 0 when unspecified
    pub chain_index: u32,
}

impl BackingStoreSpecifier {
    /// Parses a specifier such as `vda[1]` or `sda`. A missing index
    /// defaults to 0.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let caps = specifier_pattern()
            .captures(spec)
            .ok_or_else(|| Error::InvalidSpecifier(spec.to_owned()))?;

        let chain_index = match caps.get(2) {
            Some(digits) => digits
                .as_str()
                .parse()
                .map_err(|_| Error::InvalidSpecifier(spec.to_owned()))?,
            None => 0,
        };

        Ok(Self {
            target: caps[1].to_owned(),
            chain_index,
        })
    }
}

/// Resolves the chain index requested by `spec` against the disk `target`.
///
/// An index of 0, or a specifier that does not parse at all, means the
/// caller did not ask for a specific chain element and resolves to 0. A
/// nonzero index must name `target`, otherwise the request is ambiguous.
pub fn parse_chain_index(target: &str, spec: &str) -> Result<u32, Error> {
    let Ok(parsed) = BackingStoreSpecifier::parse(spec) else {
        return Ok(0);
    };

    if parsed.chain_index == 0 {
        return Ok(0);
    }

    if parsed.target != target {
        return Err(Error::TargetMismatch {
            requested: parsed.target,
            expected: target.to_owned(),
        });
    }

    Ok(parsed.chain_index)
}
