// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Symlink-aware path canonicalization
//!
//! [`canonicalize`] rewrites a path into a form with no `.` or `..`
//! components, no repeated slashes and no symbolic links left to follow, so
//! two paths naming the same file compare equal as strings. The filesystem is
//! never touched directly: symlink knowledge is injected through a
//! [`ResolveLink`] implementation, which makes the algorithm usable against
//! remote or recorded filesystem state and keeps it trivially testable.

use std::collections::HashSet;
use std::{fs, io};

use log::trace;
use thiserror::Error;

/// Errors that can occur while canonicalizing a path
#[derive(Debug, Error)]
pub enum Error {
    /// A prefix of the path resolved through the same symlink twice
    #[error("too many levels of symbolic links while canonicalizing '{path}'")]
    ResolutionCycle {
        /// The path whose canonicalization failed
        path: String,
    },

    /// The injected link resolver itself failed
    #[error("failed to resolve '{path}'")]
    Resolver {
        /// The prefix that was being probed
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Outcome of probing a path prefix for a symbolic link
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// The path is not a symbolic link
    NotLink,
    /// The path is a symbolic link pointing at the contained target
    Link(String),
}

/// Source of symlink information for [`canonicalize`].
///
/// Within one canonicalization call the same path must always yield the same
/// outcome, otherwise cycle detection cannot be trusted.
pub trait ResolveLink {
    /// Reports whether `path` is a symbolic link and where it points.
    fn resolve_link(&mut self, path: &str) -> io::Result<Resolved>;
}

impl<F> ResolveLink for F
where
    F: FnMut(&str) -> io::Result<Resolved>,
{
    fn resolve_link(&mut self, path: &str) -> io::Result<Resolved> {
        self(path)
    }
}

/// Resolver backed by the live filesystem via lstat/readlink.
///
/// Prefixes that do not exist are reported as not being links, so paths
/// naming files yet to be created still canonicalize lexically.
#[derive(Debug, Default)]
pub struct SystemResolver;

impl ResolveLink for SystemResolver {
    fn resolve_link(&mut self, path: &str) -> io::Result<Resolved> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Resolved::NotLink),
            Err(e) => return Err(e),
        };

        if meta.file_type().is_symlink() {
            let target = fs::read_link(path)?;
            Ok(Resolved::Link(target.to_string_lossy().into_owned()))
        } else {
            Ok(Resolved::NotLink)
        }
    }
}

/// Leading slash flags of `path`: whether it is absolute, and whether it
/// starts with exactly two slashes. POSIX collapses `///` and more to a
/// single slash but reserves `//` as a distinct root.
fn leading_slashes(path: &str) -> (bool, bool) {
    let bytes = path.as_bytes();
    let slash = bytes.first() == Some(&b'/');
    let double = slash && bytes.get(1) == Some(&b'/') && bytes.get(2) != Some(&b'/');
    (slash, double)
}

fn format_path(components: &[String], begin_slash: bool, begin_double_slash: bool) -> String {
    let mut out = String::new();

    if begin_slash {
        out.push('/');
    }

    if begin_double_slash {
        out.push('/');
    }

    out.push_str(&components.join("/"));
    out
}

/// Canonicalizes `path`, resolving `.`, `..` and symbolic links.
///
/// The path is scanned component by component, left to right. For each
/// component the prefix built so far is offered to `resolver`; a reported
/// link target is spliced into the component list in place of the component
/// that was a link and scanning resumes at the splice point, so targets that
/// themselves contain links, dot segments or absolute jumps are handled. A
/// `..` that cannot be cancelled against a preceding component of a relative
/// path is kept verbatim. An all-empty result renders as the empty string.
///
/// Termination is guaranteed by refusing to resolve the same prefix through
/// a link twice, which surfaces as [`Error::ResolutionCycle`].
pub fn canonicalize<R>(path: &str, resolver: &mut R) -> Result<String, Error>
where
    R: ResolveLink,
{
    let (mut begin_slash, mut begin_double_slash) = leading_slashes(path);
    let mut components: Vec<String> = path
        .split('/')
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    let mut cycle: HashSet<String> = HashSet::new();
    let mut i = 0;

    while i < components.len() {
        // skip '.' unless it's the last one remaining on a relative path
        if components[i] == "." && (begin_slash || components.len() > 1) {
            components.remove(i);
            continue;
        }

        // cancel '..' against the preceding component; leading '..' on a
        // relative path cannot be resolved without filesystem context
        if components[i] == ".." {
            if !begin_slash && (i == 0 || components[i - 1] == "..") {
                i += 1;
                continue;
            }

            components.remove(i);

            if i != 0 {
                components.remove(i - 1);
                i -= 1;
            }

            continue;
        }

        // check whether the path resolved so far is a symlink
        let current = format_path(&components[..=i], begin_slash, begin_double_slash);

        let target = match resolver.resolve_link(&current) {
            Ok(Resolved::NotLink) => {
                i += 1;
                continue;
            }
            Ok(Resolved::Link(target)) => target,
            Err(source) => return Err(Error::Resolver { path: current, source }),
        };

        if !cycle.insert(current.clone()) {
            return Err(Error::ResolutionCycle {
                path: path.to_owned(),
            });
        }

        trace!("'{current}' is a symlink to '{target}'");

        if target.starts_with('/') {
            // everything resolved so far is replaced by the link's root
            components.drain(..=i);
            (begin_slash, begin_double_slash) = leading_slashes(&target);
            i = 0;
        } else {
            components.remove(i);
        }

        // splice the target in place of the link and re-scan from the first
        // spliced component, which may itself be a link
        components.splice(
            i..i,
            target.split('/').filter(|c| !c.is_empty()).map(String::from),
        );
    }

    Ok(format_path(&components, begin_slash, begin_double_slash))
}
