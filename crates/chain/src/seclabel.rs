// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Per-device security label overrides

use serde::{Deserialize, Serialize};

/// Security label applied to one storage source under one model.
///
/// A source carries at most one label per model name; the list invariant is
/// enforced by [`crate::StorageSource::add_security_label`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityLabel {
    /// Security model the label applies to, e.g. "selinux" or "dac"
    pub model: String,
    /// Label to apply, when overriding the model's default
    pub label: Option<String>,
    /// Whether the image should be relabelled on start
    pub relabel: bool,
}
