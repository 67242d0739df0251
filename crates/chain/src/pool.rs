// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Storage pool volume references

use serde::{Deserialize, Serialize};

use crate::StorageKind;

/// How a pool volume is presented to the guest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolMode {
    #[default]
    Default,
    /// Use the host-visible device of the volume
    Host,
    /// Pass the volume through directly
    Direct,
}

/// Reference to a volume in a storage pool.
///
/// `actual_type` stays [`StorageKind::None`] until pool translation resolves
/// the volume to concrete storage; once set it overrides the owning source's
/// kind via [`crate::StorageSource::actual_type`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDef {
    pub pool: String,
    pub volume: String,
    pub actual_type: StorageKind,
    pub mode: PoolMode,
}
