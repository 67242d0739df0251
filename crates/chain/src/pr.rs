// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! SCSI persistent reservation configuration

use serde::{Deserialize, Serialize};

use crate::Error;

/// Persistent reservations configuration of a disk source.
///
/// With `managed` set, the reservations helper lifecycle is handled for the
/// caller; otherwise an externally run helper is reached through a unix
/// socket in client mode, which is the only supported connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationsDef {
    /// Tri-state: unset, explicitly on, explicitly off
    pub managed: Option<bool>,
    /// Socket path of the reservations helper
    pub path: Option<String>,
    /// Alias of the managing helper, assigned at runtime
    pub mgr_alias: Option<String>,
}

impl ReservationsDef {
    /// Builds a configuration with an explicit helper source, validating the
    /// connection. Only type "unix" in mode "client" is accepted.
    pub fn with_source(
        managed: Option<bool>,
        conn_type: &str,
        path: &str,
        mode: &str,
    ) -> Result<Self, Error> {
        if conn_type != "unix" {
            return Err(Error::UnsupportedPrType(conn_type.to_owned()));
        }

        if mode != "client" {
            return Err(Error::UnsupportedPrMode(mode.to_owned()));
        }

        if path.is_empty() {
            return Err(Error::MissingField("path for reservations"));
        }

        Ok(Self {
            managed,
            path: Some(path.to_owned()),
            mgr_alias: None,
        })
    }

    /// Whether the reservations helper is managed for the caller.
    pub fn is_managed(&self) -> bool {
        self.managed == Some(true)
    }
}
