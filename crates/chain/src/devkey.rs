// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Device identification key helpers.
//!
//! Thin wrappers over the udev `scsi_id` helper, used to obtain stable
//! identifiers for SCSI and NPIV devices when comparing chain elements that
//! sit on block devices.

use std::io;
use std::process::Command;

use log::debug;

use crate::Error;

const SCSI_ID: &str = "/lib/udev/scsi_id";

fn run_scsi_id(extra_args: &[&str], path: &str) -> Result<Option<String>, Error> {
    let output = Command::new(SCSI_ID)
        .args(["--replace-whitespace", "--whitelisted"])
        .args(extra_args)
        .args(["--device", path])
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::HelperUnavailable,
            _ => Error::IO(e),
        })?;

    if !output.status.success() {
        // a nonzero exit just means no key is available for this device
        debug!("scsi_id exited with {} for {path}", output.status);
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}

/// Queries the unique SCSI key for the device at `path`.
///
/// Returns `Ok(None)` when the helper produced no usable key, and
/// [`Error::HelperUnavailable`] when the helper binary is not present.
pub fn scsi_key(path: &str) -> Result<Option<String>, Error> {
    let Some(out) = run_scsi_id(&[], path)? else {
        return Ok(None);
    };

    let key = out.lines().next().unwrap_or("").trim();
    if key.is_empty() {
        return Ok(None);
    }

    Ok(Some(key.to_owned()))
}

/// Queries the unique NPIV key for the device at `path`.
///
/// Unlike a plain SCSI disk, an NPIV LUN is identified by its serial and
/// target port together, joined as `{serial}_PORT{port}`.
pub fn npiv_key(path: &str) -> Result<Option<String>, Error> {
    let Some(out) = run_scsi_id(&["--export"], path)? else {
        return Ok(None);
    };

    let mut serial = None;
    let mut port = None;

    for line in out.lines() {
        if let Some(value) = line.strip_prefix("ID_SERIAL=") {
            serial = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("ID_TARGET_PORT=") {
            port = Some(value.trim());
        }
    }

    match (serial, port) {
        (Some(serial), Some(port)) if !serial.is_empty() && !port.is_empty() => {
            Ok(Some(format!("{serial}_PORT{port}")))
        }
        _ => Ok(None),
    }
}
