// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Authentication descriptors for network disk sources

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Authentication scheme used against the storage server
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    None,
    /// CHAP, used by iSCSI
    Chap,
    /// Cephx, used by RBD
    Ceph,
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(AuthType::None),
            "chap" => Ok(AuthType::Chap),
            "ceph" => Ok(AuthType::Ceph),
            other => Err(Error::UnknownAuthType(other.to_owned())),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::None => f.write_str("none"),
            AuthType::Chap => f.write_str("chap"),
            AuthType::Ceph => f.write_str("ceph"),
        }
    }
}

/// Reference to an externally stored secret
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretLookup {
    /// Look the secret up by UUID
    Uuid(String),
    /// Look the secret up by usage name
    Usage(String),
}

/// Credentials for authenticating against a storage server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDef {
    pub username: String,
    pub auth_type: AuthType,
    /// Expected secret type recorded by the caller; kept as a plain string
    /// since only disk configuration code interprets it
    pub secret_type: Option<String>,
    pub secret: Option<SecretLookup>,
}

impl AuthDef {
    /// Builds an authentication descriptor. The username is mandatory.
    pub fn new(username: &str, auth_type: AuthType) -> Result<Self, Error> {
        if username.is_empty() {
            return Err(Error::MissingField("username for auth"));
        }

        Ok(Self {
            username: username.to_owned(),
            auth_type,
            secret_type: None,
            secret: None,
        })
    }
}
