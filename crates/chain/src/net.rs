// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Network storage protocols and host descriptors.
//!
//! A network storage source names a protocol and an ordered list of hosts to
//! reach the export through. Hosts on TCP transports may leave the port at 0
//! and have the protocol's customary default filled in later.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Protocol used to reach a network storage source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetProtocol {
    #[default]
    None,
    Nbd,
    Rbd,
    Sheepdog,
    Gluster,
    Iscsi,
    Http,
    Https,
    Ftp,
    Ftps,
    Tftp,
    Ssh,
    Vxhs,
    Nfs,
}

impl NetProtocol {
    /// Customary TCP port of the protocol, 0 when there is none.
    pub fn default_port(self) -> u16 {
        match self {
            NetProtocol::Http => 80,
            NetProtocol::Https => 443,
            NetProtocol::Ftp => 21,
            NetProtocol::Ftps => 990,
            NetProtocol::Tftp => 69,
            NetProtocol::Sheepdog => 7000,
            NetProtocol::Nbd => 10809,
            NetProtocol::Ssh => 22,
            NetProtocol::Iscsi => 3260,
            NetProtocol::Gluster => 24007,
            NetProtocol::Vxhs => 9999,
            // no customary default for RBD; NFS does not take a port
            NetProtocol::Rbd | NetProtocol::Nfs | NetProtocol::None => 0,
        }
    }
}

impl fmt::Display for NetProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            NetProtocol::None => "none",
            NetProtocol::Nbd => "nbd",
            NetProtocol::Rbd => "rbd",
            NetProtocol::Sheepdog => "sheepdog",
            NetProtocol::Gluster => "gluster",
            NetProtocol::Iscsi => "iscsi",
            NetProtocol::Http => "http",
            NetProtocol::Https => "https",
            NetProtocol::Ftp => "ftp",
            NetProtocol::Ftps => "ftps",
            NetProtocol::Tftp => "tftp",
            NetProtocol::Ssh => "ssh",
            NetProtocol::Vxhs => "vxhs",
            NetProtocol::Nfs => "nfs",
        };
        f.write_str(token)
    }
}

/// Transport used to reach a storage host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostTransport {
    #[default]
    Tcp,
    Unix,
    Rdma,
}

/// One endpoint a network storage source is reachable through
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetHost {
    pub transport: HostTransport,
    /// Hostname or address; empty for unix socket transports
    pub name: String,
    /// Port on TCP transports, 0 when unset
    pub port: u16,
    /// Socket path for unix transports
    pub socket: Option<String>,
}
