// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Disk storage sources and their backing chains
//!
//! A virtual machine disk image with copy-on-write backing files forms a
//! chain: a qcow2 overlay backed by another qcow2, backed perhaps by a raw
//! network volume. [`StorageSource`] models one element of such a chain and
//! exclusively owns its successor, so a chain is a singly linked list that is
//! deep-copied and dropped by plain structural recursion.

use core::fmt;
use std::io;
use std::os::fd::OwnedFd;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod auth;
pub mod cookie;
pub mod devkey;
pub mod net;
pub mod nvme;
pub mod pool;
pub mod pr;
pub mod seclabel;
pub mod specifier;

use crate::auth::{AuthDef, SecretLookup};
use crate::cookie::Cookie;
use crate::net::{HostTransport, NetHost, NetProtocol};
use crate::nvme::NvmeDef;
use crate::pool::PoolDef;
use crate::pr::ReservationsDef;
use crate::seclabel::SecurityLabel;

/// Error type for the chain crate
#[derive(Debug, Error)]
pub enum Error {
    /// A backing store specifier did not match the `name[n]` grammar
    #[error("malformed backing store specifier '{0}'")]
    InvalidSpecifier(String),

    /// A chain index specifier named a different disk target
    #[error("requested target '{requested}' does not match target '{expected}'")]
    TargetMismatch {
        requested: String,
        expected: String,
    },

    /// An authentication type token outside none/chap/ceph
    #[error("unknown auth type '{0}'")]
    UnknownAuthType(String),

    /// A reservations manager connection type other than "unix"
    #[error("unsupported connection type for reservations: {0}")]
    UnsupportedPrType(String),

    /// A reservations manager connection mode other than "client"
    #[error("unsupported connection mode for reservations: {0}")]
    UnsupportedPrMode(String),

    /// A mandatory descriptor field was absent
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("cookie name must not be empty")]
    EmptyCookieName,

    #[error("cookie name '{0}' contains invalid characters")]
    InvalidCookieName(String),

    #[error("value of cookie '{0}' contains invalid characters")]
    InvalidCookieValue(String),

    #[error("duplicate cookie '{0}'")]
    DuplicateCookie(String),

    #[error("duplicate security label for model '{0}'")]
    DuplicateSecurityLabel(String),

    /// The device identification helper is not present on this system
    #[error("device identification helper is not available")]
    HelperUnavailable,

    /// An I/O error while talking to an external helper
    #[error("io: {0}")]
    IO(#[from] io::Error),
}

/// Kind of host resource a storage source maps to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// No storage attached (terminal chain element, empty drive)
    #[default]
    None,
    /// Regular file
    File,
    /// Block device
    Block,
    /// Directory
    Dir,
    /// Network export reached through a protocol
    Network,
    /// Volume in a storage pool, resolved to concrete storage later
    Volume,
    /// NVMe namespace addressed by PCI controller
    Nvme,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::None => f.write_str("none"),
            StorageKind::File => f.write_str("file"),
            StorageKind::Block => f.write_str("block"),
            StorageKind::Dir => f.write_str("dir"),
            StorageKind::Network => f.write_str("network"),
            StorageKind::Volume => f.write_str("volume"),
            StorageKind::Nvme => f.write_str("nvme"),
        }
    }
}

/// On-disk image format of a storage source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Format not known or not probed yet
    #[default]
    None,
    Raw,
    Dir,
    Bochs,
    Cloop,
    Dmg,
    Iso,
    Vpc,
    Vdi,
    Fat,
    Vhd,
    Ploop,
    Cow,
    Qcow,
    Qcow2,
    Qed,
    Vmdk,
}

impl ImageFormat {
    /// Whether the format can reference a backing file (the cow family).
    pub fn has_backing_format(self) -> bool {
        matches!(
            self,
            ImageFormat::Cow
                | ImageFormat::Qcow
                | ImageFormat::Qcow2
                | ImageFormat::Qed
                | ImageFormat::Vmdk
        )
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ImageFormat::None => "none",
            ImageFormat::Raw => "raw",
            ImageFormat::Dir => "dir",
            ImageFormat::Bochs => "bochs",
            ImageFormat::Cloop => "cloop",
            ImageFormat::Dmg => "dmg",
            ImageFormat::Iso => "iso",
            ImageFormat::Vpc => "vpc",
            ImageFormat::Vdi => "vdi",
            ImageFormat::Fat => "fat",
            ImageFormat::Vhd => "vhd",
            ImageFormat::Ploop => "ploop",
            ImageFormat::Cow => "cow",
            ImageFormat::Qcow => "qcow",
            ImageFormat::Qcow2 => "qcow2",
            ImageFormat::Qed => "qed",
            ImageFormat::Vmdk => "vmdk",
        };
        f.write_str(token)
    }
}

/// Byte-range view into a larger image
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub offset: u64,
    pub size: u64,
    /// Node name of the slice layer, assigned at runtime
    pub nodename: Option<String>,
}

/// Ownership and mode of the file backing a source
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perms {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub label: Option<String>,
}

/// Timestamp snapshot of the backing file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub atime: i64,
    pub btime: i64,
    pub ctime: i64,
    pub mtime: i64,
}

/// Disk encryption parameters. Opaque to chain logic, owned and copied like
/// any other attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDef {
    pub format: String,
    pub secret: Option<SecretLookup>,
}

/// Runtime state of an opened storage source.
///
/// Never carried over by [`StorageSource::copy`]; a fresh node always starts
/// with no open-storage state.
#[derive(Debug, Default)]
pub struct DriverAccess {
    /// Open handle to the image
    pub fd: Option<OwnedFd>,
}

/// Returns true if `backing` looks like a plain file path rather than a
/// protocol specifier such as `nbd:` or `rbd:`.
///
/// A relative file name containing ':' is ambiguous with a protocol prefix;
/// callers wanting a literal colon can prefix the name with `./`.
pub fn is_file_reference(backing: &str) -> bool {
    match (backing.find(':'), backing.find('/')) {
        (Some(colon), Some(slash)) => colon > slash,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

/// Returns true if `backing` is a relative plain file path.
pub fn is_relative_reference(backing: &str) -> bool {
    !backing.starts_with('/') && is_file_reference(backing)
}

/// One element of a disk backing chain.
///
/// Constructed empty and populated by whatever discovered it (configuration
/// or an image format prober). Each node exclusively owns its
/// `backing_store` successor, so dropping the head of a chain releases the
/// whole tail.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageSource {
    /// Disambiguates otherwise identical chain elements
    pub id: u32,
    pub kind: StorageKind,
    pub format: ImageFormat,
    /// Location for file/block/dir kinds; `None` marks an empty source such
    /// as an empty CD-ROM drive
    pub path: Option<String>,
    pub volume: Option<String>,
    pub snapshot: Option<String>,
    /// Network protocol, meaningful only for [`StorageKind::Network`]
    pub protocol: NetProtocol,
    pub hosts: Vec<NetHost>,
    pub cookies: Vec<Cookie>,
    /// Unresolved backing reference exactly as recorded in the image header
    pub backing_store_raw: Option<String>,
    /// Declared format of the raw backing reference, if known
    pub backing_store_raw_format: ImageFormat,
    /// Next element of the chain
    pub backing_store: Option<Box<StorageSource>>,
    /// Path relative to the parent element's directory, used to relocate a
    /// backing file when the chain is copied to a different root
    pub rel_path: Option<String>,
    pub capacity: u64,
    pub allocation: u64,
    pub has_allocation: bool,
    pub physical: u64,
    pub readonly: bool,
    pub shared: bool,
    /// Whether this element was detected by probing rather than configured
    pub detected: bool,
    pub slice: Option<Slice>,
    pub pool: Option<Box<PoolDef>>,
    pub perms: Option<Perms>,
    pub timestamps: Option<Timestamps>,
    /// At most one label per security model
    pub seclabels: Vec<SecurityLabel>,
    pub pr: Option<ReservationsDef>,
    pub nvme: Option<NvmeDef>,
    pub auth: Option<AuthDef>,
    pub encryption: Option<EncryptionDef>,
    /// iSCSI initiator IQN override
    pub initiator_iqn: Option<String>,
    /// Open-storage runtime state, never copied
    #[serde(skip)]
    pub access: Option<DriverAccess>,
}

impl StorageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective storage type of this source.
    ///
    /// A volume source whose pool reference has been resolved reports the
    /// pool's actual type instead of [`StorageKind::Volume`]. Every predicate
    /// below routes through this accessor rather than inspecting `kind`.
    pub fn actual_type(&self) -> StorageKind {
        if self.kind == StorageKind::Volume {
            if let Some(pool) = &self.pool {
                if pool.actual_type != StorageKind::None {
                    return pool.actual_type;
                }
            }
        }

        self.kind
    }

    /// Whether this element is an eligible member of a backing chain.
    /// Useful as the termination test for chain walks.
    pub fn is_backing(&self) -> bool {
        self.kind != StorageKind::None
    }

    /// Whether this element has a backing store behind it.
    pub fn has_backing(&self) -> bool {
        self.is_backing() && self.backing_store.as_ref().is_some_and(|b| b.is_backing())
    }

    /// Whether the source is reachable through a local path.
    pub fn is_local_storage(&self) -> bool {
        // NVMe disks are local but not accessible via `path`
        matches!(
            self.actual_type(),
            StorageKind::File | StorageKind::Block | StorageKind::Dir
        )
    }

    /// Whether the source has no host storage attached, such as an empty
    /// CD-ROM drive.
    pub fn is_empty(&self) -> bool {
        if self.is_local_storage() && self.path.is_none() {
            return true;
        }

        if self.kind == StorageKind::None {
            return true;
        }

        self.kind == StorageKind::Network && self.protocol == NetProtocol::None
    }

    /// Whether the source is a locally accessible block device.
    pub fn is_block_local(&self) -> bool {
        self.actual_type() == StorageKind::Block
    }

    /// Whether the source path is a relative filesystem reference.
    pub fn is_relative(&self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };

        match self.actual_type() {
            StorageKind::File | StorageKind::Block | StorageKind::Dir => {
                is_relative_reference(path)
            }
            _ => false,
        }
    }

    /// Iterator over the backing-eligible elements of the chain, this
    /// element first, stopping at the first non-eligible node.
    pub fn chain(&self) -> impl Iterator<Item = &StorageSource> {
        let mut next = self.is_backing().then_some(self);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.backing_store.as_deref().filter(|b| b.is_backing());
            Some(current)
        })
    }

    /// Whether any element of the chain has managed persistent reservations.
    pub fn chain_has_managed_pr(&self) -> bool {
        self.chain()
            .any(|n| n.pr.as_ref().is_some_and(ReservationsDef::is_managed))
    }

    /// Whether any element of the chain is NVMe storage.
    pub fn chain_has_nvme(&self) -> bool {
        self.chain().any(|n| n.kind == StorageKind::Nvme)
    }

    /// Returns true if `self` and `other` point to the same storage
    /// location. No other configuration is compared.
    pub fn is_same_location(&self, other: &StorageSource) -> bool {
        // there are multiple possibilities to define an empty source
        if self.is_empty() && other.is_empty() {
            return true;
        }

        if self.actual_type() != other.actual_type() {
            return false;
        }

        if self.path != other.path
            || self.volume != other.volume
            || self.snapshot != other.snapshot
        {
            return false;
        }

        if self.kind == StorageKind::Network
            && (self.protocol != other.protocol || self.hosts != other.hosts)
        {
            return false;
        }

        if self.kind == StorageKind::Nvme && self.nvme != other.nvme {
            return false;
        }

        true
    }

    /// Deep-copies this source.
    ///
    /// With `backing_chain` the owned chain behind this element is copied
    /// recursively, one allocation per element; otherwise the copy is a
    /// single detached node with no backing link. The open-storage `access`
    /// state is never copied.
    pub fn copy(&self, backing_chain: bool) -> StorageSource {
        let backing_store = if backing_chain {
            self.backing_store.as_ref().map(|b| Box::new(b.copy(true)))
        } else {
            None
        };

        StorageSource {
            id: self.id,
            kind: self.kind,
            format: self.format,
            path: self.path.clone(),
            volume: self.volume.clone(),
            snapshot: self.snapshot.clone(),
            protocol: self.protocol,
            hosts: self.hosts.clone(),
            cookies: self.cookies.clone(),
            backing_store_raw: self.backing_store_raw.clone(),
            backing_store_raw_format: self.backing_store_raw_format,
            backing_store,
            rel_path: self.rel_path.clone(),
            capacity: self.capacity,
            allocation: self.allocation,
            has_allocation: self.has_allocation,
            physical: self.physical,
            readonly: self.readonly,
            shared: self.shared,
            detected: self.detected,
            slice: self.slice.clone(),
            pool: self.pool.clone(),
            perms: self.perms.clone(),
            timestamps: self.timestamps,
            seclabels: self.seclabels.clone(),
            pr: self.pr.clone(),
            nvme: self.nvme,
            auth: self.auth.clone(),
            encryption: self.encryption.clone(),
            initiator_iqn: self.initiator_iqn.clone(),
            access: None,
        }
    }

    /// Prepares a newly discovered backing element.
    ///
    /// The `shared` and `readonly` flags of the element that referenced it
    /// are always inherited. With `transfer_labels`, the predecessor's
    /// security labels are inherited too, unless this element already
    /// carries labels of its own.
    pub fn init_chain_element(&mut self, predecessor: &StorageSource, transfer_labels: bool) {
        if transfer_labels && self.seclabels.is_empty() {
            self.seclabels = predecessor.seclabels.clone();
        }

        self.shared = predecessor.shared;
        self.readonly = predecessor.readonly;
    }

    /// Clears backing store information of this element, dropping the owned
    /// tail of the chain.
    pub fn backing_store_clear(&mut self) {
        self.rel_path = None;
        self.backing_store_raw = None;
        self.backing_store = None;
    }

    /// Looks up the security label for `model`, if any.
    pub fn security_label(&self, model: &str) -> Option<&SecurityLabel> {
        self.seclabels.iter().find(|l| l.model == model)
    }

    /// Adds a security label, rejecting a second label for the same model.
    pub fn add_security_label(&mut self, label: SecurityLabel) -> Result<(), Error> {
        if self.security_label(&label.model).is_some() {
            return Err(Error::DuplicateSecurityLabel(label.model));
        }

        self.seclabels.push(label);
        Ok(())
    }

    /// Fills in the protocol's default port on TCP hosts that have none.
    pub fn assign_default_ports(&mut self) {
        let port = self.protocol.default_port();

        for host in &mut self.hosts {
            if host.transport == HostTransport::Tcp && host.port == 0 {
                debug!("assigning default port {port} for {} host {}", self.protocol, host.name);
                host.port = port;
            }
        }
    }

    /// Validates all cookies attached to this source.
    pub fn validate_cookies(&self) -> Result<(), Error> {
        cookie::validate_all(&self.cookies)
    }
}

impl fmt::Display for StorageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{} (empty)", self.kind);
        }

        match self.actual_type() {
            StorageKind::Network => {
                write!(f, "{}:", self.protocol)?;
                if let Some(host) = self.hosts.first() {
                    write!(f, "//{}:{}", host.name, host.port)?;
                }
                if let Some(path) = &self.path {
                    write!(f, "/{}", path.trim_start_matches('/'))?;
                }
            }
            StorageKind::Nvme => match &self.nvme {
                Some(nvme) => write!(f, "nvme://{}/{}", nvme.pci_addr, nvme.namespace)?,
                None => f.write_str("nvme")?,
            },
            StorageKind::Volume => match &self.pool {
                Some(pool) => write!(f, "{}/{}", pool.pool, pool.volume)?,
                None => f.write_str("volume")?,
            },
            _ => {
                if let Some(path) = &self.path {
                    f.write_str(path)?;
                }
            }
        }

        write!(f, " ({})", self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvme::{NvmeDef, PciAddress};

    fn file_source(path: &str) -> StorageSource {
        StorageSource {
            kind: StorageKind::File,
            format: ImageFormat::Qcow2,
            path: Some(path.to_owned()),
            ..Default::default()
        }
    }

    fn nbd_source(host: &str, port: u16) -> StorageSource {
        StorageSource {
            kind: StorageKind::Network,
            format: ImageFormat::Raw,
            path: Some("export".to_owned()),
            protocol: NetProtocol::Nbd,
            hosts: vec![NetHost {
                transport: HostTransport::Tcp,
                name: host.to_owned(),
                port,
                socket: None,
            }],
            ..Default::default()
        }
    }

    /// overlay -> mid -> base chain of three local files
    fn chain_of_three() -> StorageSource {
        let base = StorageSource {
            format: ImageFormat::Raw,
            ..file_source("/images/base.raw")
        };
        let mid = StorageSource {
            backing_store: Some(Box::new(base)),
            backing_store_raw: Some("base.raw".to_owned()),
            ..file_source("/images/mid.qcow2")
        };
        StorageSource {
            backing_store: Some(Box::new(mid)),
            backing_store_raw: Some("mid.qcow2".to_owned()),
            ..file_source("/images/overlay.qcow2")
        }
    }

    #[test]
    fn test_file_reference_classification() {
        assert!(!is_file_reference("nbd:export"));
        assert!(!is_file_reference("rbd:pool/image"));
        assert!(is_file_reference("./nbd:thing"));
        assert!(is_file_reference("relative/path"));
        assert!(is_file_reference("/absolute/path"));
        assert!(is_file_reference("plain"));
        assert!(is_file_reference("dir/with:colon"));

        assert!(is_relative_reference("relative/path"));
        assert!(is_relative_reference("./nbd:thing"));
        assert!(!is_relative_reference("/absolute/path"));
        assert!(!is_relative_reference("nbd:export"));
    }

    #[test]
    fn test_empty_sources_compare_equal() {
        let empty_file = StorageSource {
            kind: StorageKind::File,
            ..Default::default()
        };
        let empty_net = StorageSource {
            kind: StorageKind::Network,
            protocol: NetProtocol::None,
            ..Default::default()
        };

        assert!(empty_file.is_empty());
        assert!(empty_net.is_empty());
        assert!(empty_file.is_same_location(&empty_net));
        assert!(empty_net.is_same_location(&empty_file));
    }

    #[test]
    fn test_same_location() {
        let a = file_source("/images/disk.qcow2");
        let b = file_source("/images/disk.qcow2");
        let c = file_source("/images/other.qcow2");

        assert!(a.is_same_location(&a));
        assert!(a.is_same_location(&b));
        assert!(b.is_same_location(&a));
        assert!(!a.is_same_location(&c));

        // format differences are configuration, not location
        let mut raw = file_source("/images/disk.qcow2");
        raw.format = ImageFormat::Raw;
        assert!(a.is_same_location(&raw));
    }

    #[test]
    fn test_same_location_network() {
        let a = nbd_source("alpha", 10809);
        let b = nbd_source("alpha", 10809);
        let other_port = nbd_source("alpha", 10810);
        let other_host = nbd_source("beta", 10809);

        assert!(a.is_same_location(&b));
        assert!(!a.is_same_location(&other_port));
        assert!(!a.is_same_location(&other_host));
    }

    #[test]
    fn test_same_location_nvme() {
        let nvme = |namespace| StorageSource {
            kind: StorageKind::Nvme,
            nvme: Some(NvmeDef {
                namespace,
                managed: true,
                pci_addr: PciAddress {
                    domain: 0,
                    bus: 1,
                    slot: 0,
                    function: 0,
                },
            }),
            ..Default::default()
        };

        assert!(nvme(1).is_same_location(&nvme(1)));
        assert!(!nvme(1).is_same_location(&nvme(2)));
    }

    #[test]
    fn test_actual_type_overrides_volume() {
        let mut src = StorageSource {
            kind: StorageKind::Volume,
            pool: Some(Box::new(PoolDef {
                pool: "default".to_owned(),
                volume: "vol0".to_owned(),
                actual_type: StorageKind::Block,
                ..Default::default()
            })),
            path: Some("/dev/mapper/vol0".to_owned()),
            ..Default::default()
        };

        assert_eq!(src.actual_type(), StorageKind::Block);
        assert!(src.is_block_local());
        assert!(src.is_local_storage());

        // unresolved pool reference stays a volume
        src.pool.as_mut().unwrap().actual_type = StorageKind::None;
        assert_eq!(src.actual_type(), StorageKind::Volume);
        assert!(!src.is_local_storage());
    }

    #[test]
    fn test_is_relative() {
        let mut src = file_source("backing.qcow2");
        assert!(src.is_relative());

        src.path = Some("/absolute.qcow2".to_owned());
        assert!(!src.is_relative());

        src.path = Some("nbd:export".to_owned());
        assert!(!src.is_relative());

        src.path = None;
        assert!(!src.is_relative());
    }

    #[test]
    fn test_chain_walk() {
        let chain = chain_of_three();
        assert!(chain.has_backing());

        let paths: Vec<_> = chain.chain().map(|n| n.path.clone().unwrap()).collect();
        assert_eq!(
            paths,
            ["/images/overlay.qcow2", "/images/mid.qcow2", "/images/base.raw"]
        );

        // a terminal none node never extends the walk
        let mut short = chain_of_three();
        short.backing_store.as_mut().unwrap().backing_store = Some(Box::new(StorageSource::new()));
        assert_eq!(short.chain().count(), 2);
        assert!(!short.backing_store.as_ref().unwrap().has_backing());
    }

    #[test]
    fn test_chain_predicates() {
        let mut chain = chain_of_three();
        assert!(!chain.chain_has_managed_pr());
        assert!(!chain.chain_has_nvme());

        let base = chain
            .backing_store
            .as_mut()
            .unwrap()
            .backing_store
            .as_mut()
            .unwrap();
        base.pr = Some(ReservationsDef {
            managed: Some(true),
            ..Default::default()
        });
        base.kind = StorageKind::Nvme;

        assert!(chain.chain_has_managed_pr());
        assert!(chain.chain_has_nvme());
    }

    #[test]
    fn test_copy_detached() {
        let chain = chain_of_three();
        let copy = chain.copy(false);

        assert!(copy.backing_store.is_none());
        assert!(copy.is_same_location(&chain));
    }

    #[test_log::test]
    fn test_copy_recursive() {
        let mut chain = chain_of_three();
        chain.access = Some(DriverAccess::default());

        let copy = chain.copy(true);

        assert_eq!(copy.chain().count(), chain.chain().count());
        for (orig, copied) in chain.chain().zip(copy.chain()) {
            assert!(orig.is_same_location(copied));
            assert_eq!(orig.backing_store_raw, copied.backing_store_raw);
        }

        // runtime state never crosses a copy
        assert!(copy.access.is_none());
    }

    #[test]
    fn test_init_chain_element() {
        let mut parent = file_source("/images/top.qcow2");
        parent.shared = true;
        parent.readonly = true;
        parent.seclabels = vec![SecurityLabel {
            model: "selinux".to_owned(),
            label: Some("system_u:object_r:svirt_image_t:s0".to_owned()),
            relabel: true,
        }];

        let mut discovered = file_source("/images/base.raw");
        discovered.init_chain_element(&parent, true);

        assert!(discovered.shared);
        assert!(discovered.readonly);
        assert_eq!(discovered.seclabels.len(), 1);
        assert!(discovered.security_label("selinux").is_some());

        // existing labels win over inherited ones
        let mut labelled = file_source("/images/base.raw");
        labelled.seclabels = vec![SecurityLabel {
            model: "dac".to_owned(),
            label: None,
            relabel: false,
        }];
        labelled.init_chain_element(&parent, true);
        assert!(labelled.security_label("selinux").is_none());
        assert!(labelled.security_label("dac").is_some());

        // without transfer the default labelling applies
        let mut unlabelled = file_source("/images/base.raw");
        unlabelled.init_chain_element(&parent, false);
        assert!(unlabelled.seclabels.is_empty());
    }

    #[test]
    fn test_duplicate_security_label_rejected() {
        let mut src = file_source("/images/disk.qcow2");
        src.add_security_label(SecurityLabel {
            model: "selinux".to_owned(),
            label: None,
            relabel: true,
        })
        .unwrap();

        let err = src
            .add_security_label(SecurityLabel {
                model: "selinux".to_owned(),
                label: None,
                relabel: false,
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSecurityLabel(_)));
    }

    #[test]
    fn test_backing_store_clear() {
        let mut chain = chain_of_three();
        chain.rel_path = Some("overlay.qcow2".to_owned());

        chain.backing_store_clear();

        assert!(chain.backing_store.is_none());
        assert!(chain.backing_store_raw.is_none());
        assert!(chain.rel_path.is_none());
        assert!(!chain.has_backing());
    }

    #[test]
    fn test_assign_default_ports() {
        let mut src = nbd_source("alpha", 0);
        src.hosts.push(NetHost {
            transport: HostTransport::Unix,
            name: String::new(),
            port: 0,
            socket: Some("/run/nbd.sock".to_owned()),
        });
        src.hosts.push(NetHost {
            transport: HostTransport::Tcp,
            name: "beta".to_owned(),
            port: 1234,
            socket: None,
        });

        src.assign_default_ports();

        assert_eq!(src.hosts[0].port, 10809);
        // non-TCP transports and explicit ports are left alone
        assert_eq!(src.hosts[1].port, 0);
        assert_eq!(src.hosts[2].port, 1234);
    }

    #[test]
    fn test_has_backing_format() {
        assert!(ImageFormat::Qcow2.has_backing_format());
        assert!(ImageFormat::Vmdk.has_backing_format());
        assert!(!ImageFormat::Raw.has_backing_format());
        assert!(!ImageFormat::None.has_backing_format());
    }

    #[test]
    fn test_serde_round_trip() {
        let chain = chain_of_three();
        let json = serde_json::to_string(&chain).expect("serialize chain");
        let parsed: StorageSource = serde_json::from_str(&json).expect("deserialize chain");

        assert_eq!(parsed.chain().count(), 3);
        for (orig, back) in chain.chain().zip(parsed.chain()) {
            assert!(orig.is_same_location(back));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            chain_of_three().to_string(),
            "/images/overlay.qcow2 (qcow2)"
        );
        assert_eq!(nbd_source("alpha", 10809).to_string(), "nbd://alpha:10809/export (raw)");
        assert_eq!(
            StorageSource {
                kind: StorageKind::File,
                ..Default::default()
            }
            .to_string(),
            "file (empty)"
        );
    }
}
