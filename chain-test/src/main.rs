// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;

use log::info;

use canonpath::{Resolved, SystemResolver};
use chain::net::{HostTransport, NetHost, NetProtocol};
use chain::specifier::{parse_chain_index, BackingStoreSpecifier};
use chain::{ImageFormat, StorageKind, StorageSource};

/// Builds a qcow2 overlay, backed by another qcow2, backed by a raw NBD
/// export, the way a chain would look after probing image headers.
fn build_demo_chain() -> StorageSource {
    let mut base = StorageSource {
        kind: StorageKind::Network,
        format: ImageFormat::Raw,
        path: Some("export/base".to_owned()),
        protocol: NetProtocol::Nbd,
        hosts: vec![NetHost {
            transport: HostTransport::Tcp,
            name: "storage.example.com".to_owned(),
            port: 0,
            socket: None,
        }],
        ..Default::default()
    };
    base.assign_default_ports();

    let mid = StorageSource {
        kind: StorageKind::File,
        format: ImageFormat::Qcow2,
        path: Some("/images/mid.qcow2".to_owned()),
        backing_store_raw: Some("nbd://storage.example.com/export/base".to_owned()),
        backing_store: Some(Box::new(base)),
        ..Default::default()
    };

    StorageSource {
        kind: StorageKind::File,
        format: ImageFormat::Qcow2,
        path: Some("/images/overlay.qcow2".to_owned()),
        backing_store_raw: Some("mid.qcow2".to_owned()),
        backing_store: Some(Box::new(mid)),
        ..Default::default()
    }
}

/// Demonstrates usage of the chain APIs including:
/// - Walking and deep-copying a backing chain
/// - Resolving backing store specifiers
/// - Canonicalizing paths with injected and real symlink resolvers
fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    info!("Starting backing chain demo");

    let chain = build_demo_chain();
    info!("Backing chain:");
    for (depth, element) in chain.chain().enumerate() {
        info!("  [{depth}] {element}");
    }

    let copy = chain.copy(true);
    info!(
        "Deep copy has {} elements, location match: {}",
        copy.chain().count(),
        chain
            .chain()
            .zip(copy.chain())
            .all(|(a, b)| a.is_same_location(b))
    );

    let spec = BackingStoreSpecifier::parse("vda[2]")?;
    info!(
        "Specifier 'vda[2]' -> target '{}', index {}",
        spec.target, spec.chain_index
    );
    info!(
        "Chain index for disk 'vda': {}",
        parse_chain_index("vda", "vda[2]")?
    );

    // canonicalization against a synthetic filesystem
    let mut fake = |path: &str| -> io::Result<Resolved> {
        if path == "/images" {
            Ok(Resolved::Link("/var/lib/images".to_owned()))
        } else {
            Ok(Resolved::NotLink)
        }
    };
    let canon = canonpath::canonicalize("/images/./overlay.qcow2", &mut fake)?;
    info!("Canonicalized overlay path: {canon}");

    // and against the live filesystem
    let canon = canonpath::canonicalize("/tmp/..//etc/./hostname", &mut SystemResolver)?;
    info!("Canonicalized system path: {canon}");

    info!("Demo completed successfully");
    Ok(())
}
