//! Synthetic class files for tests.

#![allow(dead_code)]

use plugpack_core::archive::{ArchiveEntry, write_archive};
use std::fs;
use std::path::Path;

pub const PLUGIN: &str = "com/lagradost/cloudstream3/plugins/Plugin";
pub const BASE_PLUGIN: &str = "com/lagradost/cloudstream3/plugins/BasePlugin";
pub const OBJECT: &str = "java/lang/Object";

pub const ACC_PUBLIC_SUPER: u16 = 0x0021;
pub const ACC_ABSTRACT_CLASS: u16 = 0x0421;
pub const ACC_INTERFACE: u16 = 0x0601;

/// Encodes a class file header with the given hierarchy.
pub fn class_file(name: &str, super_name: Option<&str>, interfaces: &[&str], flags: u16) -> Vec<u8> {
    let mut pool = Vec::new();
    let mut count: u16 = 0;
    let mut add_class = |internal: &str, pool: &mut Vec<u8>| -> u16 {
        pool.push(1);
        pool.extend_from_slice(&u16::try_from(internal.len()).unwrap().to_be_bytes());
        pool.extend_from_slice(internal.as_bytes());
        let utf8_index = count + 1;
        pool.push(7);
        pool.extend_from_slice(&utf8_index.to_be_bytes());
        count += 2;
        count
    };

    let this_index = add_class(name, &mut pool);
    let super_index = super_name.map_or(0, |s| add_class(s, &mut pool));
    let iface_indices: Vec<u16> = interfaces.iter().map(|&i| add_class(i, &mut pool)).collect();

    let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
    out.extend_from_slice(&(count + 1).to_be_bytes());
    out.extend_from_slice(&pool);
    out.extend_from_slice(&flags.to_be_bytes());
    out.extend_from_slice(&this_index.to_be_bytes());
    out.extend_from_slice(&super_index.to_be_bytes());
    out.extend_from_slice(&u16::try_from(iface_indices.len()).unwrap().to_be_bytes());
    for index in iface_indices {
        out.extend_from_slice(&index.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out
}

/// Writes `<root>/<name>.class`.
pub fn write_class(root: &Path, name: &str, super_name: Option<&str>, interfaces: &[&str], flags: u16) {
    let path = root.join(format!("{name}.class"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, class_file(name, super_name, interfaces, flags)).unwrap();
}

/// Writes a jar containing the given `(internal name, super, flags)` classes.
pub fn write_jar(path: &Path, classes: &[(&str, Option<&str>, u16)]) {
    let entries: Vec<ArchiveEntry> = classes
        .iter()
        .map(|&(name, super_name, flags)| {
            ArchiveEntry::new(format!("{name}.class"), class_file(name, super_name, &[], flags))
        })
        .collect();
    write_archive(path, &entries).unwrap();
}
