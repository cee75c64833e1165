#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use samequals::ReferenceSet;

/// First 240 bp of the human mitochondrial reference (rCRS).
pub const CHR_M: &str = "GATCACAGGTCTATCACCCTATTAACCACTCACGGGAGCTCTCCATGCATTTGGTATTTTCGTCTGGGGGGTGTGCACGCGATAGCATTGCGAGACGCTGGAGCCGGAGCACCCTATGTCGCAGTATCTGTCTTTGATTCCTGCCTCATTCTATTATTTATCGCACCTACGTTCAATATTACAGGCGAACATACCTACTAAAGTGTGTTAATTAATTAATGCTTGTAGGACATAATAATA";

/// Short synthetic reference used by the worked examples.
pub const CHR_T: &str = "ACGTWWWACGT";

pub fn reference_set() -> ReferenceSet {
    let mut set = ReferenceSet::new();
    set.insert("chrM", CHR_M).expect("insert chrM");
    set.insert("chrT", CHR_T).expect("insert chrT");
    set
}

fn data_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

pub fn read_data(name: &str) -> String {
    let path = data_root().join(name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("test data {:?} not found", path))
}

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("SAMEQUALS_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set SAMEQUALS_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}
