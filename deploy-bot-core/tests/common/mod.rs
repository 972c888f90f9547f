#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Writes a zip at `path` holding `entries` (name, contents). Names ending in
/// `/` become directory entries.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).expect("create zip");
    let mut zip = ZipWriter::new(file);
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, SimpleFileOptions::default()).expect("add directory");
        } else {
            zip.start_file(*name, SimpleFileOptions::default()).expect("start file");
            zip.write_all(contents.as_bytes()).expect("write entry");
        }
    }
    zip.finish().expect("finish zip");
}

/// A zipball shaped like GitHub's: everything under one wrapper folder.
pub fn github_zipball(path: &Path) {
    write_zip(
        path,
        &[
            ("owner-repo-abc1234/", ""),
            ("owner-repo-abc1234/README.md", "# readme"),
            ("owner-repo-abc1234/data/", ""),
            ("owner-repo-abc1234/data/items.json", r#"{"sword":1}"#),
            ("owner-repo-abc1234/data/prices.csv", "item,price\nsword,10"),
            ("owner-repo-abc1234/scripts/init.luau", "return {}"),
            ("owner-repo-abc1234/scripts/legacy.lua", "return nil"),
            ("owner-repo-abc1234/notes.txt", "notes"),
            ("owner-repo-abc1234/assets/logo.png", "png"),
            ("owner-repo-abc1234/data/items.json.bak", "old"),
        ],
    );
}

/// Bytes of a GitHub-shaped zipball, for serving from a mock server.
pub fn github_zipball_bytes() -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("repo.zip");
    github_zipball(&path);
    std::fs::read(path).expect("read zip")
}
