use crate::error::{CatalogError, Result};
use crate::index::IndexBundle;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const REVIEWS_INDEX: &str = "reviews_index";
pub const TITLE_INDEX: &str = "title_index";
pub const DESCRIPTION_INDEX: &str = "description_index";

/// Longest slug in bytes; leaves room for the extension under common
/// 255-byte file name limits.
pub const MAX_SLUG_LEN: usize = 200;
/// Slug used when the query has no characters at all.
pub const EMPTY_QUERY_SLUG: &str = "empty_query";

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("valid regex");
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn artifact(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.json")) }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Opens a file, reporting absence as [`CatalogError::NotFound`].
pub(crate) fn open_artifact(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CatalogError::NotFound(path.to_path_buf()),
        _ => CatalogError::Io(e),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut f = File::create(path)?;
    let json = serde_json::to_string_pretty(value)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = open_artifact(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

pub fn save_index<T: Serialize>(paths: &IndexPaths, name: &str, index: &T) -> Result<()> {
    let path = paths.artifact(name);
    write_json(&path, index)?;
    tracing::info!(artifact = name, path = %path.display(), "index saved");
    Ok(())
}

pub fn load_index<T: DeserializeOwned>(paths: &IndexPaths, name: &str) -> Result<T> {
    read_json(&paths.artifact(name))
}

/// Writes every artifact of a build.
pub fn save_bundle(paths: &IndexPaths, bundle: &IndexBundle) -> Result<()> {
    save_index(paths, REVIEWS_INDEX, &bundle.reviews)?;
    for (name, index) in &bundle.features {
        save_index(paths, name, index)?;
    }
    save_index(paths, TITLE_INDEX, &bundle.title)?;
    save_index(paths, DESCRIPTION_INDEX, &bundle.description)?;
    Ok(())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    write_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    read_json(&paths.meta())
}

/// File-name-safe form of a query: every run of non-word characters becomes
/// a single underscore, cut to [`MAX_SLUG_LEN`] bytes on a char boundary.
pub fn query_slug(query: &str) -> String {
    let mut slug = NON_WORD.replace_all(query, "_").into_owned();
    if slug.is_empty() {
        return EMPTY_QUERY_SLUG.to_string();
    }
    if slug.len() > MAX_SLUG_LEN {
        let mut end = MAX_SLUG_LEN;
        while !slug.is_char_boundary(end) {
            end -= 1;
        }
        slug.truncate(end);
    }
    slug
}

/// Writes one result bundle per query and returns where it went.
pub fn save_query_results<T: Serialize>(dir: &Path, query: &str, results: &T) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", query_slug(query)));
    write_json(&path, results)?;
    Ok(path)
}
