use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

pub fn ensure_output_dir_does_not_exist(out_dir: &Path) -> anyhow::Result<()> {
    if out_dir.exists() {
        anyhow::bail!("output directory already exists: {}", out_dir.display());
    }
    Ok(())
}

/// Writes `contents` to `path`, refusing to replace an existing file unless
/// `force` is set.
pub fn write_output(path: &Path, contents: &[u8], force: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output parent dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut out = options
        .open(path)
        .with_context(|| format!("open output: {}", path.display()))?;
    out.write_all(contents)
        .with_context(|| format!("write output: {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flush output: {}", path.display()))?;

    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, force: bool) -> anyhow::Result<()> {
    let mut json = serde_json::to_vec_pretty(value).context("serialize json")?;
    json.push(b'\n');
    write_output(path, &json, force)
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read json: {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse json: {}", path.display()))
}
