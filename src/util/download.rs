//! Remote artifact fetching.
//!
//! Downloads land in a `TempDir` first and are only moved into place once
//! complete (and verified when the URL carries a `#sha256=<hex>` fragment).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use tracing::{debug, info};
use url::Url;

use crate::util::archive;
use crate::util::fs as pfs;
use crate::util::hash;

/// Expected SHA-256 carried in a `#sha256=` URL fragment.
pub fn expected_sha256(url: &Url) -> Option<&str> {
    url.fragment()
        .and_then(|f| f.strip_prefix("sha256="))
        .filter(|h| !h.is_empty())
}

/// File name of the last URL path segment.
pub fn url_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| hash::short_digest(url.as_str()))
}

/// Download `url` into `dir`, returning the downloaded file path.
///
/// `file://` URLs are copied.
pub fn download_file(url: &Url, dir: &Path) -> Result<PathBuf> {
    let dest = dir.join(url_file_name(url));
    let mut without_fragment = url.clone();
    without_fragment.set_fragment(None);

    if url.scheme() == "file" {
        let src = url
            .to_file_path()
            .map_err(|_| anyhow::anyhow!("invalid file url: {}", url))?;
        std::fs::copy(&src, &dest)
            .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;
    } else {
        info!("downloading {}", without_fragment);
        let response = reqwest::blocking::get(without_fragment.as_str())
            .with_context(|| format!("failed to download {}", without_fragment))?;
        if !response.status().is_success() {
            bail!(
                "failed to download {}: HTTP {}",
                without_fragment,
                response.status()
            );
        }

        let pb = progress_bar(response.content_length(), &url_file_name(url));
        let mut reader = pb.wrap_read(response);
        let mut file = File::create(&dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;
        io::copy(&mut reader, &mut file)
            .with_context(|| format!("failed to read response body from {}", without_fragment))?;
        pb.finish_and_clear();
    }

    if let Some(expected) = expected_sha256(url) {
        hash::verify_sha256(&dest, expected)?;
        debug!("checksum verified for {}", dest.display());
    }

    Ok(dest)
}

/// Fetch `url` and place its contents in `dest`.
///
/// Tarballs are extracted (with `strip_prefix` applied); other files are
/// copied into `dest` under their URL file name.
pub fn fetch_into(url: &Url, dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let staging = TempDir::new().context("failed to create temporary download directory")?;
    let file = download_file(url, staging.path())?;

    pfs::ensure_dir(dest)?;
    let name = pfs::file_name(&file);
    if archive::is_tarball(&name) {
        archive::extract_tarball_file(&file, dest, strip_prefix)?;
    } else {
        let target = dest.join(&name);
        std::fs::copy(&file, &target)
            .with_context(|| format!("failed to copy download to {}", target.display()))?;
    }
    Ok(())
}

/// Fetch `url` into `dest` unless a marker records a previous fetch.
///
/// Returns `true` when work was done.
pub fn fetch_once(url: &Url, dest: &Path) -> Result<bool> {
    let marker = dest
        .join(".psproject")
        .join(format!("{}.fetched", hash::short_digest(url.as_str())));
    if marker.exists() {
        debug!("{} already fetched into {}", url, dest.display());
        return Ok(false);
    }

    fetch_into(url, dest, None)?;
    pfs::write_string(&marker, url.as_str())?;
    Ok(true)
}

fn progress_bar(len: Option<u64>, name: &str) -> ProgressBar {
    let pb = match len {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(name.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_url(path: &Path) -> Url {
        Url::from_file_path(path).unwrap()
    }

    #[test]
    fn test_sha256_fragment() {
        let url = Url::parse("https://example.com/a.tar.gz#sha256=abcd").unwrap();
        assert_eq!(expected_sha256(&url), Some("abcd"));
        assert_eq!(url_file_name(&url), "a.tar.gz");

        let plain = Url::parse("https://example.com/a.tar.gz").unwrap();
        assert_eq!(expected_sha256(&plain), None);
    }

    #[test]
    fn test_fetch_once_uses_marker() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("resource.txt");
        std::fs::write(&src, "payload").unwrap();
        let dest = tmp.path().join("support").join("mybackend");

        let url = file_url(&src);
        assert!(fetch_once(&url, &dest).unwrap());
        assert_eq!(std::fs::read_to_string(dest.join("resource.txt")).unwrap(), "payload");

        std::fs::remove_file(dest.join("resource.txt")).unwrap();
        assert!(!fetch_once(&url, &dest).unwrap());
        assert!(!dest.join("resource.txt").exists());
    }

    #[test]
    fn test_checksum_mismatch_fails() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("resource.txt");
        std::fs::write(&src, "payload").unwrap();

        let mut url = file_url(&src);
        url.set_fragment(Some("sha256=0000"));
        let err = fetch_into(&url, &tmp.path().join("out"), None).unwrap_err();
        assert!(format!("{:#}", err).contains("checksum mismatch"));
    }
}
