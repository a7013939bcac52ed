//! Boot parameters
//!
//! A viewer is started from an ordered list of document sources plus an
//! optional external link. Sources come either as a single `file` value or a
//! pipe-delimited `files` value; both normalize to the same list.

use log::debug;
use url::Url;

const FILES_KEY: &str = "files";
const FILE_KEY: &str = "file";
const LINK_KEY: &str = "drive";
const SOURCE_DELIMITER: char = '|';

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("invalid viewer address: {0}")]
    InvalidAddress(#[from] url::ParseError),
}

/// Normalized boot parameters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewerParams {
    /// Document sources in display order, never containing blank entries
    pub sources: Vec<String>,
    /// Link back to where the documents came from, for display only
    pub external_link: Option<String>,
}

impl ViewerParams {
    /// Build from raw parameter values. `files` wins over `file` when it is
    /// non-empty.
    #[must_use]
    pub fn from_values(files: Option<&str>, file: Option<&str>, link: Option<&str>) -> Self {
        let sources = match files.filter(|f| !f.is_empty()) {
            Some(files) => split_sources(files),
            None => file
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(|f| vec![f.to_string()])
                .unwrap_or_default(),
        };

        Self {
            sources,
            external_link: link
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        }
    }

    /// Parse a viewer address such as `https://host/viewer.html?files=a.pdf|b.pdf`.
    ///
    /// Relative sources are resolved against the address.
    pub fn from_address(address: &str) -> Result<Self, ParamsError> {
        let base = Url::parse(address)?;

        let mut files = None;
        let mut file = None;
        let mut link = None;
        for (key, value) in base.query_pairs() {
            match key.as_ref() {
                FILES_KEY => files = Some(value.into_owned()),
                FILE_KEY => file = Some(value.into_owned()),
                LINK_KEY => link = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut params = Self::from_values(files.as_deref(), file.as_deref(), link.as_deref());
        params.sources = params
            .sources
            .into_iter()
            .map(|source| resolve_against(&base, source))
            .collect();

        debug!("Viewer address resolved to {:?}", params.sources);
        Ok(params)
    }
}

/// Split a pipe-delimited source list, dropping blank entries
#[must_use]
pub fn split_sources(files: &str) -> Vec<String> {
    files
        .split(SOURCE_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_against(base: &Url, source: String) -> String {
    match base.join(&source) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_and_multi_forms_agree() {
        let single = ViewerParams::from_values(None, Some("a.pdf"), None);
        let multi = ViewerParams::from_values(Some("a.pdf"), None, None);
        assert_eq!(single, multi);
        assert_eq!(single.sources, vec!["a.pdf"]);
    }

    #[test]
    fn blank_entries_are_dropped() {
        let params = ViewerParams::from_values(Some(" a.pdf | |b.pdf||  "), None, None);
        assert_eq!(params.sources, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn files_wins_over_file() {
        let params = ViewerParams::from_values(Some("a.pdf|b.pdf"), Some("c.pdf"), None);
        assert_eq!(params.sources, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn empty_files_falls_back_to_file() {
        let params = ViewerParams::from_values(Some(""), Some("c.pdf"), Some("  "));
        assert_eq!(params.sources, vec!["c.pdf"]);
        assert_eq!(params.external_link, None);
    }

    #[test]
    fn nothing_given_yields_no_sources() {
        assert!(ViewerParams::from_values(None, None, None).sources.is_empty());
    }

    #[test]
    fn address_sources_resolve_relative_to_page() {
        let params = ViewerParams::from_address(
            "https://host.example/docs/viewer.html?files=a.pdf%7C%20sub/b.pdf&drive=https%3A%2F%2Fdrive.example%2Ff",
        )
        .unwrap();

        assert_eq!(
            params.sources,
            vec![
                "https://host.example/docs/a.pdf",
                "https://host.example/docs/sub/b.pdf"
            ]
        );
        assert_eq!(
            params.external_link.as_deref(),
            Some("https://drive.example/f")
        );
    }

    #[test]
    fn file_address_resolves_to_file_urls() {
        let params = ViewerParams::from_address("file:///srv/viewer/index.html?file=book.pdf").unwrap();
        assert_eq!(params.sources, vec!["file:///srv/viewer/book.pdf"]);
    }

    #[test]
    fn malformed_address_is_rejected() {
        assert!(ViewerParams::from_address("not a url").is_err());
    }
}
