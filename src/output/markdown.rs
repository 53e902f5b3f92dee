//! HTML to Markdown conversion
//!
//! The main content element of each page is rendered with `html2md` and
//! written under the output directory at a path derived from the page URL.
//! Images inside the content are either downloaded next to the Markdown tree
//! or pointed at their absolute URL.

use super::traits::{ContentConverter, ConvertedPage, OutputError, OutputResult};
use crate::config::Config;
use crate::crawler::FetchedPage;
use regex::{Captures, Regex};
use reqwest::Client;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Extensions kept as-is when naming downloaded images
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp"];

/// Default converter writing one Markdown file per page
pub struct MarkdownConverter {
    client: Client,
    content_selector: Selector,
    base_dir: PathBuf,
    image_dir_name: String,
    download_images: bool,
    img_src: Regex,
}

impl MarkdownConverter {
    /// Creates a converter from the extractor and output settings
    ///
    /// `client` is used for image downloads; the crawl's own client works.
    pub fn new(config: &Config, client: Client) -> OutputResult<Self> {
        let selector = &config.extractor.content_selector;
        let content_selector = Selector::parse(selector)
            .map_err(|e| OutputError::Selector(format!("'{}': {:?}", selector, e)))?;

        let img_src = Regex::new(r#"(<img\b[^>]*?\bsrc=)"([^"]*)""#)
            .map_err(|e| OutputError::Selector(e.to_string()))?;

        Ok(Self {
            client,
            content_selector,
            base_dir: PathBuf::from(&config.output.base_dir),
            image_dir_name: config.output.image_dir_name.clone(),
            download_images: config.output.download_images,
            img_src,
        })
    }

    /// Directory downloaded images are stored in
    pub fn image_dir(&self) -> PathBuf {
        self.base_dir.join(&self.image_dir_name)
    }

    /// Path of the Markdown file for a page URL
    ///
    /// A trailing `/`, `/index.html` or `.html` is dropped from the URL path;
    /// an empty path maps to `index.md`.
    pub fn output_path(&self, url: &Url) -> PathBuf {
        self.base_dir.join(relative_output_path(url.path()))
    }

    /// Extracts the first content element as HTML
    fn extract_content(&self, html: &str) -> Option<(String, Vec<String>)> {
        let document = Html::parse_document(html);
        let content = document.select(&self.content_selector).next()?;

        let sources = match Selector::parse("img[src]") {
            Ok(img) => content
                .select(&img)
                .filter_map(|element| element.value().attr("src"))
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        };

        Some((content.html(), sources))
    }

    /// Downloads an image and returns its path relative to `markdown_path`
    async fn download_image(&self, image_url: &Url, markdown_path: &Path) -> OutputResult<String> {
        let response = self
            .client
            .get(image_url.as_str())
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let image_dir = self.image_dir();
        fs::create_dir_all(&image_dir)?;

        let file_name = image_file_name(image_url);
        fs::write(image_dir.join(&file_name), &bytes)?;

        let relative_md = markdown_path
            .strip_prefix(&self.base_dir)
            .unwrap_or(markdown_path);
        Ok(relative_image_link(relative_md, &self.image_dir_name, &file_name))
    }

    /// Computes the replacement `src` for every image in the content
    ///
    /// Also returns how many downloads failed.
    async fn localize_images(
        &self,
        sources: Vec<String>,
        page_url: &Url,
        markdown_path: &Path,
    ) -> (HashMap<String, String>, u64) {
        let mut replacements = HashMap::new();
        let mut failures = 0;

        for src in sources {
            if replacements.contains_key(&src) {
                continue;
            }

            let Ok(absolute) = page_url.join(src.trim()) else {
                debug!(src = %src, "Leaving unresolvable image source untouched");
                continue;
            };

            let new_src = if self.download_images {
                match self.download_image(&absolute, markdown_path).await {
                    Ok(local) => local,
                    Err(e) => {
                        warn!(image = %absolute, error = %e, "Image download failed, linking remotely");
                        failures += 1;
                        absolute.to_string()
                    }
                }
            } else {
                absolute.to_string()
            };

            replacements.insert(src, new_src);
        }

        (replacements, failures)
    }

    /// Rewrites `src` attributes in serialized HTML
    fn rewrite_sources(&self, html: &str, replacements: &HashMap<String, String>) -> String {
        self.img_src
            .replace_all(html, |caps: &Captures| {
                let original = unescape_attr(&caps[2]);
                match replacements.get(&original) {
                    Some(new_src) => format!("{}\"{}\"", &caps[1], escape_attr(new_src)),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl ContentConverter for MarkdownConverter {
    async fn convert(&mut self, page: &FetchedPage) -> OutputResult<ConvertedPage> {
        let page_url = Url::parse(&page.url).map_err(|e| {
            OutputError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{}: {}", page.url, e),
            ))
        })?;

        let (content, sources) =
            self.extract_content(&page.html)
                .ok_or_else(|| OutputError::NoContent {
                    url: page.url.clone(),
                })?;

        let markdown_path = self.output_path(&page_url);
        let (replacements, image_failures) = self
            .localize_images(sources, &page_url, &markdown_path)
            .await;
        let content = self.rewrite_sources(&content, &replacements);

        let markdown = html2md::parse_html(&content);

        if let Some(parent) = markdown_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&markdown_path, markdown)?;

        debug!(url = %page.url, path = %markdown_path.display(), "Wrote Markdown");
        Ok(ConvertedPage {
            path: markdown_path,
            image_failures,
        })
    }
}

/// Maps a URL path to a Markdown path relative to the output directory
fn relative_output_path(url_path: &str) -> PathBuf {
    let mut path = url_path.strip_suffix('/').unwrap_or(url_path);

    if let Some(stripped) = path.strip_suffix("/index.html") {
        path = stripped;
    } else if let Some(stripped) = path.strip_suffix(".html") {
        path = stripped;
    }

    let path = path.trim_start_matches('/');
    if path.is_empty() {
        PathBuf::from("index.md")
    } else {
        PathBuf::from(format!("{}.md", path))
    }
}

/// File name for a downloaded image
///
/// Keeps the last path segment when it is a plain file name with an image
/// extension, otherwise derives a stable name from the URL hash.
fn image_file_name(image_url: &Url) -> String {
    let basename = image_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let lower = basename.to_ascii_lowercase();
    let plain = !basename.is_empty()
        && basename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if plain && IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return basename.to_string();
    }

    let digest = hex::encode(Sha256::digest(image_url.as_str().as_bytes()));
    format!("image_{}.png", &digest[..12])
}

/// Link from a Markdown file to an image in the image directory
fn relative_image_link(relative_md: &Path, image_dir_name: &str, file_name: &str) -> String {
    let depth = relative_md
        .parent()
        .map(|parent| parent.components().count())
        .unwrap_or(0);

    format!("{}{}/{}", "../".repeat(depth), image_dir_name, file_name)
}

fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
