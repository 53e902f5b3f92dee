//! Shared fixtures for the integration tests

use reqwest::Client;
use std::path::Path;
use std::sync::atomic::Ordering;
use sumi_scroll::config::Config;
use sumi_scroll::crawler::{build_http_client, CancelFlag, Coordinator, FetchedPage};
use sumi_scroll::output::{ContentConverter, ConvertedPage, OutputResult};
use sumi_scroll::url::normalize;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Converter that records the pages it receives
#[derive(Default)]
pub struct RecordingConverter {
    pub seen: Vec<String>,
    cancel_after: Option<(usize, CancelFlag)>,
}

impl RecordingConverter {
    /// Sets `flag` once `pages` pages have been converted
    pub fn cancelling_after(pages: usize, flag: CancelFlag) -> Self {
        Self {
            seen: Vec::new(),
            cancel_after: Some((pages, flag)),
        }
    }

    /// Normalized forms of every converted URL
    pub fn seen_identities(&self) -> Vec<String> {
        self.seen.iter().map(|u| normalize(u)).collect()
    }
}

impl ContentConverter for RecordingConverter {
    async fn convert(&mut self, page: &FetchedPage) -> OutputResult<ConvertedPage> {
        self.seen.push(page.url.clone());

        if let Some((pages, flag)) = &self.cancel_after {
            if self.seen.len() >= *pages {
                flag.store(true, Ordering::SeqCst);
            }
        }

        Ok(ConvertedPage::new(format!("{}.md", self.seen.len())))
    }
}

/// Configuration for a site served by `server`, writing into `dir`
pub fn site_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::for_site(format!("{}/docs/", server.uri()), server.uri());
    config.crawl.exclude_patterns = vec![".*#.*".to_string()];
    config.output.base_dir = dir.join("output").to_string_lossy().into_owned();
    config.execution.request_delay = 0.0;
    config.execution.request_timeout = 5;
    config.retry.initial_delay = 0.01;
    config.retry.max_delay = 0.05;
    config.recovery.recovery_file = dir
        .join("recovery_state.json")
        .to_string_lossy()
        .into_owned();
    config.recovery.save_interval = 1;
    config
}

pub fn client(config: &Config) -> Client {
    build_http_client(&config.execution).unwrap()
}

pub fn recording_coordinator(config: &Config) -> Coordinator<RecordingConverter> {
    Coordinator::new(config, client(config), RecordingConverter::default()).unwrap()
}

/// A docs page with the given navigation links and a main section
pub fn docs_page(title: &str, nav: &[(&str, &str)]) -> String {
    let links: String = nav
        .iter()
        .map(|(href, text)| format!(r#"<a href="{}">{}</a>"#, href, text))
        .collect();

    format!(
        r#"<html><head><title>{title}</title></head><body>
        <nav>{links}</nav>
        <main><h1>{title}</h1><p>Content of {title}.</p></main>
        </body></html>"#
    )
}

/// Mounts a page that must be requested exactly `times` times
pub async fn mount_page(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}
