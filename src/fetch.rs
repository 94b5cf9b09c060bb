use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::formats::{Section, SectionRecord};

#[async_trait]
pub trait SectionSource: Send + Sync {
    async fn fetch_sections(&self, locale: &str) -> anyhow::Result<Vec<SectionRecord>>;
}

/// Reads sections from the CMS `GET {base}/sections?_locale={locale}` endpoint.
#[derive(Debug, Clone)]
pub struct HttpSectionSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSectionSource {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("parse api base url: {base_url}"))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            anyhow::bail!("api base url must be http/https: {base_url}");
        }
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
        })
    }

    pub fn sections_endpoint(&self, locale: &str) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}/sections", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.query_pairs_mut().clear().append_pair("_locale", locale);
        url
    }
}

#[async_trait]
impl SectionSource for HttpSectionSource {
    async fn fetch_sections(&self, locale: &str) -> anyhow::Result<Vec<SectionRecord>> {
        let endpoint = self.sections_endpoint(locale);
        let response = self
            .client
            .get(endpoint.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("failed to fetch sections for {locale}: {status}");
        }

        response
            .json::<Vec<SectionRecord>>()
            .await
            .with_context(|| format!("parse sections for {locale}"))
    }
}

pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(USER_AGENT, reqwest::header::HeaderValue::from_static("thilo-site/0.1"));
            headers
        })
        .build()
        .context("build http client")
}

/// Outcome of fetching one locale's sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocaleFetch {
    Fetched { sections: Vec<Section> },
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    pub locales: BTreeMap<String, LocaleFetch>,
}

impl FetchReport {
    /// Sections per locale; a failed locale contributes an empty list.
    pub fn sections_by_locale(&self) -> BTreeMap<String, Vec<Section>> {
        self.locales
            .iter()
            .map(|(locale, fetch)| {
                let sections = match fetch {
                    LocaleFetch::Fetched { sections } => sections.clone(),
                    LocaleFetch::Failed { .. } => Vec::new(),
                };
                (locale.clone(), sections)
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.locales
            .iter()
            .filter_map(|(locale, fetch)| match fetch {
                LocaleFetch::Failed { reason } => Some((locale.as_str(), reason.as_str())),
                LocaleFetch::Fetched { .. } => None,
            })
            .collect()
    }
}

/// Fetches every locale concurrently. A failing locale is recorded in the
/// report and never aborts the others.
pub async fn fetch_all(source: Arc<dyn SectionSource>, locales: &[String]) -> FetchReport {
    let mut tasks = tokio::task::JoinSet::new();
    for locale in locales {
        let source = Arc::clone(&source);
        let locale = locale.clone();
        tasks.spawn(async move {
            let result = source.fetch_sections(&locale).await;
            (locale, result)
        });
    }

    let mut report = FetchReport::default();
    while let Some(joined) = tasks.join_next().await {
        let (locale, result) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!(?err, "section fetch task failed");
                continue;
            }
        };

        let fetch = match result {
            Ok(records) => {
                let sections = records
                    .into_iter()
                    .map(|record| Section::from_record(record, &locale))
                    .collect::<Vec<_>>();
                tracing::info!(locale = %locale, count = sections.len(), "fetched sections");
                LocaleFetch::Fetched { sections }
            }
            Err(err) => {
                tracing::warn!(locale = %locale, ?err, "failed to fetch sections");
                LocaleFetch::Failed {
                    reason: format!("{err:#}"),
                }
            }
        };
        report.locales.insert(locale, fetch);
    }

    for locale in locales {
        if !report.locales.contains_key(locale) {
            report.locales.insert(
                locale.clone(),
                LocaleFetch::Failed {
                    reason: "fetch task did not complete".to_owned(),
                },
            );
        }
    }

    report
}

/// Quiz document state as shown on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizData {
    Loaded(serde_json::Value),
    Failed(String),
}

pub async fn fetch_quiz(client: &reqwest::Client, url: &str) -> anyhow::Result<serde_json::Value> {
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("failed to fetch quiz: {status}");
    }

    response.json().await.context("parse quiz json")
}

/// Fetches every distinct quiz url, recording failures instead of returning
/// them. Relative urls resolve against `base_url`; the map stays keyed by the
/// url as written in the markdown.
pub async fn fetch_quizzes<'a>(
    client: &reqwest::Client,
    base_url: &Url,
    urls: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, QuizData> {
    let mut quizzes = BTreeMap::new();
    for url in urls {
        if quizzes.contains_key(url) {
            continue;
        }
        let resolved = match base_url.join(url) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(url, %err, "invalid quiz url");
                quizzes.insert(url.to_owned(), QuizData::Failed(format!("invalid quiz url: {err}")));
                continue;
            }
        };
        let data = match fetch_quiz(client, resolved.as_str()).await {
            Ok(value) => QuizData::Loaded(value),
            Err(err) => {
                tracing::warn!(url, ?err, "failed to fetch quiz");
                QuizData::Failed(format!("{err:#}"))
            }
        };
        quizzes.insert(url.to_owned(), data);
    }
    quizzes
}
