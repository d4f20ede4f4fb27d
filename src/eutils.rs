use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::GeneId;
use crate::error::GeneError;
use crate::pacing::Pacer;

/// Remote lookups used by the runner. Implementations return raw response
/// bodies; parsing lives in the free functions below so it can be tested offline.
pub trait NcbiClient: Send + Sync {
    /// `esearch.fcgi?db=gene`, XML body.
    fn search_gene(&self, term: &str) -> Result<String, GeneError>;
    /// Gene full report page, HTML body.
    fn fetch_gene_report(&self, id: &GeneId) -> Result<String, GeneError>;
    /// `esearch.fcgi?db=pubmed&retmode=json`, JSON body.
    fn search_pubmed(&self, term: &str) -> Result<String, GeneError>;
}

#[derive(Clone)]
pub struct NcbiHttpClient {
    client: Client,
    eutils_base_url: String,
    gene_page_base_url: String,
    max_retries: usize,
    identity: Vec<(&'static str, String)>,
    pacer: Arc<Pacer>,
}

impl NcbiHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, GeneError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ncbi-gene-batch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GeneError::NcbiHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| GeneError::NcbiHttp(err.to_string()))?;

        let mut identity = Vec::new();
        if let Some(api_key) = &config.api_key {
            identity.push(("api_key", api_key.clone()));
        }
        if let Some(tool) = &config.tool {
            identity.push(("tool", tool.clone()));
        }
        if let Some(email) = &config.email {
            identity.push(("email", email.clone()));
        }

        Ok(Self {
            client,
            eutils_base_url: config.eutils_base_url.clone(),
            gene_page_base_url: config.gene_page_base_url.clone(),
            max_retries: config.max_retries,
            identity,
            pacer: Arc::new(Pacer::new(config.delay)),
        })
    }

    /// The limiter retries wait on. Hand it to the runner so first attempts
    /// and retries share one slot.
    pub fn pacer(&self) -> Arc<Pacer> {
        Arc::clone(&self.pacer)
    }

    fn esearch(&self, params: &[(&str, &str)]) -> Result<String, GeneError> {
        let url = format!("{}/esearch.fcgi", self.eutils_base_url);
        debug!(%url, ?params, "esearch");
        let response = self.send_with_retries(|| {
            self.client
                .get(&url)
                .query(params)
                .query(&self.identity)
        })?;
        read_body(response)
    }

    /// Retries back off linearly and then wait for the pacer, so a retry never
    /// starts sooner than the configured delay after the previous attempt.
    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, GeneError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        debug!(status, attempt, "retrying NCBI request");
                        self.wait_before_retry(attempt);
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        debug!(error = %err, attempt, "retrying NCBI request");
                        self.wait_before_retry(attempt);
                        attempt += 1;
                        continue;
                    }
                    return Err(GeneError::NcbiHttp(err.to_string()));
                }
            }
        }
    }

    fn wait_before_retry(&self, attempt: usize) {
        const BASE_DELAY_MS: u64 = 200;
        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
        self.pacer.pace();
    }
}

impl NcbiClient for NcbiHttpClient {
    fn search_gene(&self, term: &str) -> Result<String, GeneError> {
        self.esearch(&[("db", "gene"), ("term", term)])
    }

    fn fetch_gene_report(&self, id: &GeneId) -> Result<String, GeneError> {
        let url = format!("{}/{}", self.gene_page_base_url, id.as_str());
        debug!(%url, "gene report");
        let response = self.send_with_retries(|| {
            self.client
                .get(&url)
                .query(&[("report", "full_report")])
        })?;
        read_body(response)
    }

    fn search_pubmed(&self, term: &str) -> Result<String, GeneError> {
        self.esearch(&[
            ("db", "pubmed"),
            ("retmode", "json"),
            ("retmax", "1"),
            ("term", term),
        ])
    }
}

fn read_body(response: Response) -> Result<String, GeneError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "NCBI request failed".to_string());
        return Err(GeneError::NcbiStatus { status, message });
    }
    response
        .text()
        .map_err(|err| GeneError::NcbiHttp(err.to_string()))
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Builds the gene esearch term, e.g. `homo sapiens[Organism] AND TP53[Gene Name]`.
pub fn gene_search_term(organism: &str, gene: &str) -> String {
    format!("{organism}[Organism] AND {gene}[Gene Name]")
}

/// First `<Id>` of the `<IdList>` directly under the esearch root.
///
/// An absent or empty list, a blank first id and unparseable XML all give `None`.
pub fn parse_first_gene_id(xml: &str) -> Option<GeneId> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut in_id_list = false;
    let mut in_first_id = false;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                match (depth, e.name().as_ref()) {
                    (2, b"IdList") => in_id_list = true,
                    (3, b"Id") if in_id_list => in_first_id = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if in_id_list && depth == 2 && e.name().as_ref() == b"Id" {
                    return None;
                }
            }
            Ok(Event::Text(t)) if in_first_id => match t.unescape() {
                Ok(value) => text.push_str(&value),
                Err(_) => return None,
            },
            Ok(Event::CData(c)) if in_first_id => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(_)) => {
                if in_first_id {
                    return text.parse().ok();
                }
                if in_id_list && depth == 2 {
                    return None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "unparseable esearch response");
                return None;
            }
        }
    }
}

/// Reads `esearchresult.count`; anything unexpected counts as zero.
pub fn parse_pubmed_count(json: &str) -> u64 {
    let Ok(value) = serde_json::from_str::<Value>(json) else {
        return 0;
    };
    let count = &value["esearchresult"]["count"];
    count
        .as_u64()
        .or_else(|| count.as_str().and_then(|raw| raw.trim().parse().ok()))
        .unwrap_or(0)
}
