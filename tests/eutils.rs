use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use ncbi_gene_batch::config::{Config, ConfigLoader};
use ncbi_gene_batch::domain::{QueryKey, TransportPolicy};
use ncbi_gene_batch::error::GeneError;
use ncbi_gene_batch::eutils::{
    NcbiClient, NcbiHttpClient, parse_first_gene_id, parse_pubmed_count,
};
use ncbi_gene_batch::progress::SilentProgress;
use ncbi_gene_batch::runner::BatchRunner;

/// Local HTTP endpoint that answers the n-th request with `respond(n)` and
/// logs each request line with its arrival time.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<(Instant, String)>>>,
}

impl StubServer {
    fn start<F>(respond: F) -> Self
    where
        F: Fn(usize) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            for (index, stream) in listener.incoming().enumerate() {
                let Ok(mut stream) = stream else { break };
                let head = read_head(&mut stream);
                let request_line = head.lines().next().unwrap_or_default().to_string();
                log.lock().unwrap().push((Instant::now(), request_line));

                let (status, body) = respond(index);
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { base_url, requests }
    }

    fn request_lines(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, line)| line.clone())
            .collect()
    }

    fn gaps(&self) -> Vec<Duration> {
        let requests = self.requests.lock().unwrap();
        requests
            .windows(2)
            .map(|pair| pair[1].0.duration_since(pair[0].0))
            .collect()
    }

    fn client(&self, config: Config) -> NcbiHttpClient {
        let resolved = ConfigLoader::resolve_config(Config {
            eutils_base_url: Some(self.base_url.clone()),
            gene_page_base_url: Some(self.base_url.clone()),
            timeout_secs: Some(5),
            ..config
        });
        NcbiHttpClient::new(&resolved).unwrap()
    }
}

fn read_head(stream: &mut impl Read) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn no_delay(max_retries: usize) -> Config {
    Config {
        delay_ms: Some(0),
        max_retries: Some(max_retries),
        ..Config::default()
    }
}

#[test]
fn first_id_of_esearch_result() {
    let xml = fs::read_to_string("tests/fixtures/esearch_gene_tp53.xml").unwrap();
    let id = parse_first_gene_id(&xml).unwrap();
    assert_eq!(id.as_str(), "7157");
}

#[test]
fn empty_id_list_resolves_nothing() {
    let xml = fs::read_to_string("tests/fixtures/esearch_gene_empty.xml").unwrap();
    assert_eq!(parse_first_gene_id(&xml), None);
}

#[test]
fn missing_id_list_resolves_nothing() {
    let xml = "<eSearchResult><ERROR>Invalid query</ERROR></eSearchResult>";
    assert_eq!(parse_first_gene_id(xml), None);
}

#[test]
fn malformed_xml_resolves_nothing() {
    assert_eq!(parse_first_gene_id("<eSearchResult><IdList><Id>1</IdList>"), None);
    assert_eq!(parse_first_gene_id("not xml at all"), None);
}

#[test]
fn blank_first_id_resolves_nothing() {
    let xml = "<eSearchResult><IdList><Id>  </Id><Id>42</Id></IdList></eSearchResult>";
    assert_eq!(parse_first_gene_id(xml), None);
}

#[test]
fn pubmed_count_from_string_field() {
    let json = fs::read_to_string("tests/fixtures/pubmed_count.json").unwrap();
    assert_eq!(parse_pubmed_count(&json), 124213);
}

#[test]
fn pubmed_count_defaults_to_zero() {
    assert_eq!(parse_pubmed_count(r#"{"esearchresult":{}}"#), 0);
    assert_eq!(parse_pubmed_count(r#"{"error":"API rate limit exceeded"}"#), 0);
    assert_eq!(parse_pubmed_count(r#"{"esearchresult":{"count":"many"}}"#), 0);
    assert_eq!(parse_pubmed_count("<html>busy</html>"), 0);
}

#[test]
fn pubmed_count_accepts_numeric_field() {
    assert_eq!(parse_pubmed_count(r#"{"esearchresult":{"count":7}}"#), 7);
}

#[test]
fn client_sends_query_and_identity_params() {
    let server = StubServer::start(|_| {
        (200, r#"{"esearchresult":{"count":"12"}}"#.to_string())
    });
    let client = server.client(Config {
        api_key: Some("k123".to_string()),
        tool: Some("ncbi-gene-batch".to_string()),
        email: Some("dev@example.org".to_string()),
        ..no_delay(0)
    });

    let body = client.search_pubmed("TP53").unwrap();

    assert_eq!(parse_pubmed_count(&body), 12);
    let lines = server.request_lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with("GET /esearch.fcgi?"), "{line}");
    for param in [
        "db=pubmed",
        "retmode=json",
        "retmax=1",
        "term=TP53",
        "api_key=k123",
        "tool=ncbi-gene-batch",
        "email=dev%40example.org",
    ] {
        assert!(line.contains(param), "{param} missing from {line}");
    }
}

#[test]
fn gene_search_term_is_form_encoded() {
    let xml = fs::read_to_string("tests/fixtures/esearch_gene_tp53.xml").unwrap();
    let server = StubServer::start(move |_| (200, xml.clone()));
    let client = server.client(no_delay(0));

    let body = client
        .search_gene("homo sapiens[Organism] AND TP53[Gene Name]")
        .unwrap();

    assert_eq!(parse_first_gene_id(&body).unwrap().as_str(), "7157");
    let line = &server.request_lines()[0];
    assert!(line.contains("db=gene"), "{line}");
    assert!(
        line.contains("term=homo+sapiens%5BOrganism%5D+AND+TP53%5BGene+Name%5D"),
        "{line}"
    );
}

#[test]
fn gene_report_requests_full_report() {
    let server = StubServer::start(|_| (200, "<dt>Summary</dt><dd>x</dd>".to_string()));
    let client = server.client(no_delay(0));

    let html = client
        .fetch_gene_report(&"7157".parse().unwrap())
        .unwrap();

    assert_eq!(html, "<dt>Summary</dt><dd>x</dd>");
    assert!(server.request_lines()[0].starts_with("GET /7157?report=full_report "));
}

#[test]
fn client_errors_are_not_retried() {
    let server = StubServer::start(|_| (404, "no such database".to_string()));
    let client = server.client(no_delay(3));

    let err = client.search_pubmed("TP53").unwrap_err();

    assert_matches!(
        err,
        GeneError::NcbiStatus { status: 404, ref message } if message == "no such database"
    );
    assert_eq!(server.request_lines().len(), 1);
}

#[test]
fn server_errors_retry_until_exhausted() {
    let server = StubServer::start(|_| (503, "busy".to_string()));
    let client = server.client(no_delay(2));

    let err = client.search_pubmed("TP53").unwrap_err();

    assert_matches!(err, GeneError::NcbiStatus { status: 503, .. });
    assert_eq!(server.request_lines().len(), 3);
}

#[test]
fn rate_limit_is_retried_then_succeeds() {
    let json = fs::read_to_string("tests/fixtures/pubmed_count.json").unwrap();
    let server = StubServer::start(move |index| match index {
        0 => (429, "slow down".to_string()),
        _ => (200, json.clone()),
    });
    let client = server.client(no_delay(3));

    let body = client.search_pubmed("TP53").unwrap();

    assert_eq!(parse_pubmed_count(&body), 124213);
    assert_eq!(server.request_lines().len(), 2);
}

#[test]
fn retries_keep_the_configured_delay() {
    const DELAY: Duration = Duration::from_millis(300);
    const SLACK: Duration = Duration::from_millis(50);

    let server = StubServer::start(|_| (429, "slow down".to_string()));
    let client = server.client(Config {
        delay_ms: Some(DELAY.as_millis() as u64),
        max_retries: Some(2),
        ..Config::default()
    });
    let pacer = client.pacer();
    let runner = BatchRunner::new(client, pacer, TransportPolicy::Skip);
    let keys: Vec<QueryKey> = ["TP53", "EGFR"]
        .iter()
        .filter_map(|name| QueryKey::new(name))
        .collect();

    let report = runner
        .count_publications(&keys, None, &SilentProgress)
        .unwrap();

    assert_eq!(report.failed, keys);
    assert_eq!(server.request_lines().len(), 6);
    for gap in server.gaps() {
        assert!(gap + SLACK >= DELAY, "requests only {gap:?} apart");
    }
}
