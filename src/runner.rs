use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::dictionary::WordList;
use crate::domain::{GeneSummary, PublicationCount, QueryKey, Species, TransportPolicy};
use crate::error::GeneError;
use crate::eutils::{NcbiClient, gene_search_term, parse_first_gene_id, parse_pubmed_count};
use crate::extract::{MarkerExtractor, SUMMARY_NOT_FOUND, SummaryExtractor};
use crate::pacing::Pacer;
use crate::progress::{ProgressEvent, ProgressSink};

#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub records: Vec<GeneSummary>,
    /// Keys the gene search returned no id for.
    pub unresolved: usize,
    /// Keys dropped after a transport failure under `TransportPolicy::Skip`.
    pub failed: Vec<QueryKey>,
}

#[derive(Debug, Clone)]
pub struct CountReport {
    /// Sorted by count, descending; ties keep input order.
    pub records: Vec<PublicationCount>,
    pub failed: Vec<QueryKey>,
}

/// Sequential batch enrichment over a list of gene names.
pub struct BatchRunner<C: NcbiClient, E: SummaryExtractor = MarkerExtractor> {
    client: C,
    extractor: E,
    pacer: Arc<Pacer>,
    policy: TransportPolicy,
}

impl<C: NcbiClient> BatchRunner<C> {
    pub fn new(client: C, pacer: impl Into<Arc<Pacer>>, policy: TransportPolicy) -> Self {
        Self {
            client,
            extractor: MarkerExtractor::default(),
            pacer: pacer.into(),
            policy,
        }
    }

    /// Summary marker comes from the config. Pass the client's own pacer so its
    /// retries are spaced together with the runner's requests.
    pub fn from_config(
        client: C,
        pacer: Arc<Pacer>,
        config: &ResolvedConfig,
        policy: TransportPolicy,
    ) -> Self {
        Self {
            client,
            extractor: MarkerExtractor::from_entry(&config.summary_marker),
            pacer,
            policy,
        }
    }
}

impl<C: NcbiClient, E: SummaryExtractor> BatchRunner<C, E> {
    pub fn with_extractor<X: SummaryExtractor>(self, extractor: X) -> BatchRunner<C, X> {
        BatchRunner {
            client: self.client,
            extractor,
            pacer: self.pacer,
            policy: self.policy,
        }
    }

    /// Resolves each key to a gene id and scrapes its summary. Keys without an id
    /// are left out of the report.
    pub fn describe_genes(
        &self,
        keys: &[QueryKey],
        species: &Species,
        sink: &dyn ProgressSink,
    ) -> Result<SummaryReport, GeneError> {
        info!(keys = keys.len(), species = %species, "describing genes");
        sink.event(ProgressEvent::Started { total: keys.len() });

        let organism = species.organism();
        let mut records = Vec::new();
        let mut unresolved = 0usize;
        let mut failed = Vec::new();

        for (index, key) in keys.iter().enumerate() {
            match self.describe_one(key, &organism) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => unresolved += 1,
                Err(err) => self.absorb(err, key, &mut failed)?,
            }
            sink.event(ProgressEvent::Key {
                position: index + 1,
                key: key.to_string(),
            });
        }

        sink.event(ProgressEvent::Finished);
        info!(
            records = records.len(),
            unresolved,
            failed = failed.len(),
            "gene descriptions done"
        );
        Ok(SummaryReport {
            records,
            unresolved,
            failed,
        })
    }

    fn describe_one(
        &self,
        key: &QueryKey,
        organism: &str,
    ) -> Result<Option<GeneSummary>, GeneError> {
        let term = gene_search_term(organism, key.as_str());
        self.pacer.pace();
        let xml = self.client.search_gene(&term)?;
        let Some(gene_id) = parse_first_gene_id(&xml) else {
            debug!(key = %key, "processed");
            return Ok(None);
        };

        self.pacer.pace();
        let html = self.client.fetch_gene_report(&gene_id)?;
        let summary = self
            .extractor
            .extract(&html)
            .unwrap_or_else(|| SUMMARY_NOT_FOUND.to_string());
        debug!(key = %key, gene_id = %gene_id, "processed");
        Ok(Some(GeneSummary {
            key: key.clone(),
            gene_id,
            summary,
        }))
    }

    /// Counts PubMed hits per key and ranks them, flagging dictionary words
    /// when a word list is supplied.
    pub fn count_publications(
        &self,
        keys: &[QueryKey],
        dictionary: Option<&WordList>,
        sink: &dyn ProgressSink,
    ) -> Result<CountReport, GeneError> {
        info!(
            keys = keys.len(),
            dictionary = dictionary.is_some(),
            "counting publications"
        );
        sink.event(ProgressEvent::Started { total: keys.len() });

        let mut records = Vec::new();
        let mut failed = Vec::new();

        for (index, key) in keys.iter().enumerate() {
            self.pacer.pace();
            match self.client.search_pubmed(key.as_str()) {
                Ok(json) => {
                    let count = parse_pubmed_count(&json);
                    let dictionary_warning = dictionary
                        .and_then(|words| words.warning_for(key.as_str()))
                        .map(str::to_string);
                    debug!(key = %key, count, "processed");
                    records.push(PublicationCount {
                        key: key.clone(),
                        count,
                        dictionary_warning,
                    });
                }
                Err(err) => self.absorb(err, key, &mut failed)?,
            }
            sink.event(ProgressEvent::Key {
                position: index + 1,
                key: key.to_string(),
            });
        }

        sort_by_count_desc(&mut records);
        sink.event(ProgressEvent::Finished);
        info!(
            records = records.len(),
            failed = failed.len(),
            "publication counts done"
        );
        Ok(CountReport { records, failed })
    }

    fn absorb(
        &self,
        err: GeneError,
        key: &QueryKey,
        failed: &mut Vec<QueryKey>,
    ) -> Result<(), GeneError> {
        match self.policy {
            TransportPolicy::FailFast => Err(err),
            TransportPolicy::Skip => {
                warn!(key = %key, error = %err, "skipping key after request failure");
                failed.push(key.clone());
                Ok(())
            }
        }
    }
}

/// Stable: equal counts stay in encounter order.
pub fn sort_by_count_desc(records: &mut [PublicationCount]) {
    records.sort_by(|a, b| b.count.cmp(&a.count));
}
