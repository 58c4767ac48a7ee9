//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use targetscout_common::sandbox::SandboxClient as Client;
use targetscout_common::{DiscoveryError, EvidenceCategory, Payload, RawFinding, Result, SourceId};
use targetscout_ranker::canonicalize;
use tracing::{debug, instrument, warn};

use super::{candidate_slice, SourceAdapter};
use crate::models::PubMedArticle;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Candidates that get their own narrowed query.
const NARROWED_QUERIES: usize = 5;

lazy_static! {
    /// Gene-symbol-shaped tokens: letters followed by a short number, e.g. STAT4, IL12B, CD40.
    static ref SYMBOL_TOKEN: Regex = Regex::new(r"\b[A-Z]{2,6}[0-9]{1,3}[A-Z]?\b").unwrap();
    static ref WORD: Regex = Regex::new(r"[A-Za-z0-9-]+").unwrap();
}

pub struct PubMedClient {
    client: Client,
    api_key: Option<SecretString>,
    email: Option<String>,
    max_results: usize,
    delay: Duration,
}

impl PubMedClient {
    pub fn new(client: Client, api_key: Option<SecretString>, email: Option<String>, max_results: usize) -> Self {
        Self {
            client,
            api_key,
            email,
            max_results,
            delay: Duration::from_millis(340),
        }
    }

    /// NCBI allows 3 requests/s without a key, 10 with one.
    pub fn with_requests_per_second(mut self, rps: f64) -> Self {
        if rps.is_finite() && rps > 0.0 {
            self.delay = Duration::from_secs_f64(1.0 / rps);
        }
        self
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("tool", "targetscout".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.expose_secret().to_string()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        params
    }

    /// Search PubMed and return a list of PMIDs.
    #[instrument(skip(self))]
    async fn esearch(&self, query: &str, max: usize) -> Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("term", query.to_string()));
        params.push(("retmax", max.to_string()));
        params.push(("retmode", "json".to_string()));
        params.push(("sort", "relevance".to_string()));

        let req = self.client.get(ESEARCH_URL)?.query(&params);
        let resp: serde_json::Value = self.client.send(req).await?.json().await?;

        let ids: Vec<String> = resp["esearchresult"]["idlist"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();

        debug!(count = ids.len(), "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    #[instrument(skip(self, pmids), fields(n = pmids.len()))]
    async fn efetch(&self, pmids: &[String]) -> Result<Vec<PubMedArticle>> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }

        let mut params = self.base_params();
        params.push(("id", pmids.join(",")));
        params.push(("rettype", "abstract".to_string()));
        params.push(("retmode", "xml".to_string()));

        let req = self.client.get(EFETCH_URL)?.query(&params);
        let xml = self.client.send(req).await?.text().await?;
        parse_pubmed_xml(&xml)
    }

    #[instrument(skip(self, known))]
    async fn fetch(&self, disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        let mut pmids = self.esearch(&build_query(disease, None), self.max_results).await?;

        if let Some(candidates) = candidate_slice(known, NARROWED_QUERIES) {
            let per_protein = (self.max_results / NARROWED_QUERIES).max(5);
            let this = self;
            let failed = merge_narrowed(&mut pmids, candidates, self.delay, move |protein| async move {
                this.esearch(&build_query(disease, Some(&protein)), per_protein).await
            })
            .await;
            if failed > 0 {
                warn!(failed, total = candidates.len(), "Some narrowed PubMed queries failed");
            }
        }

        tokio::time::sleep(self.delay).await;
        let articles = self.efetch(&pmids).await?;
        let candidates = known.unwrap_or(&[]);
        let findings: Vec<RawFinding> = articles
            .into_iter()
            .flat_map(|a| article_findings(a, candidates))
            .collect();
        debug!(count = findings.len(), "PubMed findings built");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for PubMedClient {
    fn id(&self) -> SourceId {
        SourceId::PubMed
    }

    fn narrows_with_candidates(&self) -> bool {
        true
    }

    async fn search(&self, disease: &str, known: Option<&[String]>) -> Result<Vec<RawFinding>> {
        self.fetch(disease, known)
            .await
            .map_err(|e| DiscoveryError::unavailable(self.id(), e))
    }
}

/// Append PMIDs from one query per protein, keeping first-seen order.
/// A failed query is logged and skipped so earlier results survive.
/// Returns the number of failed queries.
async fn merge_narrowed<F, Fut>(pmids: &mut Vec<String>, proteins: &[String], delay: Duration, mut search: F) -> usize
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<String>>>,
{
    let mut failed = 0;
    for protein in proteins {
        tokio::time::sleep(delay).await;
        match search(protein.clone()).await {
            Ok(ids) => {
                for id in ids {
                    if !pmids.contains(&id) {
                        pmids.push(id);
                    }
                }
            }
            Err(e) => {
                warn!(%protein, error = %e, "Narrowed PubMed query failed, skipping");
                failed += 1;
            }
        }
    }
    failed
}

pub fn build_query(disease: &str, protein: Option<&str>) -> String {
    let mut parts = vec![format!("\"{disease}\"[Title/Abstract]")];
    if let Some(p) = protein {
        parts.push(format!("\"{p}\"[Title/Abstract]"));
    }
    parts.push("humans[MeSH]".to_string());
    parts.push("(therapeutic target OR drug target OR protein target)".to_string());
    parts.join(" AND ")
}

/// Proteins an article talks about: known candidates found as whole words,
/// then symbol-shaped tokens, canonicalized and deduplicated.
pub fn attribute_subjects(article: &PubMedArticle, candidates: &[String]) -> Vec<String> {
    let text = format!("{} {}", article.title, article.abstract_text.as_deref().unwrap_or(""));
    let words: BTreeSet<String> = WORD.find_iter(&text).map(|m| m.as_str().to_uppercase()).collect();

    let mut subjects: Vec<String> = Vec::new();
    let mut push = |s: String| {
        if !subjects.contains(&s) {
            subjects.push(s);
        }
    };
    for candidate in candidates {
        if let Some(key) = canonicalize(candidate) {
            if words.contains(&key) {
                push(key);
            }
        }
    }
    for token in SYMBOL_TOKEN.find_iter(&text) {
        if let Some(key) = canonicalize(token.as_str()) {
            push(key);
        }
    }
    subjects
}

/// One literature finding per attributed subject. An article with no
/// recognisable protein still yields a single finding with an empty subject.
pub fn article_findings(article: PubMedArticle, candidates: &[String]) -> Vec<RawFinding> {
    let mut subjects = attribute_subjects(&article, candidates);
    if subjects.is_empty() {
        subjects.push(String::new());
    }

    let citation = article.url();
    let payload = Payload::Publication {
        pmid: article.pmid,
        title: article.title,
        abstract_text: article.abstract_text,
        year: article.year,
        publication_types: article.publication_types,
        journal: article.journal,
    };
    subjects
        .into_iter()
        .map(|subject| {
            RawFinding::new(SourceId::PubMed, subject, EvidenceCategory::Literature, payload.clone())
                .with_citation(citation.clone())
        })
        .collect()
}

/// Parse PubMed XML (efetch abstract mode) into articles.
/// Handles the <PubmedArticleSet><PubmedArticle> structure.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<PubMedArticle>> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<PubMedArticle> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current_last = String::new();
    let mut current_fore = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"PubmedArticle" => current = Some(PubMedArticle::default()),
                    b"Author" => {
                        current_last.clear();
                        current_fore.clear();
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| DiscoveryError::Xml(err.to_string()))?
                    .to_string();
                if let Some(ref mut a) = current {
                    apply_text(a, &path, &text, &mut current_last, &mut current_fore);
                }
            }
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"Author" => {
                        if let Some(ref mut a) = current {
                            let name = if current_fore.is_empty() {
                                current_last.clone()
                            } else {
                                format!("{current_fore} {current_last}")
                            };
                            if !name.is_empty() {
                                a.authors.push(name);
                            }
                        }
                    }
                    b"PubmedArticle" => {
                        if let Some(a) = current.take() {
                            if !a.title.is_empty() {
                                articles.push(a);
                            } else {
                                warn!("Skipping article with empty title");
                            }
                        }
                    }
                    _ => {}
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DiscoveryError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(articles)
}

fn apply_text(a: &mut PubMedArticle, path: &[Vec<u8>], text: &str, last: &mut String, fore: &mut String) {
    let inside = |tag: &[u8]| path.iter().any(|p| p.as_slice() == tag);
    let Some(leaf) = path.last().map(Vec::as_slice) else {
        return;
    };

    if inside(b"ArticleTitle") {
        append(&mut a.title, text);
    } else if inside(b"AbstractText") {
        append(a.abstract_text.get_or_insert_with(String::new), text);
    } else if leaf == b"PMID" && a.pmid.is_none() && inside(b"MedlineCitation") {
        a.pmid = Some(text.to_string());
    } else if leaf == b"LastName" {
        *last = text.to_string();
    } else if leaf == b"ForeName" {
        *fore = text.to_string();
    } else if leaf == b"Title" && inside(b"Journal") {
        a.journal = Some(text.to_string());
    } else if leaf == b"PublicationType" {
        a.publication_types.push(text.to_string());
    } else if inside(b"PubDate") && a.year.is_none() && (leaf == b"Year" || leaf == b"MedlineDate") {
        a.year = text.get(..4).and_then(|y| y.parse().ok());
    }
}

fn append(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}
