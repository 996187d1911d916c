//! Search parameter normalization, pagination planning, and fan-out parsing.
//!
//! A search runs in two phases: a lightweight `rows=0` probe obtains the
//! total hit count, then one page request per result page is synthesized
//! from the same base parameters. In mine-ids mode a third phase derives a
//! metadata request from every document identifier found in each page.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::constants::DEFAULT_ROWS;
use super::error::MineError;

/// Default query when none is given: the whole indexed corpus.
const DEFAULT_QUERY: &str = "all:1";

/// Legacy spelling of the match-everything query, treated the same.
const MATCH_ALL_QUERY: &str = "(*:*)";

/// Secondary sort forced onto unfiltered queries so that page boundaries
/// stay stable while the index churns underneath the crawl.
const STABLE_SORT: &str = "identifier asc";

/// Options for a search mining operation.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Page size (`rows` parameter). Zero is a configuration error.
    pub rows: u32,
    /// Fields to request per document (`fl[i]` parameters). Empty means the
    /// identifier field only.
    pub fields: Vec<String>,
    /// Derive per-identifier metadata fetches from every search page.
    pub mine_ids: bool,
    /// Extra query parameters sent with every page request. Entries with
    /// empty values are dropped.
    pub params: Vec<(String, String)>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            fields: Vec::new(),
            mine_ids: false,
            params: Vec::new(),
        }
    }
}

/// The search response header plus the total hit count, as returned by
/// [`crate::mine::Miner::search_info`].
#[derive(Debug, Clone)]
pub struct SearchInfo {
    /// The service's `responseHeader` object with `numFound` folded in.
    pub header: Value,
    /// Total number of documents matching the query.
    pub num_found: u64,
}

/// Builds the normalized base parameter set for a search.
///
/// Applies the default query, field list, page size, JSON output, and the
/// deterministic sort for unfiltered queries. When `mine_ids` is set the
/// field list is forced to the identifier field only, regardless of the
/// caller's field selection, without duplicating the key.
pub(crate) fn build_search_params(
    query: Option<&str>,
    options: &SearchOptions,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = options
        .params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .cloned()
        .collect();

    if let Some(q) = query {
        set_param(&mut params, "q", q);
    } else if get_param(&params, "q").is_none() {
        set_param(&mut params, "q", DEFAULT_QUERY);
    }

    let fields = if options.mine_ids {
        vec!["identifier".to_string()]
    } else {
        let mut fields: Vec<String> = Vec::new();
        for field in &options.fields {
            let field = field.trim();
            if !field.is_empty() && !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
        if fields.is_empty() {
            fields.push("identifier".to_string());
        }
        fields
    };
    for (i, field) in fields.iter().enumerate() {
        set_param(&mut params, &format!("fl[{i}]"), field);
    }

    if get_param(&params, "rows").is_none() {
        set_param(&mut params, "rows", &options.rows.to_string());
    }
    set_param(&mut params, "output", "json");

    // An unfiltered crawl with no explicit sort gets a deterministic
    // secondary sort so page boundaries are stable across requests.
    let unfiltered = matches!(
        get_param(&params, "q"),
        Some(DEFAULT_QUERY | MATCH_ALL_QUERY)
    );
    if unfiltered && !params.iter().any(|(k, _)| k.starts_with("sort")) {
        params.push(("sort[]".to_string(), STABLE_SORT.to_string()));
    }

    params
}

/// Reads the page size out of a built parameter set.
pub(crate) fn rows_from_params(params: &[(String, String)]) -> u32 {
    get_param(params, "rows")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_ROWS)
}

/// Computes the number of result pages a query spans.
///
/// `numFound == 0` yields zero pages. Anything else yields
/// `floor(numFound / rows) + 1`, so a final partial page is always fetched.
///
/// # Errors
///
/// Returns [`MineError::InvalidRows`] when `rows` is zero.
pub(crate) fn total_pages(num_found: u64, rows: u64) -> Result<u64, MineError> {
    if rows == 0 {
        return Err(MineError::InvalidRows);
    }
    if num_found == 0 {
        return Ok(0);
    }
    Ok(num_found / rows + 1)
}

/// Clones the base parameter set for one page number.
pub(crate) fn page_params(base: &[(String, String)], page: u64) -> Vec<(String, String)> {
    let mut params = base.to_vec();
    set_param(&mut params, "page", &page.to_string());
    params
}

/// Performs the `rows=0` probe and returns the response header and hit
/// count. Malformed or empty bodies are treated as zero results.
///
/// # Errors
///
/// Returns [`MineError::Request`] on transport failure, a non-2xx status,
/// or a non-JSON body.
#[instrument(skip(client, base_params))]
pub(crate) async fn fetch_search_info(
    client: &Client,
    url: &str,
    base_params: &[(String, String)],
) -> Result<SearchInfo, MineError> {
    let mut params = base_params.to_vec();
    set_param(&mut params, "rows", "0");

    let body: Value = client
        .get(url)
        .query(&params)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| MineError::request(url, e))?
        .json()
        .await
        .map_err(|e| MineError::request(url, e))?;

    let num_found = body
        .get("response")
        .and_then(|r| r.get("numFound"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut header = body
        .get("responseHeader")
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    if let Some(map) = header.as_object_mut() {
        map.insert("numFound".to_string(), Value::from(num_found));
    }

    debug!(num_found, "search probe complete");
    Ok(SearchInfo { header, num_found })
}

/// Extracts document identifiers from a search page body, skipping
/// documents that lack one. Malformed pages yield nothing.
pub(crate) fn extract_identifiers(page: &Value) -> Vec<String> {
    page.get("response")
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .map(|docs| {
            docs.iter()
                .filter_map(|doc| doc.get("identifier"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn set_param(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    if let Some(entry) = params.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value.to_string();
    } else {
        params.push((key.to_string(), value.to_string()));
    }
}

fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
