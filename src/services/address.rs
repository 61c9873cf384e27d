//! Best-effort address enrichment.
//!
//! Two interchangeable policies exist: free-text geocoding through
//! Nominatim (address text in, coordinates out) and postal-code lookup
//! through ViaCEP (CEP in, canonical address text out). Event handlers
//! never fail because a resolver failed; they persist whatever came back.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

/// What the caller knows about the event's location.
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub address_full: Option<String>,
    pub cep: Option<String>,
}

/// What enrichment produced; any subset of fields may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAddress {
    pub address_full: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, input: &AddressInput) -> ResolvedAddress;
}

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

// --- Free-text geocoding (Nominatim) -----------------------------------

/// Pieces extracted from a Brazilian free-text address.
#[derive(Debug, PartialEq)]
struct ParsedAddress {
    street: String,
    number: Option<String>,
    city: String,
}

/// Expected shape: "Rua Nome, Número, Bairro, Cidade - UF, CEP ..., Brasil".
/// The street-type prefix and the neighborhood are dropped so the query
/// matches what Nominatim indexes.
fn parse_brazilian_address(address_full: &str) -> Option<ParsedAddress> {
    let prefix_re =
        Regex::new(r"(?i)^(?:Rua|Av\.|Avenida|Travessa|Alameda|Praça)\s+([^,]+)").unwrap();
    let street = match prefix_re.captures(address_full) {
        Some(caps) => caps.get(1).unwrap().as_str().trim().to_string(),
        None => address_full.split(',').next()?.trim().to_string(),
    };

    let number_re = Regex::new(r",\s*(\d+)").unwrap();
    let number = number_re
        .captures(address_full)
        .map(|caps| caps.get(1).unwrap().as_str().to_string());

    let city_re = Regex::new(r",\s*([^,]+?)\s*-\s*[A-Z]{2}").unwrap();
    let city = city_re
        .captures(address_full)
        .map(|caps| caps.get(1).unwrap().as_str().trim().to_string())?;

    if street.is_empty() || city.is_empty() {
        return None;
    }
    Some(ParsedAddress {
        street,
        number,
        city,
    })
}

fn simplified_query(parsed: &ParsedAddress) -> String {
    match &parsed.number {
        Some(n) => format!("{}, {}, {}, Brasil", parsed.street, n, parsed.city),
        None => format!("{}, {}, Brasil", parsed.street, parsed.city),
    }
}

#[derive(Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

pub struct NominatimResolver {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("convite-server/0.1")
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, query: &str) -> Option<(f64, f64)> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;

        let hits: Vec<NominatimHit> = response.json().await.ok()?;
        let hit = hits.first()?;
        let lat: f64 = hit.lat.parse().ok()?;
        let lon: f64 = hit.lon.parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some((lat, lon))
    }
}

#[async_trait]
impl AddressResolver for NominatimResolver {
    async fn resolve(&self, input: &AddressInput) -> ResolvedAddress {
        let Some(address_full) = input.address_full.as_deref() else {
            return ResolvedAddress::default();
        };
        let Some(parsed) = parse_brazilian_address(address_full) else {
            debug!(address = %address_full, "could not extract street/city from address");
            return ResolvedAddress::default();
        };

        let query = simplified_query(&parsed);
        debug!(%query, "geocoding simplified address");

        match self.lookup(&query).await {
            Some((lat, lon)) => ResolvedAddress {
                address_full: None,
                latitude: Some(lat),
                longitude: Some(lon),
            },
            None => {
                warn!(%query, "geocoding returned no usable result");
                ResolvedAddress::default()
            }
        }
    }
}

// --- Postal-code lookup (ViaCEP) ----------------------------------------

fn clean_cep(cep: &str) -> Option<String> {
    let cleaned: String = cep.chars().filter(|c| !matches!(c, '-' | ' ')).collect();
    if cleaned.len() == 8 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

#[derive(Deserialize)]
struct ViaCepBody {
    #[serde(default)]
    erro: bool,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

pub struct ViaCepResolver {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, cep: &str) -> Option<String> {
        let cleaned = clean_cep(cep)?;
        let url = format!("{}/ws/{}/json/", self.base_url, cleaned);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;

        let body: ViaCepBody = response.json().await.ok()?;
        if body.erro {
            return None;
        }
        Some(format!(
            "{}, {}, {} - {}, {}",
            body.logradouro, body.bairro, body.localidade, body.uf, cep
        ))
    }
}

#[async_trait]
impl AddressResolver for ViaCepResolver {
    async fn resolve(&self, input: &AddressInput) -> ResolvedAddress {
        let Some(cep) = input.cep.as_deref() else {
            return ResolvedAddress::default();
        };
        match self.lookup(cep).await {
            Some(address_full) => ResolvedAddress {
                address_full: Some(address_full),
                latitude: None,
                longitude: None,
            },
            None => {
                warn!(%cep, "CEP lookup failed");
                ResolvedAddress::default()
            }
        }
    }
}
