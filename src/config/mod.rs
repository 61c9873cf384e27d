use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

/// Which address-enrichment policy event creation runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// Free-text geocoding (Nominatim); failures leave coordinates unset.
    Geocode,
    /// Postal-code lookup (ViaCEP); a failed lookup with no other address
    /// input fails event creation.
    Cep,
}

pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub resolver: ResolverKind,
    pub nominatim_base_url: String,
    pub viacep_base_url: String,
    /// Sustained RSVP-creation rate per client IP, requests per second.
    pub rsvp_rate_per_second: u64,
    /// Burst allowance on top of the sustained rate.
    pub rsvp_burst: u32,
    pub rate_limit_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let resolver = match env::var("ADDRESS_RESOLVER").as_deref() {
            Ok("cep") => ResolverKind::Cep,
            _ => ResolverKind::Geocode,
        };

        Self {
            database_url: env::var("DATABASE_URL").ok(),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            resolver,
            nominatim_base_url: env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            viacep_base_url: env::var("VIACEP_BASE_URL")
                .unwrap_or_else(|_| "https://viacep.com.br".to_string()),
            rsvp_rate_per_second: env::var("RSVP_RATE_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            rsvp_burst: env::var("RSVP_BURST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            rate_limit_enabled: true,
        }
    }

    /// Config for tests: no database, no rate limiting.
    pub fn test_config() -> Self {
        Self {
            database_url: None,
            port: 0,
            resolver: ResolverKind::Geocode,
            nominatim_base_url: "http://127.0.0.1:0".to_string(),
            viacep_base_url: "http://127.0.0.1:0".to_string(),
            rsvp_rate_per_second: 12,
            rsvp_burst: 5,
            rate_limit_enabled: false,
        }
    }
}
