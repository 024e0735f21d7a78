//! Geolocation lookup for proxy IPs through an HTTP JSON service

use crate::error::LookupError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lookup URL with an `{ip}` placeholder
pub const DEFAULT_LOOKUP_URL: &str = "http://ip-api.com/json/{ip}?lang=zh-CN";

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Geographic and network information for an IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoLocation {
    pub ip: String,
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "CN")
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub org: Option<String>,
}

impl GeoLocation {
    /// Check if the location has any meaningful data
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.country_code.is_none()
            && self.region.is_none()
            && self.city.is_none()
    }

    /// Get a short display string for the location
    pub fn short_display(&self) -> String {
        match (&self.country_code, &self.city) {
            (Some(cc), Some(city)) => format!("{}, {}", city, cc),
            (Some(cc), None) => cc.clone(),
            (None, Some(city)) => city.clone(),
            (None, None) => String::from("Unknown"),
        }
    }
}

impl std::fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [self.city.clone(), self.region.clone(), self.country.clone()]
            .into_iter()
            .flatten()
            .collect();

        if parts.is_empty() {
            write!(f, "Unknown Location")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Response body of the lookup service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: Option<String>,
    message: Option<String>,
    query: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    isp: Option<String>,
    org: Option<String>,
}

impl ApiResponse {
    fn into_location(self, ip: &str) -> Result<GeoLocation, LookupError> {
        if self.status.as_deref() == Some("fail") {
            return Err(LookupError::Api(
                self.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(GeoLocation {
            ip: self.query.unwrap_or_else(|| ip.to_string()),
            country: blank_to_none(self.country),
            country_code: blank_to_none(self.country_code),
            region: blank_to_none(self.region_name),
            city: blank_to_none(self.city),
            isp: blank_to_none(self.isp),
            org: blank_to_none(self.org),
        })
    }
}

/// Client for the IP lookup service
#[derive(Clone)]
pub struct IpLookup {
    client: Client,
    url_template: String,
}

impl IpLookup {
    /// Create a lookup client against the default service
    pub fn new() -> Result<Self, LookupError> {
        Self::with_template(DEFAULT_LOOKUP_URL.to_string())
    }

    /// Create a lookup client with a custom `{ip}` URL template
    pub fn with_template(url_template: String) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url_template,
        })
    }

    pub fn url_for(&self, ip: &str) -> String {
        self.url_template.replace("{ip}", ip.trim())
    }

    /// Look up the location of an IP address
    pub async fn lookup(&self, ip: &str) -> Result<GeoLocation, LookupError> {
        let url = self.url_for(ip);
        log::debug!("Looking up {}", url);

        let response: ApiResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_location(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str, ip: &str) -> Result<GeoLocation, LookupError> {
        serde_json::from_str::<ApiResponse>(body)
            .unwrap()
            .into_location(ip)
    }

    #[test]
    fn test_decode_success() {
        let body = r#"{
            "status": "success",
            "country": "美国",
            "countryCode": "US",
            "regionName": "加利福尼亚州",
            "city": "洛杉矶",
            "isp": "Acme Hosting",
            "org": "",
            "query": "1.2.3.4"
        }"#;
        let loc = decode(body, "1.2.3.4").unwrap();
        assert_eq!(loc.ip, "1.2.3.4");
        assert_eq!(loc.country_code.as_deref(), Some("US"));
        assert_eq!(loc.region.as_deref(), Some("加利福尼亚州"));
        assert_eq!(loc.isp.as_deref(), Some("Acme Hosting"));
        assert_eq!(loc.org, None);
        assert_eq!(loc.short_display(), "洛杉矶, US");
    }

    #[test]
    fn test_decode_failure_status() {
        let body = r#"{"status": "fail", "message": "private range", "query": "10.0.0.1"}"#;
        let err = decode(body, "10.0.0.1").unwrap_err();
        assert!(matches!(err, LookupError::Api(ref m) if m == "private range"));
    }

    #[test]
    fn test_decode_missing_query_uses_requested_ip() {
        let loc = decode(r#"{"country": "日本"}"#, "5.6.7.8").unwrap();
        assert_eq!(loc.ip, "5.6.7.8");
        assert!(!loc.is_empty());
    }

    #[test]
    fn test_url_for() {
        let lookup = IpLookup::new().unwrap();
        assert_eq!(
            lookup.url_for(" 1.2.3.4 "),
            "http://ip-api.com/json/1.2.3.4?lang=zh-CN"
        );
    }

    #[test]
    fn test_geo_location_default() {
        let loc = GeoLocation::default();
        assert!(loc.is_empty());
        assert_eq!(loc.short_display(), "Unknown");
        assert_eq!(format!("{}", loc), "Unknown Location");
    }

    #[test]
    fn test_geo_location_display() {
        let loc = GeoLocation {
            ip: "1.2.3.4".to_string(),
            country: Some("United States".to_string()),
            country_code: Some("US".to_string()),
            region: Some("New York".to_string()),
            city: Some("Brooklyn".to_string()),
            isp: None,
            org: None,
        };
        assert_eq!(format!("{}", loc), "Brooklyn, New York, United States");
    }
}
