//! Protocol versions and the endpoint template.

/// Host serving every publisher service.
pub const DEFAULT_BASE_URL: &str = "https://ads.google.com";

pub const DEFAULT_VERSION: &str = "v202508";

/// Versions the generated operation sets were written against.
pub const SUPPORTED_VERSIONS: [&str; 6] = ["v202408", "v202411", "v202502", "v202505", "v202508", "v202511"];

pub fn is_supported(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// Namespace of the header and body elements for `version`.
pub fn namespace(version: &str) -> String {
    format!("https://www.google.com/apis/ads/publisher/{version}")
}

/// Where service descriptions are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base_url: String,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ServiceEndpoint {
    /// `base_url` replaces `https://ads.google.com`, e.g. to target a proxy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the service description of `name`. Both values are substituted
    /// verbatim.
    pub fn resolve(&self, version: &str, name: &str) -> String {
        format!("{}/apis/ads/publisher/{version}/{name}?wsdl", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let endpoint = ServiceEndpoint::default();
        assert_eq!(
            "https://ads.google.com/apis/ads/publisher/v202508/ReportService?wsdl",
            endpoint.resolve("v202508", "ReportService")
        );
    }

    #[test]
    fn test_resolve_is_verbatim() {
        let endpoint = ServiceEndpoint::default();
        for (version, name) in [
            ("v202405", "lineItemService"),
            ("V1", "Line Item%20Service"),
            ("", ""),
            ("v202505", "Ünïcode/Service"),
        ] {
            assert_eq!(
                format!("https://ads.google.com/apis/ads/publisher/{version}/{name}?wsdl"),
                endpoint.resolve(version, name)
            );
        }
    }

    #[test]
    fn test_custom_base_url() {
        let endpoint = ServiceEndpoint::new("http://127.0.0.1:8080/");
        assert_eq!(
            "http://127.0.0.1:8080/apis/ads/publisher/v202508/NetworkService?wsdl",
            endpoint.resolve("v202508", "NetworkService")
        );
    }

    #[test]
    fn test_registry() {
        assert!(is_supported(DEFAULT_VERSION));
        assert!(!is_supported("v201911"));
        assert_eq!("https://www.google.com/apis/ads/publisher/v202508", namespace("v202508"));
    }
}
