use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::soap::envelope::{self, BearerSecurity, SoapHeader};
use crate::soap::wsdl::ServiceDescription;
use crate::soap::{Callback, Error, RemoteClient, WsdlLoader, CONTROL_METHODS};

/// [`RemoteClient`] speaking SOAP 1.1 over HTTP.
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
    description: ServiceDescription,
    endpoint: String,
    headers: Vec<SoapHeader>,
    security: Option<BearerSecurity>,
}

impl SoapClient {
    /// `fallback_endpoint` is used when the description has no `soap:address`.
    pub fn new(http: reqwest::Client, description: ServiceDescription, fallback_endpoint: &str) -> Self {
        let endpoint = description
            .location
            .clone()
            .unwrap_or_else(|| fallback_endpoint.to_string());
        Self {
            http,
            description,
            endpoint,
            headers: Vec::new(),
            security: None,
        }
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(
        http: reqwest::Client,
        endpoint: String,
        authorization: Option<String>,
        envelope: String,
    ) -> Result<Value, Error> {
        let mut builder = http
            .post(endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=utf-8"))
            .header("SOAPAction", "\"\"")
            .body(envelope);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        // faults arrive with a 500 status; prefer the fault over the status
        match envelope::parse_response(&text) {
            Err(e @ Error::Fault { .. }) => Err(e),
            _ if !status.is_success() => Err(Error::Status {
                status: status.as_u16(),
                body: text,
            }),
            other => other,
        }
    }
}

impl RemoteClient for SoapClient {
    fn method_names(&self) -> Vec<String> {
        self.description
            .operations
            .iter()
            .cloned()
            .chain(CONTROL_METHODS.iter().map(|s| s.to_string()))
            .collect()
    }

    fn add_soap_header(&mut self, header: SoapHeader) {
        self.headers.push(header);
    }

    fn set_security(&mut self, security: BearerSecurity) {
        self.security = Some(security);
    }

    fn set_endpoint(&mut self, endpoint: String) {
        self.endpoint = endpoint;
    }

    fn call(&self, operation: &str, body: Value, callback: Callback) {
        if !self.description.operations.iter().any(|o| o == operation) {
            return callback(Some(Error::UnknownOperation(operation.to_string())), None);
        }
        let envelope = match envelope::render(&self.description.target_namespace, operation, &self.headers, &body) {
            Ok(v) => v,
            Err(e) => return callback(Some(e), None),
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return callback(Some(Error::NoRuntime(operation.to_string())), None),
        };

        tracing::trace!(operation, endpoint = %self.endpoint, "sending soap request");
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let authorization = self.security.as_ref().map(BearerSecurity::header_value);
        let operation = operation.to_string();
        handle.spawn(async move {
            match Self::send(http, endpoint, authorization, envelope).await {
                Ok(result) => callback(None, Some(result)),
                Err(e) => {
                    tracing::debug!(operation = %operation, "soap request failed: {e}");
                    callback(Some(e), None)
                }
            }
        });
    }
}

/// Loads service descriptions over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpWsdlLoader {
    http: reqwest::Client,
}

impl HttpWsdlLoader {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: &str) -> Result<ServiceDescription, Error> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        ServiceDescription::parse(&text)
    }
}

#[async_trait]
impl WsdlLoader for HttpWsdlLoader {
    async fn load(&self, url: &str) -> Result<Box<dyn RemoteClient>, Error> {
        let description = self.fetch(url).await.map_err(|e| Error::Description {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(url, operations = description.operations.len(), "service description loaded");
        let fallback = url.split('?').next().unwrap_or(url);
        Ok(Box::new(SoapClient::new(self.http.clone(), description, fallback)))
    }
}
