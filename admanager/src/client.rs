use std::sync::Arc;

use admanager_auth::{Credential, RefreshConfig};

use crate::error::Error;
use crate::gateway::{GatewayConfig, OperationSet, Service, ServiceGateway};
use crate::report::{PollerConfig, ReportJobPoller, ReportService};
use crate::soap::{HttpWsdlLoader, WsdlLoader};
use crate::version::{is_supported, ServiceEndpoint, DEFAULT_VERSION};

pub const DEFAULT_APPLICATION_NAME: &str = "admanager-rust";

#[derive(Debug)]
pub struct ClientConfig {
    pub network_code: String,
    pub application_name: String,
    pub version: String,
    pub endpoint: ServiceEndpoint,
    pub http: Option<reqwest::Client>,
    pub poller: PollerConfig,
    pub credential: Option<Credential>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network_code: String::new(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            endpoint: ServiceEndpoint::default(),
            http: None,
            poller: PollerConfig::default(),
            credential: None,
        }
    }
}

impl ClientConfig {
    pub fn new(network_code: impl Into<String>) -> Self {
        Self {
            network_code: network_code.into(),
            ..Default::default()
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Uses the service account key found in the environment.
    pub async fn with_auth<S: AsRef<str>>(self, scopes: &[S]) -> Result<Self, Error> {
        let credential = Credential::from_env(scopes, RefreshConfig::default()).await?;
        Ok(self.with_credential(credential))
    }
}

/// Entry point to the services of one network.
#[derive(Clone, Debug)]
pub struct Client {
    network_code: String,
    application_name: String,
    version: String,
    endpoint: ServiceEndpoint,
    credential: Arc<Credential>,
    loader: Arc<dyn WsdlLoader>,
    http: reqwest::Client,
    poller: ReportJobPoller,
}

impl Client {
    /// Fails with [`Error::Configuration`] when `config` has no credential.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let credential = config
            .credential
            .ok_or(admanager_auth::error::Error::KeyMaterialRequired)?;
        if !is_supported(&config.version) {
            tracing::warn!(version = %config.version, "unsupported API version");
        }
        let http = config.http.unwrap_or_default();
        Ok(Self {
            network_code: config.network_code,
            application_name: config.application_name,
            version: config.version,
            endpoint: config.endpoint,
            credential: Arc::new(credential),
            loader: Arc::new(HttpWsdlLoader::new(http.clone())),
            http,
            poller: ReportJobPoller::new(config.poller),
        })
    }

    /// Replaces the loader building the service clients.
    pub fn with_loader(mut self, loader: Arc<dyn WsdlLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn network_code(&self) -> &str {
        &self.network_code
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Selects the API version of the services built afterwards.
    pub fn set_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        if !is_supported(&version) {
            tracing::warn!(version = %version, "unsupported API version");
        }
        self.version = version;
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn poller(&self) -> &ReportJobPoller {
        &self.poller
    }

    /// Builds the client of the service `name` with a fresh token.
    pub async fn service(&self, name: &str) -> Result<Service, Error> {
        self.create_service(name).await.map_err(|e| {
            tracing::debug!(service = name, "failed to get service: {e}");
            Error::Client(Box::new(e))
        })
    }

    pub async fn typed_service<T: OperationSet>(&self) -> Result<T, Error> {
        Ok(T::from_service(self.service(T::NAME).await?))
    }

    pub async fn report_service(&self) -> Result<ReportService, Error> {
        Ok(self.typed_service::<ReportService>().await?.with_http(self.http.clone()))
    }

    async fn create_service(&self, name: &str) -> Result<Service, Error> {
        let token = self.credential.token().await?;
        let config = GatewayConfig {
            version: self.version.clone(),
            network_code: self.network_code.clone(),
            token,
            application_name: self.application_name.clone(),
            service_name: name.to_string(),
            endpoint: self.endpoint.clone(),
            location: None,
        };
        ServiceGateway::new(config, self.loader.clone()).create_client().await
    }
}
