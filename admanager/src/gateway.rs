use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::soap::{self, is_control_method, BearerSecurity, RemoteClient, SoapHeader, WsdlLoader};
use crate::version::{namespace, ServiceEndpoint};

/// Field of a response element holding the returned value.
pub const PAYLOAD_FIELD: &str = "rval";

const SOAP_ACTOR_NEXT: &str = "http://schemas.xmlsoap.org/soap/actor/next";

/// `RequestHeader` block identifying the network and the calling application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub network_code: String,
    pub application_name: String,
    pub version: String,
}

impl From<&AuthHeader> for SoapHeader {
    fn from(h: &AuthHeader) -> Self {
        SoapHeader {
            name: "ns1:RequestHeader".to_string(),
            attributes: vec![
                ("soapenv:actor".to_string(), SOAP_ACTOR_NEXT.to_string()),
                ("soapenv:mustUnderstand".to_string(), "0".to_string()),
                ("xsi:type".to_string(), "ns1:SoapRequestHeader".to_string()),
                ("xmlns:ns1".to_string(), namespace(&h.version)),
                ("xmlns:xsi".to_string(), soap::envelope::XSI_NS.to_string()),
                ("xmlns:soapenv".to_string(), soap::envelope::SOAP_ENVELOPE_NS.to_string()),
            ],
            fields: vec![
                ("ns1:networkCode".to_string(), h.network_code.clone()),
                ("ns1:applicationName".to_string(), h.application_name.clone()),
            ],
        }
    }
}

/// Async wrapper generated for one remote operation. Resolves with the
/// payload field of the result, or `None` when it is absent.
pub type Operation = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Option<Value>, soap::Error>> + Send + Sync>;

fn adapt(client: Arc<dyn RemoteClient>, name: String) -> Operation {
    Arc::new(move |body| {
        let client = client.clone();
        let name = name.clone();
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            client.call(
                &name,
                body,
                Box::new(move |error, result| {
                    let outcome = match error {
                        Some(e) => Err(e),
                        None => Ok(result
                            .and_then(|mut r| r.get_mut(PAYLOAD_FIELD).map(Value::take))
                            .filter(|v| !v.is_null())),
                    };
                    let _ = tx.send(outcome);
                }),
            );
            rx.await.unwrap_or(Err(soap::Error::CallbackDropped(name)))
        })
    })
}

/// The operations of one service, bound to the client they were discovered on.
#[derive(Clone)]
pub struct Service {
    name: String,
    version: String,
    client: Arc<dyn RemoteClient>,
    operations: Arc<HashMap<String, Operation>>,
}

impl Debug for Service {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("operations", &self.operation_names())
            .finish()
    }
}

impl Service {
    fn new(name: String, version: String, client: Arc<dyn RemoteClient>) -> Self {
        let operations = client
            .method_names()
            .into_iter()
            .filter(|m| !is_control_method(m))
            .map(|m| (m.clone(), adapt(client.clone(), m)))
            .collect::<HashMap<_, _>>();
        Self {
            name,
            version,
            client,
            operations: Arc::new(operations),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sorted names of the wrapped remote operations.
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// The underlying client. It is shared, so its control methods are only
    /// available through [`ServiceGateway`] while the client is built.
    pub fn remote(&self) -> &dyn RemoteClient {
        self.client.as_ref()
    }

    pub async fn invoke(&self, operation: &str, body: Value) -> Result<Option<Value>, Error> {
        let op = self
            .operations
            .get(operation)
            .ok_or_else(|| soap::Error::UnknownOperation(operation.to_string()))?;
        tracing::trace!(service = %self.name, operation, "invoke");
        Ok(op(body).await?)
    }

    /// Like [`Service::invoke`], converting the request and the payload with serde.
    pub async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Option<Resp>, Error>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_value(request)?;
        match self.invoke(operation, body).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }
}

/// A typed view over the operations of one service.
pub trait OperationSet: Sized {
    /// Service name used in the endpoint URL.
    const NAME: &'static str;

    fn from_service(service: Service) -> Self;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub version: String,
    pub network_code: String,
    pub token: String,
    pub application_name: String,
    pub service_name: String,
    pub endpoint: ServiceEndpoint,
    /// Address calls are posted to instead of the `soap:address` of the
    /// description.
    pub location: Option<String>,
}

/// Builds the client of one service and wraps its operations.
#[derive(Debug)]
pub struct ServiceGateway {
    config: GatewayConfig,
    loader: Arc<dyn WsdlLoader>,
    client: Option<Arc<dyn RemoteClient>>,
}

impl ServiceGateway {
    pub fn new(config: GatewayConfig, loader: Arc<dyn WsdlLoader>) -> Self {
        Self {
            config,
            loader,
            client: None,
        }
    }

    pub fn resolve(&self, name: &str) -> String {
        self.config.endpoint.resolve(&self.config.version, name)
    }

    pub fn auth_header(&self) -> AuthHeader {
        AuthHeader {
            network_code: self.config.network_code.clone(),
            application_name: self.config.application_name.clone(),
            version: self.config.version.clone(),
        }
    }

    /// Installs the gateway token as bearer security on `client`.
    pub fn configure_security(&self, client: &mut dyn RemoteClient) -> Result<(), soap::Error> {
        client.set_security(BearerSecurity::new(self.config.token.as_str())?);
        Ok(())
    }

    /// Points `client` at the configured location, if any.
    pub fn configure_endpoint(&self, client: &mut dyn RemoteClient) {
        if let Some(location) = &self.config.location {
            client.set_endpoint(location.clone());
        }
    }

    /// The client built by the last successful [`ServiceGateway::create_client`].
    pub fn client(&self) -> Option<&Arc<dyn RemoteClient>> {
        self.client.as_ref()
    }

    /// Loads the service description, attaches the auth header, the location
    /// override and bearer security, and wraps every remote operation.
    /// Replaces any client built before.
    pub async fn create_client(&mut self) -> Result<Service, Error> {
        let url = self.resolve(&self.config.service_name);
        let mut client = self.loader.load(&url).await?;
        client.add_soap_header(SoapHeader::from(&self.auth_header()));
        self.configure_endpoint(client.as_mut());
        self.configure_security(client.as_mut())?;

        let client: Arc<dyn RemoteClient> = Arc::from(client);
        self.client = Some(client.clone());
        let service = Service::new(self.config.service_name.clone(), self.config.version.clone(), client);
        tracing::debug!(url, operations = service.operations.len(), "service client created");
        Ok(service)
    }
}
