//! # admanager
//!
//! Typed gateway for the Google Ad Manager SOAP API.
//!
//! Services are discovered from their published description at runtime. A
//! [`Client`] obtains an access token, builds the SOAP client of the
//! requested service and returns a [`Service`] exposing one async operation
//! per remote operation.
//!
//! ```no_run
//! use admanager::{Client, ClientConfig};
//! use serde_json::json;
//!
//! async fn run() -> Result<(), admanager::Error> {
//!     let config = ClientConfig::new("12345678").with_auth(&["DFP"]).await?;
//!     let client = Client::new(config)?;
//!
//!     let line_items = client.service("LineItemService").await?;
//!     let page = line_items
//!         .invoke("getLineItemsByStatement", json!({ "filterStatement": { "query": "LIMIT 10" } }))
//!         .await?;
//!
//!     let reports = client.report_service().await?;
//!     let query = json!({ "dimensions": ["DATE"], "columns": ["AD_SERVER_IMPRESSIONS"], "dateRangeType": "YESTERDAY" });
//!     let mut report = reports
//!         .report(query, Default::default(), client.poller(), None)
//!         .await?;
//!     report.save("report.csv.gz").await?;
//!     Ok(())
//! }
//! ```
pub mod client;
pub mod error;
pub mod gateway;
pub mod report;
pub mod soap;
pub mod version;

pub use admanager_auth as auth;
pub use admanager_gax::cancel::CancellationToken;
pub use client::{Client, ClientConfig};
pub use error::Error;
pub use gateway::{OperationSet, Service, ServiceGateway};
