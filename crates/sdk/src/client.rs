//! Kestrel-Net Client Implementation

use crate::error::Result;
use kestrel_net_core::application::{BatchOptions, RequestOptions, Response};
use kestrel_net_core::port::QueueTransport;
use kestrel_net_core::{Client, ClientConfig, ResponseIterator};
use kestrel_net_infra_queue::KestrelTransport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Kestrel-Net Client
///
/// Wires a queue transport and the request/response protocol together.
///
/// # Example
///
/// ```no_run
/// use kestrel_net_sdk::{ClientConfig, KestrelNetClient};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KestrelNetClient::connect(ClientConfig::default())?;
/// let rows = client.send("queries", &json!({"statement": "select 1"}))?;
/// # Ok(())
/// # }
/// ```
pub struct KestrelNetClient {
    client: Client,
    config: ClientConfig,
}

impl KestrelNetClient {
    /// Connect to the Kestrel server named in `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Host, port, response queue prefix, timeouts
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        info!(address = %config.address(), "Connecting to Kestrel");

        let transport = KestrelTransport::from_config(&config)?;
        Self::with_transport(Arc::new(transport), config)
    }

    /// Connect using `KESTREL_NET_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::connect(ClientConfig::from_env()?)
    }

    /// Use an already constructed transport (e.g. `MemoryTransport`)
    pub fn with_transport(
        transport: Arc<dyn QueueTransport>,
        config: ClientConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: Client::new(transport, &config),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying protocol client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request and collect all responses
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use kestrel_net_sdk::{ClientConfig, KestrelNetClient};
    /// # use serde_json::json;
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = KestrelNetClient::connect(ClientConfig::default())?;
    /// for row in client.send("queries", &json!({"statement": "select 1"}))? {
    ///     println!("{}", row);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn send<T>(&self, queue: &str, request: &T) -> Result<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        self.send_with(queue, request, &RequestOptions::new())
    }

    pub fn send_with<T>(
        &self,
        queue: &str,
        request: &T,
        options: &RequestOptions,
    ) -> Result<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.client.send(queue, request, options)?)
    }

    /// Send a request, reporting whether the stream ended on EOF or timeout
    pub fn send_detailed<T>(
        &self,
        queue: &str,
        request: &T,
        options: &RequestOptions,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.client.send_detailed(queue, request, options)?)
    }

    /// Send a request and deserialize every response into `R`
    pub fn send_as<T, R>(
        &self,
        queue: &str,
        request: &T,
        options: &RequestOptions,
    ) -> Result<Vec<R>>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_with(queue, request, options)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(Into::into))
            .collect()
    }

    /// Send a request and stream its responses in batches
    ///
    /// The caller owns the response queue and must call `finished()` on the
    /// iterator once done.
    pub fn iterate<T>(
        &self,
        queue: &str,
        request: &T,
        options: &RequestOptions,
        batch_size: Option<usize>,
    ) -> Result<ResponseIterator>
    where
        T: Serialize + ?Sized,
    {
        let batch = batch_size.map(BatchOptions::new);
        Ok(self.client.iterate(queue, request, options, batch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_net_infra_queue::MemoryTransport;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    fn memory_client(transport: Arc<MemoryTransport>) -> KestrelNetClient {
        let config = ClientConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        };
        KestrelNetClient::with_transport(transport, config).unwrap()
    }

    #[test]
    fn test_send_as_deserializes_rows() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Row {
            row: u32,
        }

        let transport = Arc::new(MemoryTransport::new());
        let queue = "response-net-kestrel-typed";
        transport.put(queue, br#"{"row":1}"#, None).unwrap();
        transport.put(queue, br#"{"row":2}"#, None).unwrap();
        transport.put(queue, br#"{"EOF":true}"#, None).unwrap();

        let client = memory_client(transport.clone());
        let rows: Vec<Row> = client
            .send_as("q", &json!({}), &RequestOptions::new().suffix("typed"))
            .unwrap();

        assert_eq!(rows, vec![Row { row: 1 }, Row { row: 2 }]);
        assert!(!transport.contains_queue(queue).unwrap());
        assert_eq!(transport.len("q").unwrap(), 1);
    }

    #[test]
    fn test_with_transport_rejects_invalid_config() {
        let config = ClientConfig {
            batch_size: 0,
            ..Default::default()
        };
        let result = KestrelNetClient::with_transport(Arc::new(MemoryTransport::new()), config);
        assert!(result.is_err());
    }
}
