use std::sync::Arc;
use std::time::Duration;

use super::ConnectHook;
use super::GattClient;
use crate::AttTransport;
use crate::BridgeConfig;
use crate::Dispatcher;
use crate::Link;
use crate::Result;
use crate::SecurityLevel;

pub struct GattClientBuilder<P: AttTransport> {
    transport: P,
    config: BridgeConfig,
    dispatcher: Option<Arc<Dispatcher>>,
    on_connect: Option<ConnectHook>,
}

impl<P: AttTransport> GattClientBuilder<P> {
    /// Create a new builder with default config around `transport`
    pub fn new(transport: P) -> Self {
        Self {
            transport,
            config: BridgeConfig::default(),
            dispatcher: None,
            on_connect: None,
        }
    }

    /// Set how long a call waits for its callback (default: 120s)
    ///
    /// The timeout is kept in whole milliseconds, rounded up, so any non-zero
    /// duration stays non-zero. Durations too long for a `u64` saturate.
    pub fn callback_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.config.completion.callback_timeout_in_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Set the security level used when connecting (default: low)
    pub fn security_level(
        mut self,
        level: SecurityLevel,
    ) -> Self {
        self.config.connection.security_level = level;
        self
    }

    /// Set the local adapter to connect from
    pub fn source(
        mut self,
        source: impl Into<String>,
    ) -> Self {
        self.config.connection.source = Some(source.into());
        self
    }

    /// Run `hook` after each successful connect
    pub fn on_connect(
        mut self,
        hook: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_connect = Some(Box::new(hook));
        self
    }

    /// Share an existing dispatcher instead of creating one from the config
    pub fn dispatcher(
        mut self,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Completely replaces the default configuration
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through individual
    /// methods like [`callback_timeout`](GattClientBuilder::callback_timeout)
    /// or [`security_level`](GattClientBuilder::security_level).
    ///
    /// # Example
    /// ```ignore
    /// let config = BridgeConfig::new()?.validate()?;
    /// let client = GattClient::builder(transport).set_config(config).build()?;
    /// ```
    pub fn set_config(
        mut self,
        config: BridgeConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and builds the client. Nothing is started
    /// until [`GattClient::connect`].
    pub fn build(self) -> Result<GattClient<P>> {
        let config = self.config.validate()?;
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(Dispatcher::new(config.dispatcher.clone())));
        let link = Arc::new(Link::new(dispatcher));

        Ok(GattClient::with_link(
            Arc::new(self.transport),
            link,
            config,
            self.on_connect,
        ))
    }
}
