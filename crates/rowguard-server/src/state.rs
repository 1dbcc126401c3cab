use std::time::Duration;

use async_trait::async_trait;
use rowguard_adapter_pg::PgContextConnection;
use rowguard_core::RowguardConfig;
use rowguard_session::{ConnectionSource, ContextBinder};
use rowguard_token::{DecoderOptions, PrincipalDecoder, SigningSecret};

/// Shared application state.
///
/// Holds nothing per request: principals travel in request extensions and
/// security contexts live only inside a guard.
pub struct AppState<S> {
    pub decoder: PrincipalDecoder,
    pub binder: ContextBinder,
    pub source: S,
    pub request_timeout: Option<Duration>,
}

impl<S: ConnectionSource> AppState<S> {
    pub fn new(config: &RowguardConfig, secret: &SigningSecret, source: S) -> anyhow::Result<Self> {
        Ok(Self {
            decoder: PrincipalDecoder::new(secret, DecoderOptions::from(&config.auth)),
            binder: ContextBinder::from_config(&config.session)?,
            source,
            request_timeout: config.session.request_timeout_ms.map(Duration::from_millis),
        })
    }
}

/// Reads back the security variable as the database sees it.
#[async_trait]
pub trait SecurityProbe: Send {
    async fn bound_principal(&mut self, variable: &str) -> anyhow::Result<Option<String>>;
}

#[async_trait]
impl SecurityProbe for PgContextConnection {
    async fn bound_principal(&mut self, variable: &str) -> anyhow::Result<Option<String>> {
        let value = rowguard_adapter_pg::current_setting(self.pg()?, variable).await?;
        Ok(value)
    }
}

#[cfg(test)]
#[async_trait]
impl SecurityProbe for rowguard_session::testing::MemoryConnection {
    async fn bound_principal(&mut self, variable: &str) -> anyhow::Result<Option<String>> {
        Ok(self.visible_setting(variable))
    }
}
