use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use serde::Deserialize;
use tracing::{Instrument, error, info, instrument, warn};

use common::{TraceId, root_span, warn_if_slow};
use market::exchange::resolve_wildcard;
use market::{Bar, ExchangeApi, Interval, Window, job_key};

use crate::bus::MessageHandler;
use crate::config::EngineConfig;
use crate::error::ControlError;
use crate::indicators::IndicatorLibrary;
use crate::job::Job;
use crate::previous::PreviousValueStore;
use crate::registry::JobRegistry;
use crate::rule::{IndicatorRule, RuleSpec};

/// Selector that expands to every actively traded instrument of the reference quote.
pub const WILDCARD: &str = "ALL";

const SLOW_SEED_FETCH: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub websocket_kline_options: KlineOptions,
    #[serde(default)]
    pub indicators: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineOptions {
    pub symbol: String,
    pub interval: String,
    #[serde(default)]
    pub exchange: String,
}

/// What a registration ended up installing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub interval: Interval,
    /// Registry keys installed or replaced.
    pub installed: Vec<String>,
    /// Instruments whose seed history could not be fetched.
    pub skipped: Vec<String>,
}

pub struct ControlHandler {
    registry: Arc<JobRegistry>,
    previous: Arc<PreviousValueStore>,
    exchange: Arc<dyn ExchangeApi>,
    library: Arc<IndicatorLibrary>,
    config: EngineConfig,
}

impl ControlHandler {
    pub fn new(
        registry: Arc<JobRegistry>,
        previous: Arc<PreviousValueStore>,
        exchange: Arc<dyn ExchangeApi>,
        library: Arc<IndicatorLibrary>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            previous,
            exchange,
            library,
            config,
        }
    }

    /// Parses, validates, seeds and installs one registration request.
    ///
    /// Nothing is installed unless the payload, interval, rules and (for the
    /// wildcard) the metadata query are all valid.
    pub async fn register(&self, payload: &[u8]) -> Result<Registration, ControlError> {
        let request: ControlRequest = serde_json::from_slice(payload)?;
        let options = request.websocket_kline_options;

        let selector = options.symbol.trim().to_ascii_uppercase();
        if selector.is_empty() {
            return Err(ControlError::EmptySelector);
        }
        let interval = Interval::from_str(options.interval.trim())?;

        let span = tracing::Span::current();
        span.record("symbol", selector.as_str());
        span.record("interval", interval.as_str());

        let rules = self.build_rules(request.indicators)?;
        let symbols = self.resolve(&selector).await?;
        if symbols.is_empty() {
            warn!(selector = %selector, "selector resolved to no instruments");
        }

        let seeded = self.seed(&symbols, interval).await;
        let mut registration = Registration {
            interval,
            installed: Vec::with_capacity(symbols.len()),
            skipped: Vec::new(),
        };

        for (symbol, seed) in seeded {
            let mut windows = HashMap::new();
            match seed {
                Some(window) => {
                    windows.insert(symbol.clone(), window);
                }
                None => registration.skipped.push(symbol.clone()),
            }

            let key = job_key(&symbol, interval.as_str());
            let job = Job {
                generation: self.registry.next_generation(),
                interval,
                exchange: options.exchange.clone(),
                symbols: vec![symbol],
                rules: Arc::clone(&rules),
                windows,
            };

            if let Some(old) = self.registry.upsert(&key, job) {
                self.previous.forget_generation(old.generation);
            }
            registration.installed.push(key);
        }

        Ok(registration)
    }

    fn build_rules(&self, specs: Vec<RuleSpec>) -> Result<Arc<[IndicatorRule]>, ControlError> {
        if specs.is_empty() {
            return Err(ControlError::NoRules);
        }

        specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let indicator = spec.indicator.clone();
                IndicatorRule::from_spec(spec, &self.library).map_err(|source| {
                    ControlError::InvalidRule {
                        index,
                        indicator,
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Arc::from)
    }

    #[instrument(skip(self), target = "control")]
    async fn resolve(&self, selector: &str) -> Result<Vec<String>, ControlError> {
        if !selector.eq_ignore_ascii_case(WILDCARD) {
            return Ok(vec![selector.to_string()]);
        }

        let listing = self
            .exchange
            .exchange_info()
            .await
            .map_err(ControlError::Metadata)?;
        let symbols = resolve_wildcard(&listing, &self.config.reference_quote);

        info!(
            listed = listing.len(),
            matched = symbols.len(),
            quote = %self.config.reference_quote,
            "wildcard resolved"
        );
        Ok(symbols)
    }

    /// Fetches seed histories, a bounded number at a time, preserving order.
    async fn seed(&self, symbols: &[String], interval: Interval) -> Vec<(String, Option<Window>)> {
        let limit = self.config.seed_limit;

        stream::iter(symbols.iter().cloned())
            .map(|symbol| {
                let exchange = Arc::clone(&self.exchange);
                async move {
                    let fetch = exchange.historical_bars(&symbol, interval, limit);
                    let window = match warn_if_slow("seed_fetch", SLOW_SEED_FETCH, fetch).await {
                        Ok(bars) => seed_window(&symbol, bars),
                        Err(e) => {
                            warn!(
                                symbol = %symbol,
                                interval = %interval,
                                error = %e,
                                "seed fetch failed; skipping"
                            );
                            None
                        }
                    };
                    (symbol, window)
                }
            })
            .buffered(self.config.seed_fetch_concurrency.max(1))
            .collect()
            .await
    }
}

fn seed_window(symbol: &str, bars: Vec<Bar>) -> Option<Window> {
    match Window::seeded(bars) {
        Ok(window) => Some(window),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "unusable seed history; skipping");
            None
        }
    }
}

#[async_trait]
impl MessageHandler for ControlHandler {
    async fn handle(&self, payload: &[u8]) {
        let trace_id = TraceId::default();
        let span = root_span("control_registration", &trace_id);

        async {
            match self.register(payload).await {
                Ok(reg) => info!(
                    interval = %reg.interval,
                    installed = reg.installed.len(),
                    skipped = reg.skipped.len(),
                    "registration applied"
                ),
                Err(ControlError::Metadata(e)) => {
                    error!(error = %e, "wildcard registration aborted")
                }
                Err(e) => warn!(error = %e, "registration rejected"),
            }
        }
        .instrument(span)
        .await
    }
}
