//! Log subscriber and optional OTLP span export.
//!
//! Spans are exported over gRPC only when `OTEL_EXPORTER_OTLP_ENDPOINT` is
//! set. Exported spans carry the service name, version, build commit and an
//! instance id.

use crate::GIT_COMMIT_HASH;
use anyhow::{Result, anyhow, bail};
use opentelemetry::{
    KeyValue, global, propagation::TextMapCompositePropagator, trace::TracerProvider as _,
};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::SdkTracerProvider,
};
use std::{env::var, sync::OnceLock, time::Duration};
use tonic::{
    metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

// Capped regardless of the requested verbosity.
const QUIET_TARGETS: [&str; 5] = [
    "hyper=error",
    "h2=error",
    "tokio=error",
    "sqlx=warn",
    "opentelemetry_sdk=warn",
];

/// Collector settings read from the standard `OTEL_*` variables.
#[derive(Debug)]
struct ExportSettings {
    endpoint: String,
    tls_domain: Option<String>,
    metadata: MetadataMap,
    instance_id: String,
}

impl ExportSettings {
    /// `None` when no collector endpoint is configured.
    fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|ep| !ep.trim().is_empty())
        else {
            return Ok(None);
        };

        let endpoint = normalize_endpoint(raw.trim());
        let tls_domain = endpoint
            .strip_prefix("https://")
            .and_then(|rest| rest.split(['/', ':']).next())
            .filter(|host| !host.is_empty())
            .map(str::to_string);

        let metadata = lookup("OTEL_EXPORTER_OTLP_HEADERS")
            .map(|headers| metadata_from_headers(&headers))
            .transpose()?
            .unwrap_or_default();

        let instance_id =
            lookup("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|| Ulid::new().to_string());

        Ok(Some(Self {
            endpoint,
            tls_domain,
            metadata,
            instance_id,
        }))
    }
}

// `key=value,key=value`; pairs without `=` are skipped.
fn metadata_from_headers(raw: &str) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();

    for pair in raw.split(',').filter(|pair| !pair.trim().is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            warn!("Ignoring malformed OTLP header entry");
            continue;
        };

        let key = key.trim().to_ascii_lowercase();
        if key.ends_with("-bin") {
            bail!("binary OTLP header {key} is not supported");
        }

        let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
            .map_err(|e| anyhow!("invalid OTLP header name {key}: {e}"))?;
        let value: MetadataValue<Ascii> = value
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid OTLP header value for {key}: {e}"))?;
        metadata.insert(name, value);
    }

    Ok(metadata)
}

// gRPC collectors default to TLS when no scheme is given.
fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

fn resource_attributes(instance_id: &str) -> Vec<KeyValue> {
    vec![
        KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("service.instance.id", instance_id.to_string()),
        KeyValue::new("vcs.ref.head.revision", GIT_COMMIT_HASH),
    ]
}

fn install_provider(settings: &ExportSettings) -> Result<SdkTracerProvider> {
    let mut builder = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.endpoint.clone())
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT)
        .with_metadata(settings.metadata.clone());

    if let Some(domain) = &settings.tls_domain {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.clone())
                .with_native_roots(),
        );
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(builder.build()?)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(resource_attributes(&settings.instance_id))
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider)
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    // RUST_LOG overrides the verbosity flag
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    QUIET_TARGETS.iter().try_fold(filter, |filter, directive| {
        Ok::<_, anyhow::Error>(filter.add_directive(directive.parse()?))
    })
}

/// Install the global subscriber, exporting spans when a collector is configured.
///
/// # Errors
///
/// Returns an error if the OTLP settings are invalid or a subscriber is already installed
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let filter = env_filter(verbosity_level.unwrap_or(Level::ERROR))?;

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .compact();

    let otel_layer = match ExportSettings::from_lookup(|key| var(key).ok())? {
        Some(settings) => {
            let provider = install_provider(&settings)?;
            Some(tracing_opentelemetry::layer().with_tracer(provider.tracer(env!("CARGO_PKG_NAME"))))
        }
        None => None,
    };

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush pending spans; noop when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("Flushing span exporter");
        if let Err(err) = provider.shutdown() {
            warn!("Span exporter shutdown failed: {err}");
        }
    }
}
