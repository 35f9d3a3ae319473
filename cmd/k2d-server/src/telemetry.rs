use clap::ValueEnum;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Sets up the global `tracing` subscriber: an env-filtered fmt layer in
/// the requested format, plus an OTLP exporter layer when `tracing_url` is
/// set. Safe to call once, at process startup.
pub async fn init(
    log_filter: &str,
    log_format: LogFormat,
    tracing_url: Option<&str>,
    sample_ratio: f64,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = match log_format {
        LogFormat::Text => Box::new(tracing_subscriber::fmt::layer()),
        LogFormat::Json => Box::new(tracing_subscriber::fmt::layer().json()),
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    match tracing_url {
        Some(url) => {
            let exporter = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(url)
                .build()?;

            let provider = SdkTracerProvider::builder()
                .with_sampler(Sampler::TraceIdRatioBased(sample_ratio))
                .with_batch_exporter(exporter)
                .with_resource(
                    Resource::builder()
                        .with_attributes(vec![KeyValue::new("service.name", "k2d")])
                        .build(),
                )
                .build();

            opentelemetry::global::set_tracer_provider(provider.clone());
            let tracer = provider.tracer("k2d");
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            registry.with(otel_layer).try_init()?;
        }
        None => {
            registry.try_init()?;
        }
    }

    Ok(())
}
