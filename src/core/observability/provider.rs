use crate::app::config::{FileRotation, LogSink, LoggingConfig, OtelProto};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::{FmtSpan, Writer};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

type DynLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync + 'static>;

struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Export pipelines that must be flushed at shutdown
pub struct OtelProviders {
    pub tracer: SdkTracerProvider,
    pub meter: Option<SdkMeterProvider>,
}

/// Installs the global subscriber with one layer per configured sink.
/// Returns the otel providers when an OTLP sink is present so they
/// can be flushed on shutdown.
pub fn init(config: &LoggingConfig) -> Result<Option<OtelProviders>> {
    config.validate()?;

    let filter = EnvFilter::from_default_env()
        .add_directive("error".parse()?)
        .add_directive(format!("{}={}", env!("CARGO_PKG_NAME"), config.level).parse()?);

    let mut layers: Vec<DynLayer> = Vec::with_capacity(config.sinks.len());
    let mut otel_providers: Option<OtelProviders> = None;

    for sink in &config.sinks {
        match sink {
            LogSink::Stdout { color, json, spans } => {
                let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
                // flushed on exit by the process, not by the guard
                std::mem::forget(guard);

                layers.push(fmt_layer(writer, *json, *spans, *color));
            }
            LogSink::File {
                path,
                json,
                rotation,
                max_files,
                spans,
            } => {
                let writer = create_file_writer(path, rotation, *max_files)?;

                layers.push(fmt_layer(writer, *json, *spans, false));
            }
            LogSink::Otel {
                endpoint,
                proto,
                metrics,
                metrics_interval_secs,
            } => {
                if otel_providers.is_some() {
                    bail!("Only one otel sink may be configured");
                }

                let (otel_layer, tracer) = create_otel_layer(endpoint, proto, config.span_sample_rate)?;
                layers.push(otel_layer);

                let meter = if *metrics {
                    let interval = Duration::from_secs(u64::from(*metrics_interval_secs));
                    Some(create_meter_provider(endpoint, proto, interval)?)
                } else {
                    None
                };

                otel_providers = Some(OtelProviders { tracer, meter });
            }
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Tracing subscriber already installed")?;

    if let Some(providers) = &otel_providers {
        global::set_text_map_propagator(TraceContextPropagator::new());
        let _ = global::set_tracer_provider(providers.tracer.clone());

        if let Some(meter) = &providers.meter {
            global::set_meter_provider(meter.clone());
        }
    }

    Ok(otel_providers)
}

/// Flushes and stops the otel exporters
pub fn shutdown(providers: &OtelProviders) -> Result<()> {
    if let Some(meter) = &providers.meter {
        meter.shutdown().context("Meter provider shutdown failed")?;
    }

    providers
        .tracer
        .shutdown()
        .context("Tracer provider shutdown failed")
}

fn fmt_layer<W>(writer: W, json: bool, spans: bool, ansi: bool) -> DynLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer().with_writer(writer).with_span_events(span_events);

    if json {
        layer.json().boxed()
    } else {
        layer.compact().with_timer(CompactTime).with_ansi(ansi).boxed()
    }
}

fn create_file_writer(path: &Path, rotation: &FileRotation, max_files: usize) -> Result<NonBlocking> {
    let (Some(directory), Some(file_name)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
        bail!("Log file path {} has no file name", path.display());
    };

    if !directory.as_os_str().is_empty() {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Could not create log directory {}", directory.display()))?;
    }

    prune_log_files(directory, file_name, max_files)?;

    let appender = match rotation {
        FileRotation::Daily => rolling::daily(directory, file_name),
        FileRotation::Hourly => rolling::hourly(directory, file_name),
        FileRotation::Never => rolling::never(directory, file_name),
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);
    std::mem::forget(guard);

    Ok(writer)
}

/// Keeps only the `max_files` most recently modified files starting
/// with `prefix`, zero keeps everything
fn prune_log_files(directory: &Path, prefix: &str, max_files: usize) -> Result<()> {
    if max_files == 0 {
        return Ok(());
    }

    let mut rotated: Vec<(SystemTime, PathBuf)> = std::fs::read_dir(directory)?
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|meta| meta.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .collect();

    rotated.sort_by_key(|(modified, _)| Reverse(*modified));

    for (_, path) in rotated.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            eprintln!("Could not prune log file {}: {}", path.display(), e);
        }
    }

    Ok(())
}

fn create_otel_layer(
    endpoint: &str,
    proto: &OtelProto,
    sample_rate: f32,
) -> Result<(DynLayer, SdkTracerProvider)> {
    use opentelemetry_otlp::WithExportConfig;

    let exporter = match proto {
        OtelProto::Grpc => {
            let mut builder = opentelemetry_otlp::SpanExporter::builder().with_tonic();
            if !endpoint.is_empty() {
                builder = builder.with_endpoint(endpoint);
            }

            builder
                .build()
                .context("failed to build OTLP gRPC exporter")?
        }
        OtelProto::Http => build_http_exporter(endpoint)?,
    };

    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(sample_rate as f64)));

    let tracer_provider = SdkTracerProvider::builder()
        .with_sampler(sampler)
        .with_resource(service_resource())
        .with_batch_exporter(exporter)
        .build();

    let tracer = tracer_provider.tracer(env!("CARGO_PKG_NAME"));
    let layer = tracing_opentelemetry::layer().with_tracer(tracer).boxed();

    Ok((layer, tracer_provider))
}

fn service_resource() -> Resource {
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string());

    Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build()
}

fn create_meter_provider(endpoint: &str, proto: &OtelProto, interval: Duration) -> Result<SdkMeterProvider> {
    use opentelemetry_otlp::WithExportConfig;

    let exporter = match proto {
        OtelProto::Grpc => {
            let mut builder = opentelemetry_otlp::MetricExporter::builder().with_tonic();
            if !endpoint.is_empty() {
                builder = builder.with_endpoint(endpoint);
            }

            builder
                .build()
                .context("failed to build OTLP gRPC metric exporter")?
        }
        OtelProto::Http => build_http_metric_exporter(endpoint)?,
    };

    let reader = PeriodicReader::builder(exporter).with_interval(interval).build();

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(service_resource())
        .build())
}

#[cfg(feature = "otel-http")]
fn build_http_exporter(endpoint: &str) -> Result<opentelemetry_otlp::SpanExporter> {
    use opentelemetry_otlp::WithExportConfig;

    let mut builder = opentelemetry_otlp::SpanExporter::builder().with_http();
    if !endpoint.is_empty() {
        builder = builder.with_endpoint(endpoint);
    }

    builder
        .build()
        .context("failed to build OTLP HTTP exporter")
}

#[cfg(not(feature = "otel-http"))]
fn build_http_exporter(_: &str) -> Result<opentelemetry_otlp::SpanExporter> {
    bail!("OTLP HTTP exporter requested but the build does not enable the `otel-http` feature")
}

#[cfg(feature = "otel-http")]
fn build_http_metric_exporter(endpoint: &str) -> Result<opentelemetry_otlp::MetricExporter> {
    use opentelemetry_otlp::WithExportConfig;

    let mut builder = opentelemetry_otlp::MetricExporter::builder().with_http();
    if !endpoint.is_empty() {
        builder = builder.with_endpoint(endpoint);
    }

    builder
        .build()
        .context("failed to build OTLP HTTP metric exporter")
}

#[cfg(not(feature = "otel-http"))]
fn build_http_metric_exporter(_: &str) -> Result<opentelemetry_otlp::MetricExporter> {
    bail!("OTLP HTTP exporter requested but the build does not enable the `otel-http` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_newest_files() {
        let dir = std::env::temp_dir().join(format!("rdsp-logs-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        for i in 0..5 {
            std::fs::write(dir.join(format!("rdsp.log.{}", i)), b"line").unwrap();
        }
        std::fs::write(dir.join("unrelated.txt"), b"keep").unwrap();

        prune_log_files(&dir, "rdsp.log", 2).unwrap();

        let remaining = std::fs::read_dir(&dir).unwrap().count();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(remaining, 3);
    }
}
