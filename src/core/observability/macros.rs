/// Creates a root span subject to head sampling, or a child span
/// when a sampled parent is already active. Sampling happens before
/// the span exists so unsampled requests pay nothing for tracing.
///
/// # Arguments
/// * `sample_percent` - The fraction (0.0 to 1.0) of roots to sample
/// * `span_name` - The name of the span if created (must be a literal)
///
/// # Example
/// ```ignore
/// let span = sample_or_attach_root_span!(0.01, "bid_request");
/// pipeline.run(&ctx).instrument(span).await
/// ```
#[macro_export]
macro_rules! sample_or_attach_root_span {
    ($sample_percent:expr, $span_name:literal) => {{
        if !::tracing::Span::current().is_disabled() || ::rand::random::<f32>() < $sample_percent {
            ::tracing::info_span!($span_name)
        } else {
            ::tracing::Span::none()
        }
    }};
    ($sample_percent:expr, $span_name:literal, $($fields:tt)*) => {{
        if !::tracing::Span::current().is_disabled() || ::rand::random::<f32>() < $sample_percent {
            ::tracing::info_span!($span_name, $($fields)*)
        } else {
            ::tracing::Span::none()
        }
    }};
}

/// Creates an INFO-level child span only if the parent span is
/// active (sampled), otherwise `Span::none()`.
///
/// Returns an **un-entered** span, call `.entered()` or `.instrument()`.
#[macro_export]
macro_rules! child_span_info {
    ($span_name:literal) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::info_span!($span_name)
        } else {
            ::tracing::Span::none()
        }
    }};
    ($span_name:literal, $($fields:tt)*) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::info_span!($span_name, $($fields)*)
        } else {
            ::tracing::Span::none()
        }
    }};
}

/// DEBUG-level twin of [`child_span_info!`]
#[macro_export]
macro_rules! child_span_debug {
    ($span_name:literal) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::debug_span!($span_name)
        } else {
            ::tracing::Span::none()
        }
    }};
    ($span_name:literal, $($fields:tt)*) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::debug_span!($span_name, $($fields)*)
        } else {
            ::tracing::Span::none()
        }
    }};
}
