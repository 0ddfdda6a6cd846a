//! Tracing hooks that vanish without the `tracing` feature.
//!
//! With the feature enabled, `trace_span!` opens an info-level span,
//! `trace_event!` records an info event and `trace_warn!` a warn event.
//! Without it, spans are [`DisabledSpan`] placeholders and event fields are
//! evaluated once and dropped, so call sites need no `cfg` attributes.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:literal $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::span!(tracing::Level::INFO, $name $(, $field = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:literal $(, $field:ident = $value:expr)* $(,)?) => {{
        $crate::trace::discard(($($value,)*));
        $crate::trace::DisabledSpan
    }};
}

#[cfg(feature = "tracing")]
macro_rules! trace_record {
    ($level:ident, $name:literal $(, $field:ident = $value:expr)+) => {
        tracing::event!(name: $name, tracing::Level::$level $(, $field = $value)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_record {
    ($level:ident, $name:literal $(, $field:ident = $value:expr)+) => {
        $crate::trace::discard(($($value,)+))
    };
}

macro_rules! trace_event {
    ($name:literal $(, $field:ident = $value:expr)+ $(,)?) => {
        $crate::trace::trace_record!(INFO, $name $(, $field = $value)+)
    };
}

macro_rules! trace_warn {
    ($name:literal $(, $field:ident = $value:expr)+ $(,)?) => {
        $crate::trace::trace_record!(WARN, $name $(, $field = $value)+)
    };
}

pub(crate) use {trace_event, trace_record, trace_span, trace_warn};

/// Consumes event fields when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn discard<T>(_fields: T) {}

/// Span placeholder returned by `trace_span!` when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    /// Same shape as `tracing::Span::entered`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
