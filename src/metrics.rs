//! Prometheus metrics collection for applinkd.
//!
//! Tracks registry activity (subscriptions, lookups, detected anomalies) and
//! transport health. Served on an HTTP endpoint for Prometheus scraping; see
//! [`crate::http`].

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Total command subscriptions accepted.
pub static COMMANDS_SUBSCRIBED: OnceLock<IntCounter> = OnceLock::new();

/// Total command subscriptions removed (explicitly or via session cleanup).
pub static COMMANDS_REMOVED: OnceLock<IntCounter> = OnceLock::new();

/// Command lookups that resolved to a live subscriber.
pub static LOOKUP_HITS: OnceLock<IntCounter> = OnceLock::new();

/// Command lookups that found no routable subscriber.
pub static LOOKUP_MISSES: OnceLock<IntCounter> = OnceLock::new();

/// Counter decrements that were clamped at zero.
pub static COUNTER_UNDERFLOWS: OnceLock<IntCounter> = OnceLock::new();

/// Registry error conditions by error code.
pub static REGISTRY_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Currently connected applications.
pub static CONNECTED_APPLICATIONS: OnceLock<IntGauge> = OnceLock::new();

/// Active transport connections.
pub static ACTIVE_LINKS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at daemon startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        COMMANDS_SUBSCRIBED,
        IntCounter::new("applink_commands_subscribed_total", "Command subscriptions accepted")
    );
    register!(
        COMMANDS_REMOVED,
        IntCounter::new("applink_commands_removed_total", "Command subscriptions removed")
    );
    register!(
        LOOKUP_HITS,
        IntCounter::new("applink_command_lookup_hits_total", "Lookups resolved to a subscriber")
    );
    register!(
        LOOKUP_MISSES,
        IntCounter::new("applink_command_lookup_misses_total", "Lookups with no routable subscriber")
    );
    register!(
        COUNTER_UNDERFLOWS,
        IntCounter::new("applink_counter_underflows_total", "Request counter decrements clamped at zero")
    );
    register!(
        REGISTRY_ERRORS,
        IntCounterVec::new(
            Opts::new("applink_registry_errors_total", "Registry error conditions by code"),
            &["error"]
        )
    );
    register!(
        CONNECTED_APPLICATIONS,
        IntGauge::new("applink_connected_applications", "Currently connected applications")
    );
    register!(
        ACTIVE_LINKS,
        IntGauge::new("applink_active_links", "Active transport connections")
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for registry metric updates
// ============================================================================

#[inline]
pub fn command_subscribed() {
    if let Some(c) = COMMANDS_SUBSCRIBED.get() {
        c.inc();
    }
}

#[inline]
pub fn command_removed() {
    if let Some(c) = COMMANDS_REMOVED.get() {
        c.inc();
    }
}

#[inline]
pub fn lookup_hit() {
    if let Some(c) = LOOKUP_HITS.get() {
        c.inc();
    }
}

#[inline]
pub fn lookup_miss() {
    if let Some(c) = LOOKUP_MISSES.get() {
        c.inc();
    }
}

#[inline]
pub fn counter_underflow() {
    if let Some(c) = COUNTER_UNDERFLOWS.get() {
        c.inc();
    }
}

/// Record a registry error condition by its static code.
#[inline]
pub fn registry_error(code: &'static str) {
    if let Some(c) = REGISTRY_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

#[inline]
pub fn set_connected_applications(count: usize) {
    if let Some(g) = CONNECTED_APPLICATIONS.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn inc_active_links() {
    if let Some(g) = ACTIVE_LINKS.get() {
        g.inc();
    }
}

#[inline]
pub fn dec_active_links() {
    if let Some(g) = ACTIVE_LINKS.get() {
        g.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        command_subscribed();
        registry_error("missing_application");

        let output = gather_metrics();
        assert!(output.contains("applink_commands_subscribed_total"));
        assert!(output.contains("applink_registry_errors_total"));
    }
}
