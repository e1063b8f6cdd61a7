//! Prometheus counters describing the chat worker's traffic.

use prometheus::{
    Counter, CounterVec, Opts, Registry, register_counter_vec_with_registry,
    register_counter_with_registry,
};
use std::collections::HashMap;

/// Counters updated by every worker whose config carries this bundle. Cloning is
/// cheap and clones share the underlying counters.
#[derive(Clone)]
pub struct MetricsBundle {
    /// Lines received from the server, labelled by `kind` (`ping`, `chat`, `ignored`, `malformed`).
    pub lines_received: CounterVec,
    /// Commands written to the server, labelled by `command`.
    pub commands_sent: CounterVec,
    /// Events published to the consumer, labelled by `type` (`message`, `notice`).
    pub events_published: CounterVec,
    /// Connections that were attempted.
    pub connections_created: Counter,
    /// Connections that ended with an error.
    pub connections_failed: Counter,
}

impl MetricsBundle {
    /// Create the counters and register them with `registry`. `constant_labels`
    /// are attached to every counter.
    pub fn register(
        registry: &Registry,
        constant_labels: HashMap<String, String>,
    ) -> Result<MetricsBundle, prometheus::Error> {
        let lines_received = register_counter_vec_with_registry!(
            Opts::new(
                "twitchchat_lines_received",
                "Number of protocol lines received from the chat server, across all connections."
            )
            .const_labels(constant_labels.clone()),
            &["kind"],
            registry
        )?;

        let commands_sent = register_counter_vec_with_registry!(
            Opts::new(
                "twitchchat_commands_sent",
                "Number of commands sent to the chat server, across all connections."
            )
            .const_labels(constant_labels.clone()),
            &["command"],
            registry
        )?;

        let events_published = register_counter_vec_with_registry!(
            Opts::new(
                "twitchchat_events_published",
                "Number of events handed to the consumer."
            )
            .const_labels(constant_labels.clone()),
            &["type"],
            registry
        )?;

        let connections_created = register_counter_with_registry!(
            Opts::new(
                "twitchchat_connections_created",
                "Number of connections attempted since the start of the process."
            )
            .const_labels(constant_labels.clone()),
            registry
        )?;

        let connections_failed = register_counter_with_registry!(
            Opts::new(
                "twitchchat_connections_failed",
                "Number of connections that ended with an error since the start of the process."
            )
            .const_labels(constant_labels),
            registry
        )?;

        Ok(MetricsBundle {
            lines_received,
            commands_sent,
            events_published,
            connections_created,
            connections_failed,
        })
    }
}

impl std::fmt::Debug for MetricsBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsBundle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice_fails() {
        let registry = Registry::new();
        let bundle = MetricsBundle::register(&registry, HashMap::new()).unwrap();
        bundle.lines_received.with_label_values(&["chat"]).inc();
        bundle.connections_created.inc();

        assert_eq!(bundle.lines_received.with_label_values(&["chat"]).get(), 1.0);
        assert_eq!(bundle.connections_created.get(), 1.0);
        assert!(MetricsBundle::register(&registry, HashMap::new()).is_err());
    }
}
