use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabel {
    kind: String,
}

/// Per-collection-kind counters and gauges, registered once and shared by
/// every `Collection` the index builds (spec §6 "Metrics").
pub struct IndexMetrics {
    size: Family<KindLabel, Gauge>,
    applies: Family<KindLabel, Counter>,
    deletes: Family<KindLabel, Counter>,
    resets: Family<KindLabel, Counter>,
}

impl IndexMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let size = Family::default();
        prom.register(
            "index_size",
            "Number of resources currently held in a collection",
            size.clone(),
        );

        let applies = Family::default();
        prom.register(
            "index_applies",
            "Count of apply events processed by a collection",
            applies.clone(),
        );

        let deletes = Family::default();
        prom.register(
            "index_deletes",
            "Count of delete events processed by a collection",
            deletes.clone(),
        );

        let resets = Family::default();
        prom.register(
            "index_resets",
            "Count of full relist/resync events observed by a collection",
            resets.clone(),
        );

        Self {
            size,
            applies,
            deletes,
            resets,
        }
    }

    pub fn record_apply(&self, kind: &str) {
        self.applies
            .get_or_create(&KindLabel { kind: kind.to_string() })
            .inc();
    }

    pub fn record_delete(&self, kind: &str) {
        self.deletes
            .get_or_create(&KindLabel { kind: kind.to_string() })
            .inc();
    }

    pub fn record_reset(&self, kind: &str) {
        self.resets
            .get_or_create(&KindLabel { kind: kind.to_string() })
            .inc();
    }

    pub fn set_size(&self, kind: &str, size: usize) {
        self.size
            .get_or_create(&KindLabel { kind: kind.to_string() })
            .set(size as i64);
    }
}
