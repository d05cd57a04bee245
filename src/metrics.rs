// Performance metrics for the pricing and aggregation engine
//
// Tracks operation counts, execution times and slow operations.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

/// Performance threshold for slow operations (100ms)
const SLOW_OPERATION_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    orders_priced: AtomicU64,
    orders_created: AtomicU64,
    orders_accepted: AtomicU64,
    offers_consumed: AtomicU64,
    trend_computations: AtomicU64,

    // Timing metrics (in microseconds)
    total_order_time_us: AtomicU64,
    total_trend_time_us: AtomicU64,

    slow_orders: AtomicU64,
    slow_trends: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSnapshot {
    pub orders_priced: u64,
    pub orders_created: u64,
    pub orders_accepted: u64,
    pub offers_consumed: u64,
    pub trend_computations: u64,
    pub avg_order_time_ms: f64,
    pub avg_trend_time_ms: f64,
    pub slow_orders: u64,
    pub slow_trends: u64,
}

#[derive(Debug, Clone, Copy)]
enum OperationType {
    CreateOrder,
    Trend,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_order_priced(&self) {
        self.inner.orders_priced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offer_consumed(&self) {
        self.inner.offers_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_order_accepted(&self) {
        self.inner.orders_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Start timing an order creation; counted as created when the timer drops
    pub fn start_order_creation(&self) -> OperationTimer {
        OperationTimer::new(OperationType::CreateOrder, self.clone())
    }

    /// Start timing a monthly trend computation
    pub fn start_trend_computation(&self) -> OperationTimer {
        OperationTimer::new(OperationType::Trend, self.clone())
    }

    fn record(&self, operation: OperationType, duration: Duration) {
        let (count, total_us, slow, name) = match operation {
            OperationType::CreateOrder => (
                &self.inner.orders_created,
                &self.inner.total_order_time_us,
                &self.inner.slow_orders,
                "order creation",
            ),
            OperationType::Trend => (
                &self.inner.trend_computations,
                &self.inner.total_trend_time_us,
                &self.inner.slow_trends,
                "trend computation",
            ),
        };

        count.fetch_add(1, Ordering::Relaxed);
        total_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration.as_millis() as u64 > SLOW_OPERATION_THRESHOLD_MS {
            slow.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow {}: {}ms", name, duration.as_millis());
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let avg_ms = |total_us: u64, count: u64| {
            if count == 0 {
                0.0
            } else {
                (total_us as f64 / count as f64) / 1000.0
            }
        };

        let orders_created = load(&self.inner.orders_created);
        let trend_computations = load(&self.inner.trend_computations);

        MetricsSnapshot {
            orders_priced: load(&self.inner.orders_priced),
            orders_created,
            orders_accepted: load(&self.inner.orders_accepted),
            offers_consumed: load(&self.inner.offers_consumed),
            trend_computations,
            avg_order_time_ms: avg_ms(load(&self.inner.total_order_time_us), orders_created),
            avg_trend_time_ms: avg_ms(load(&self.inner.total_trend_time_us), trend_computations),
            slow_orders: load(&self.inner.slow_orders),
            slow_trends: load(&self.inner.slow_trends),
        }
    }
}

/// RAII timer; records the elapsed time when dropped unless cancelled
pub struct OperationTimer {
    operation: OperationType,
    metrics: EngineMetrics,
    start: Instant,
    cancelled: bool,
}

impl OperationTimer {
    fn new(operation: OperationType, metrics: EngineMetrics) -> Self {
        Self {
            operation,
            metrics,
            start: Instant::now(),
            cancelled: false,
        }
    }

    /// Discard the measurement (the operation failed)
    pub fn cancel(mut self) {
        self.cancelled = true;
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.cancelled {
            self.metrics.record(self.operation, self.start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = EngineMetrics::new().snapshot();
        assert_eq!(snapshot.orders_created, 0);
        assert_eq!(snapshot.avg_order_time_ms, 0.0);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = EngineMetrics::new();
        {
            let _timer = metrics.start_order_creation();
        }
        let _ = metrics.start_trend_computation();
        assert_eq!(metrics.snapshot().orders_created, 1);
        assert_eq!(metrics.snapshot().trend_computations, 1);
    }

    #[test]
    fn test_cancelled_timer_is_not_counted() {
        let metrics = EngineMetrics::new();
        metrics.start_order_creation().cancel();
        assert_eq!(metrics.snapshot().orders_created, 0);
    }

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_order_priced();
        metrics.record_order_priced();
        metrics.record_offer_consumed();
        metrics.record_order_accepted();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.orders_priced, 2);
        assert_eq!(snapshot.offers_consumed, 1);
        assert_eq!(snapshot.orders_accepted, 1);
    }
}
