//! Pipeline statistics.

use std::time::Duration;

use consumer::MetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Configured sensors
    pub sensors: usize,

    /// Readings accepted by the transport
    pub published: u64,

    /// Publishes that failed (logged, cadence kept)
    pub publish_failures: u64,

    /// Sensor units still publishing when the grace period ran out
    pub aborted_units: usize,

    pub transport_closed: bool,

    /// Publishes refused because the transport buffer was full
    pub buffer_rejections: u64,

    /// Duplicate deliveries produced by the transport
    pub redelivered: u64,

    /// Buffered messages dropped when the drain deadline passed
    pub abandoned: u64,

    pub consumer: MetricsSnapshot,
}

impl PipelineStats {
    /// Published readings per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sensors: {}", self.sensors);
        println!("   ├─ Readings/s: {:.2}", self.rate());
        println!("   └─ Transport closed: {}", self.transport_closed);

        println!("\nProducers");
        println!("   ├─ Published: {}", self.published);
        println!("   ├─ Publish failures: {}", self.publish_failures);
        println!("   ├─ Buffer rejections: {}", self.buffer_rejections);
        println!("   └─ Aborted units: {}", self.aborted_units);

        println!("\nConsumer");
        println!("   ├─ Received: {}", self.consumer.received);
        println!("   ├─ Inserted: {}", self.consumer.inserted);
        println!("   ├─ Decode failures: {}", self.consumer.decode_failures);
        println!("   ├─ Insert failures: {}", self.consumer.insert_failures);
        println!("   ├─ Abandoned at shutdown: {}", self.abandoned);
        println!(
            "   └─ Redeliveries: {} (transport produced {})",
            self.consumer.redeliveries, self.redelivered
        );

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let stats = PipelineStats {
            duration: Duration::from_secs(2),
            published: 10,
            ..Default::default()
        };
        assert_eq!(stats.rate(), 5.0);
        assert_eq!(PipelineStats::default().rate(), 0.0);
    }
}
