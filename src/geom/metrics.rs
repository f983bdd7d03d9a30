//! Opt-in timing of deformation work.
//!
//! Only active with the `deform_metrics` feature on non-WASM targets; every
//! call compiles down to running the closure otherwise.
//!
//! ```ignore
//! let mut metrics = DeformMetrics::default();
//! let selection = metrics.time(TimingBucket::Selection, || mesh.select(&generator))?;
//! if let Some(report) = metrics.report() {
//!     println!("selection: {} ns over {} calls", report.selection.total_ns, report.selection.calls);
//! }
//! ```

/// Phase a timed call is accounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Selection generators and selection algebra.
    Selection,
    /// Weighted position/normal/UV operators.
    Deformation,
    /// Ray-cast ground projection.
    Conform,
    /// Fit-to-spline reprojection.
    Spline,
    /// Buffer import and validation.
    Import,
    /// Buffer export.
    Export,
}

impl TimingBucket {
    pub const ALL: [Self; 6] = [
        Self::Selection,
        Self::Deformation,
        Self::Conform,
        Self::Spline,
        Self::Import,
        Self::Export,
    ];
}

/// Accumulated time and call count for one bucket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BucketTiming {
    pub total_ns: u64,
    pub calls: u64,
}

impl BucketTiming {
    #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
    fn record(&mut self, nanos: u64) {
        self.total_ns = self.total_ns.saturating_add(nanos);
        self.calls = self.calls.saturating_add(1);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeformTimingReport {
    pub selection: BucketTiming,
    pub deformation: BucketTiming,
    pub conform: BucketTiming,
    pub spline: BucketTiming,
    pub import: BucketTiming,
    pub export: BucketTiming,
}

impl DeformTimingReport {
    #[must_use]
    pub const fn bucket(&self, bucket: TimingBucket) -> BucketTiming {
        match bucket {
            TimingBucket::Selection => self.selection,
            TimingBucket::Deformation => self.deformation,
            TimingBucket::Conform => self.conform,
            TimingBucket::Spline => self.spline,
            TimingBucket::Import => self.import,
            TimingBucket::Export => self.export,
        }
    }

    #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
    fn bucket_mut(&mut self, bucket: TimingBucket) -> &mut BucketTiming {
        match bucket {
            TimingBucket::Selection => &mut self.selection,
            TimingBucket::Deformation => &mut self.deformation,
            TimingBucket::Conform => &mut self.conform,
            TimingBucket::Spline => &mut self.spline,
            TimingBucket::Import => &mut self.import,
            TimingBucket::Export => &mut self.export,
        }
    }

    #[must_use]
    pub fn total_ns(&self) -> u64 {
        TimingBucket::ALL
            .iter()
            .fold(0u64, |acc, &b| acc.saturating_add(self.bucket(b).total_ns))
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

/// Timing accumulator owned by a deformation component.
#[derive(Debug, Default, Clone)]
pub struct DeformMetrics {
    #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
    report: DeformTimingReport,
}

impl DeformMetrics {
    /// Clears every bucket.
    pub fn reset(&mut self) {
        #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
        {
            self.report = DeformTimingReport::default();
        }
    }

    /// Snapshot of the accumulated timings; `None` when metrics are compiled out.
    #[must_use]
    pub fn report(&self) -> Option<DeformTimingReport> {
        #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "deform_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Runs `f`, charging its wall time to `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.report.bucket_mut(bucket).record(nanos);
            result
        }

        #[cfg(not(all(feature = "deform_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_total() {
        let report = DeformTimingReport {
            conform: BucketTiming {
                total_ns: 1500,
                calls: 2,
            },
            export: BucketTiming {
                total_ns: 500,
                calls: 1,
            },
            ..DeformTimingReport::default()
        };
        assert_eq!(report.total_ns(), 2000);
        assert_eq!(report.bucket(TimingBucket::Conform).calls, 2);
        assert!((report.total_ms() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_time_returns_closure_result() {
        let mut metrics = DeformMetrics::default();
        assert_eq!(metrics.time(TimingBucket::Spline, || 7), 7);
        metrics.reset();
    }

    #[cfg(all(feature = "deform_metrics", not(target_arch = "wasm32")))]
    #[test]
    fn test_calls_are_counted() {
        let mut metrics = DeformMetrics::default();
        metrics.time(TimingBucket::Import, || ());
        metrics.time(TimingBucket::Import, || ());
        let report = metrics.report().unwrap();
        assert_eq!(report.import.calls, 2);
    }

    #[cfg(not(all(feature = "deform_metrics", not(target_arch = "wasm32"))))]
    #[test]
    fn test_disabled_metrics_report_nothing() {
        let mut metrics = DeformMetrics::default();
        metrics.time(TimingBucket::Selection, || ());
        assert!(metrics.report().is_none());
    }
}
