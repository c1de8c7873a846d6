use std::time::Instant;

/// RAII timing guard: logs elapsed wall-time at drop. Used to bracket
/// whitening, the optimizer loop and the final projection.
pub struct ProfileScope {
    label: String,
    start: Instant,
}

impl ProfileScope {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::debug!(
            "[PROFILE] {} - {:.3}ms",
            self.label,
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

/// Convenience macro mirroring `ProfileScope::new` for call sites that just
/// want to bracket the rest of the enclosing scope.
#[macro_export]
macro_rules! profile_scope {
    ($label:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::new($label);
    };
}
