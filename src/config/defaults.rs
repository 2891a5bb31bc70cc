pub(super) const MIN_POLL_INTERVAL_MS: u64 = 1;
pub(super) const MAX_POLL_INTERVAL_MS: u64 = 100;
pub(super) const MAX_MIN_WORKING_TIME_MS: u64 = 10_000;
pub(super) const MIN_VECTOR_LENGTH: usize = 2;

pub(super) fn clamp_poll_interval_ms(value: u64) -> u64 {
    value.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
}

pub(super) fn clamp_min_working_time_ms(value: u64) -> u64 {
    value.min(MAX_MIN_WORKING_TIME_MS)
}

pub(super) fn clamp_positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

pub(super) fn clamp_non_negative(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

pub(super) fn default_false() -> bool {
    false
}

pub(super) fn default_min_working_time_ms() -> u64 {
    300
}

pub(super) fn default_poll_interval_ms() -> u64 {
    10
}

pub(super) fn default_learning_rate() -> f64 {
    1.0
}

pub(super) fn default_alpha() -> f64 {
    1.0
}

pub(super) fn default_lambda() -> f64 {
    1e-5
}

pub(super) fn default_step_offset() -> u32 {
    10
}

pub(super) fn default_decay_exponent() -> f64 {
    0.5
}

pub(super) fn default_vector_length() -> usize {
    1000
}

pub(super) fn default_epochs() -> usize {
    1
}

pub(super) fn default_seed() -> u64 {
    42
}
