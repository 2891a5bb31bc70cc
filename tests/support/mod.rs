#![allow(dead_code)]

pub mod anonstat_env;

use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use anonstat::data::{DataHandle, DataTable};

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(2));
    }
    condition()
}

/// Small anonymized table: generalized age, zip code with suppression, disease.
pub fn patients() -> Arc<dyn DataHandle> {
    Arc::new(
        DataTable::new(
            ["age", "zip", "disease"],
            [
                ["30-40", "8166*", "flu"],
                ["30-40", "8166*", "flu"],
                ["40-50", "8167*", "cold"],
                ["40-50", "*", "cold"],
                ["30-40", "*", "flu"],
                ["40-50", "8167*", "cold"],
                ["30-40", "8166*", "flu"],
                ["40-50", "8167*", "cold"],
            ],
        )
        .expect("valid table"),
    )
}
