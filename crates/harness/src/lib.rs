pub mod backend;
pub mod device;

pub use backend::FakeBackend;
pub use device::TestDevice;

use chrono::{DateTime, Utc};
use herdlog_core::{AnimalRecord, Measurements};

/// Midnight UTC `n` days after 2024-01-01.
pub fn day(n: i64) -> DateTime<Utc> {
    DateTime::<Utc>::default() + chrono::Duration::seconds(1_704_067_200) + chrono::Duration::days(n)
}

/// A plausible capture for `animal_id` on `day(n)` with the given score.
pub fn sample_record(animal_id: &str, n: i64, atc_score: i32) -> AnimalRecord {
    AnimalRecord::new(
        animal_id,
        day(n),
        format!("/captures/{animal_id}_{n}.jpg"),
        Measurements {
            body_length: 140.0 + n as f64 * 0.5,
            height: 125.0,
            chest_width: 52.5,
            rump_angle: 11.0,
        },
        atc_score,
    )
}

/// Install a test-friendly `tracing` subscriber filtered by `RUST_LOG`.
/// Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herdlog_storage=debug,herdlog_engine=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
