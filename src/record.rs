use chrono::{DateTime, Utc};
use rand::Rng;

use crate::cli::KeyValue;

/// Characters the payload is drawn from.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Renders the JSON text of each record. Fields keep a fixed order so listeners can
/// compare records textually: `id`, `data`, `timestamp`, then the custom pairs.
pub struct RecordFormatter<R> {
    size: usize,
    // The custom pairs never change during a run, so they are rendered once.
    extra: String,
    rng: R,
}

impl<R: Rng> RecordFormatter<R> {
    pub fn new(size: usize, pairs: &[KeyValue], rng: R) -> Self {
        Self {
            size,
            extra: extra_fields(pairs),
            rng,
        }
    }

    pub fn format(&mut self, id: u64) -> String {
        self.format_at(id, Utc::now())
    }

    fn format_at(&mut self, id: u64, now: DateTime<Utc>) -> String {
        let data = payload(&mut self.rng, self.size);
        let common = format!(
            "\"id\": \"{}\", \"data\": \"{}\", \"timestamp\": \"{}\"",
            id,
            data,
            timestamp(now)
        );
        if self.extra.is_empty() {
            format!("{{{common}}}")
        } else {
            format!("{{{common}, {}}}", self.extra)
        }
    }
}

/// Random string of `size` characters from [`ALPHABET`], drawn uniformly with replacement.
pub fn payload<R: Rng>(rng: &mut R, size: usize) -> String {
    (0..size)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// UTC time truncated to milliseconds, e.g. `2024-05-01 13:04:05.120 +0000 UTC`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S%.3f +0000 UTC").to_string()
}

// Keys and values are written as given. They are test data chosen by the operator.
fn extra_fields(pairs: &[KeyValue]) -> String {
    pairs
        .iter()
        .map(|kv| format!("\"{}\": \"{}\"", kv.key, kv.value))
        .collect::<Vec<_>>()
        .join(", ")
}
