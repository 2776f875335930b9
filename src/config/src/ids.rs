use std::sync::atomic::{AtomicI64, Ordering};

/// Minimal Twitter-Snowflake-style id generator: 41 bits millis since a
/// custom epoch, 10 bits machine id, 12 bits sequence. Good enough for a
/// single-process deployment; the sequence counter guarantees monotonicity
/// even when the clock does not advance between two calls.
pub struct SnowflakeIdGenerator {
    machine_id: i64,
    state: AtomicI64,
}

const EPOCH_MICROS: i64 = 1_700_000_000_000_000; // 2023-11-14T22:13:20Z
const SEQUENCE_BITS: u32 = 12;
const MACHINE_BITS: u32 = 10;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

impl SnowflakeIdGenerator {
    pub fn new(machine_id: i64) -> Self {
        Self {
            machine_id: machine_id & ((1 << MACHINE_BITS) - 1),
            state: AtomicI64::new(0),
        }
    }

    pub fn next_id(&self) -> i64 {
        let now = crate::now_micros() - EPOCH_MICROS;
        loop {
            let prev = self.state.load(Ordering::Relaxed);
            let prev_ts = prev >> SEQUENCE_BITS;
            let (ts, seq) = if now > prev_ts {
                (now, 0)
            } else {
                (prev_ts, (prev & SEQUENCE_MASK) + 1)
            };
            let next = (ts << SEQUENCE_BITS) | (seq & SEQUENCE_MASK);
            if self
                .state
                .compare_exchange(prev, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return (ts << (SEQUENCE_BITS + MACHINE_BITS))
                    | (self.machine_id << SEQUENCE_BITS)
                    | (seq & SEQUENCE_MASK);
            }
        }
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let gen = SnowflakeIdGenerator::new(1);
        let mut last = gen.next_id();
        for _ in 0..1000 {
            let id = gen.next_id();
            assert!(id > last);
            last = id;
        }
    }
}
