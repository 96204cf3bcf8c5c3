// Native memory accounting for resident frames

use log::warn;

/// Snapshot of the accountant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub usage: u64,
    pub peak: u64,
}

/// Running total and peak of native bytes held by resident frames
///
/// Every frame that becomes resident is charged once; the same amount is
/// released when it stops being resident.
#[derive(Debug, Default)]
pub struct MemoryAccountant {
    usage: u64,
    peak: u64,
}

impl MemoryAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charge(&mut self, bytes: u64) {
        self.usage += bytes;
        if self.usage > self.peak {
            self.peak = self.usage;
        }
    }

    pub fn release(&mut self, bytes: u64) {
        if bytes > self.usage {
            warn!(
                "Releasing {} bytes with only {} bytes accounted",
                bytes, self.usage
            );
        }
        self.usage = self.usage.saturating_sub(bytes);
    }

    pub fn usage(&self) -> u64 {
        self.usage
    }

    pub fn peak(&self) -> u64 {
        self.peak
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            usage: self.usage,
            peak: self.peak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_and_release() {
        let mut memory = MemoryAccountant::new();
        memory.charge(64);
        memory.charge(256);
        assert_eq!(memory.usage(), 320);

        memory.release(64);
        assert_eq!(memory.usage(), 256);
        assert_eq!(memory.peak(), 320);
    }

    #[test]
    fn test_peak_only_grows() {
        let mut memory = MemoryAccountant::new();
        memory.charge(100);
        memory.release(100);
        memory.charge(50);
        assert_eq!(
            memory.stats(),
            MemoryStats {
                usage: 50,
                peak: 100
            }
        );
    }

    #[test]
    fn test_over_release_saturates() {
        let mut memory = MemoryAccountant::new();
        memory.charge(10);
        memory.release(20);
        assert_eq!(memory.usage(), 0);
    }
}
