//! Engine selection: 24 engines in 3 banks of 8.
//!
//! A short press in Play steps through the current bank, wrapping back to
//! its first engine. A long press moves to the next bank and keeps the
//! position within the bank.

/// Number of banks.
pub const BANK_COUNT: usize = 3;

/// Engines per bank.
pub const ENGINES_PER_BANK: usize = 8;

/// Total engine count.
pub const ENGINE_COUNT: usize = BANK_COUNT * ENGINES_PER_BANK;

/// Short names shown in status lines, by global engine index.
pub const ENGINE_NAMES: [&str; ENGINE_COUNT] = [
    "VA", "WSHE", "FM", "GRAIN", "ADTV", "WT", "CHRD", "VOWL", // bank 0
    "SWM", "NOIS", "PART", "STR", "MODL", "BD", "SD", "HH", // bank 1
    "VA2", "WS2", "FM2", "GRN2", "ADD2", "WT2", "CHD2", "VOW2", // bank 2
];

/// Current engine, tracked as a global index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineSelector {
    engine: u8,
}

impl EngineSelector {
    /// Starts on engine 0.
    pub const fn new() -> Self {
        Self { engine: 0 }
    }

    /// Starts on `engine`, wrapped into range.
    pub const fn with_engine(engine: u8) -> Self {
        Self {
            engine: engine % ENGINE_COUNT as u8,
        }
    }

    /// Global engine index, `0..ENGINE_COUNT`.
    pub const fn engine(&self) -> u8 {
        self.engine
    }

    /// Current bank, `0..BANK_COUNT`.
    pub const fn bank(&self) -> usize {
        self.engine as usize / ENGINES_PER_BANK
    }

    /// Position within the bank, `0..ENGINES_PER_BANK`.
    pub const fn engine_in_bank(&self) -> usize {
        self.engine as usize % ENGINES_PER_BANK
    }

    /// Status-line name of the current engine.
    pub fn name(&self) -> &'static str {
        ENGINE_NAMES[self.engine as usize]
    }

    /// Steps to the next engine within the bank. Returns true on wrap.
    pub fn next_engine(&mut self) -> bool {
        let next = (self.engine_in_bank() + 1) % ENGINES_PER_BANK;
        self.set(self.bank(), next);
        next == 0
    }

    /// Moves to the next bank, keeping the position within the bank.
    pub fn next_bank(&mut self) {
        let bank = (self.bank() + 1) % BANK_COUNT;
        self.set(bank, self.engine_in_bank());
    }

    fn set(&mut self, bank: usize, in_bank: usize) {
        self.engine = (bank * ENGINES_PER_BANK + in_bank) as u8;

        #[cfg(feature = "tracing")]
        tracing::info!(engine = self.engine, name = self.name(), "engine: selected");
    }
}
