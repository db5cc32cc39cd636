//! Notification LED phase table and advance logic (spec.md §4.7). Values
//! below are the exact four-phase patterns this board has always shipped
//! with, preserved to the letter.

/// Onboard addressable LED is RGB; the driver itself is out of scope
/// (only the pattern data and advance logic are in scope).
pub trait LedDriver: Send {
    fn set(&mut self, duty_shift: u8, colour: [u8; 3]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub duty_shift: u8,
    pub time_ms: u32,
    pub colour: [u8; 3],
}

impl Phase {
    const fn new(duty_shift: u8, time_ms: u32, colour: [u8; 3]) -> Self {
        Self { duty_shift, time_ms, colour }
    }

    /// The PWM duty corresponding to this phase's shift: `(1 << shift) - 1`.
    pub fn duty(&self) -> u16 {
        (1u16 << self.duty_shift) - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    None,
    SysBooting,
    SysBootingFinished,
    NetAssociating,
    NetAssociatingFinished,
    NetIpv4Acquired,
    NetIpv6LinkLocalActive,
    NetIpv6StaticActive,
    NetIpv6SlaacAcquired,
    NetApModeInit,
    NetApModeIdle,
    NetApModeAssociated,
}

const OFF: Phase = Phase::new(0, 0, [0, 0, 0]);

fn phases(kind: Notification) -> [Phase; 4] {
    match kind {
        Notification::None => [OFF, OFF, OFF, OFF],
        Notification::SysBooting => [
            Phase::new(14, 50, [0xff, 0x00, 0x00]),
            Phase::new(0, 50, [0x00, 0x00, 0x00]),
            Phase::new(14, 50, [0xff, 0x00, 0x00]),
            Phase::new(0, 50, [0x00, 0x00, 0x00]),
        ],
        Notification::SysBootingFinished => [
            Phase::new(14, 300, [0xff, 0x00, 0x00]),
            Phase::new(0, 300, [0x00, 0x00, 0x00]),
            Phase::new(14, 300, [0xff, 0x00, 0x00]),
            Phase::new(0, 300, [0x00, 0x00, 0x00]),
        ],
        Notification::NetAssociating => [
            Phase::new(9, 50, [0x00, 0x00, 0xff]),
            Phase::new(0, 50, [0x00, 0x00, 0x00]),
            Phase::new(9, 50, [0x00, 0x00, 0xff]),
            Phase::new(0, 50, [0x00, 0x00, 0x00]),
        ],
        Notification::NetAssociatingFinished => [
            Phase::new(9, 300, [0x00, 0x00, 0xff]),
            Phase::new(0, 300, [0x00, 0x00, 0x00]),
            Phase::new(9, 300, [0x00, 0x00, 0xff]),
            Phase::new(0, 300, [0x00, 0x00, 0x00]),
        ],
        Notification::NetIpv4Acquired => [
            Phase::new(9, 1000, [0x01, 0x01, 0x00]),
            Phase::new(0, 1000, [0x00, 0x00, 0x00]),
            Phase::new(9, 1000, [0x01, 0x01, 0x00]),
            Phase::new(0, 1000, [0x00, 0x00, 0x00]),
        ],
        Notification::NetIpv6LinkLocalActive => [
            Phase::new(5, 50, [0x00, 0x01, 0x00]),
            Phase::new(0, 50, [0x00, 0x00, 0x00]),
            Phase::new(5, 50, [0x00, 0x01, 0x00]),
            Phase::new(0, 50, [0x00, 0x00, 0x00]),
        ],
        Notification::NetIpv6StaticActive => [
            Phase::new(5, 300, [0x00, 0x01, 0x00]),
            Phase::new(0, 300, [0x00, 0x00, 0x00]),
            Phase::new(5, 300, [0x00, 0x01, 0x00]),
            Phase::new(0, 300, [0x00, 0x00, 0x00]),
        ],
        Notification::NetIpv6SlaacAcquired => [
            Phase::new(5, 1000, [0x00, 0x01, 0x00]),
            Phase::new(0, 1000, [0x00, 0x00, 0x00]),
            Phase::new(5, 1000, [0x00, 0x01, 0x00]),
            Phase::new(0, 1000, [0x00, 0x00, 0x00]),
        ],
        Notification::NetApModeInit => [
            Phase::new(14, 100, [0xff, 0x00, 0xff]),
            Phase::new(12, 100, [0x00, 0x00, 0x00]),
            Phase::new(14, 100, [0xff, 0xff, 0xff]),
            Phase::new(12, 100, [0x00, 0x00, 0xff]),
        ],
        Notification::NetApModeIdle => [
            Phase::new(14, 500, [0xff, 0x00, 0xff]),
            Phase::new(12, 500, [0x00, 0x00, 0x00]),
            Phase::new(14, 500, [0xff, 0xff, 0xff]),
            Phase::new(12, 500, [0x00, 0x00, 0x00]),
        ],
        Notification::NetApModeAssociated => [
            Phase::new(14, 1200, [0xff, 0x00, 0xff]),
            Phase::new(12, 1200, [0x00, 0x00, 0x00]),
            Phase::new(14, 1200, [0xff, 0xff, 0xff]),
            Phase::new(12, 1200, [0x00, 0x00, 0x00]),
        ],
    }
}

/// Drives one active pattern, looping forever until `notify()` swaps it.
pub struct Notifier {
    current: Notification,
    phase_index: usize,
}

impl Notifier {
    pub fn new() -> Self {
        Self { current: Notification::None, phase_index: 0 }
    }

    pub fn notify(&mut self, kind: Notification) {
        self.current = kind;
        self.phase_index = 0;
    }

    pub fn current(&self) -> Notification {
        self.current
    }

    /// Advances one phase, applies it to `led`, and returns how long to
    /// sleep before the next advance (0 becomes 100ms, matching
    /// spec.md §4.7: "sleeping for the phase's time_ms (or 100 ms if zero)").
    pub fn advance(&mut self, led: &mut dyn LedDriver) -> u32 {
        let table = phases(self.current);
        let phase = table[self.phase_index % table.len()];
        led.set(phase.duty_shift, phase.colour);
        self.phase_index = (self.phase_index + 1) % table.len();
        if phase.time_ms == 0 { 100 } else { phase.time_ms }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
