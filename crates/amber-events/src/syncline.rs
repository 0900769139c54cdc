//! Sync-line wait strategies.

/// Outstanding sync-line wait, gating cycle advancement until the display
/// reaches a target position or a host-time deadline passes.
///
/// At most one wait is outstanding at a time. The advance loop evaluates the
/// wait before consuming cycles; an unsatisfied wait aborts the advance and
/// throttles the admission budget so the caller keeps draining cycles in
/// small increments until the condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncLine {
    /// No wait outstanding.
    Idle,
    /// Wait for vblank completion. Without a vsync thread the waiter polls
    /// the scanline instead: a beam position below `top_line` means the
    /// frame wrapped, and `top_line` rises to the largest position seen.
    Vblank { top_line: i32 },
    /// Wait for vblank, or for the beam to reach `early_line` late in the
    /// frame, whichever comes first.
    VblankEarly { early_line: i32 },
    /// Wait until the beam has left vblank (scanline > 0).
    NotVblank,
    /// Wait until the beam reaches a specific scanline.
    Line { line: i32 },
    /// Wait until the beam has wrapped into the top of the frame, above
    /// `line`.
    BeamBefore { line: i32 },
    /// Wait until the coarse processor-time clock passes `deadline`.
    CpuTime { deadline: i32 },
    /// Wait until the high-resolution clock passes `deadline_us`.
    HighresTime { deadline_us: i64 },
    /// Wait until both the frame-pacing minimum time and `deadline` have
    /// passed. `full_check` selects the coprocessor stepping mode used
    /// while waiting.
    FramePace { deadline: i32, full_check: bool },
}

impl SyncLine {
    pub const fn is_idle(&self) -> bool {
        matches!(self, SyncLine::Idle)
    }
}
