#[derive(Debug, Clone, PartialEq)]
enum Puzzle {
    CodeLock {
        code: String,
        state: PuzzleState,
    },
    LaserLock {
        wire_count: u32,
        live_wire: u32,
        state: PuzzleState,
    },
    LockPick {
        window_start: f32,
        window_width: f32,
        state: PuzzleState,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum PuzzleInput {
    Code(String),
    CutWire(u32),
    StopPick(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolveOutcome {
    Solved,
    WrongCode,
    WrongWire,
    MissedPick,
    AlreadySolved,
}

impl Puzzle {
    fn from_def(def: &engine::PuzzleDef) -> Self {
        match def {
            engine::PuzzleDef::CodeLock { code } => Puzzle::CodeLock {
                code: code.clone(),
                state: PuzzleState::Unsolved,
            },
            engine::PuzzleDef::LaserLock {
                wire_count,
                live_wire,
            } => Puzzle::LaserLock {
                wire_count: *wire_count,
                live_wire: *live_wire,
                state: PuzzleState::Unsolved,
            },
            engine::PuzzleDef::LockPick {
                window_start,
                window_width,
            } => Puzzle::LockPick {
                window_start: *window_start,
                window_width: *window_width,
                state: PuzzleState::Unsolved,
            },
        }
    }

    fn state(&self) -> PuzzleState {
        match self {
            Puzzle::CodeLock { state, .. }
            | Puzzle::LaserLock { state, .. }
            | Puzzle::LockPick { state, .. } => *state,
        }
    }

    fn is_solved(&self) -> bool {
        self.state() == PuzzleState::Solved
    }

    fn mark_solved(&mut self) {
        match self {
            Puzzle::CodeLock { state, .. }
            | Puzzle::LaserLock { state, .. }
            | Puzzle::LockPick { state, .. } => *state = PuzzleState::Solved,
        }
    }

    /// The single Unsolved -> Solved transition. Solving an already-solved
    /// puzzle is a no-op and never re-fires the solved notification.
    fn solve(&mut self, input: &PuzzleInput) -> SolveOutcome {
        if self.is_solved() {
            return SolveOutcome::AlreadySolved;
        }

        let solved = match (&*self, input) {
            (Puzzle::CodeLock { code, .. }, PuzzleInput::Code(entered)) => entered == code,
            (Puzzle::LaserLock { live_wire, .. }, PuzzleInput::CutWire(cut)) => cut == live_wire,
            (
                Puzzle::LockPick {
                    window_start,
                    window_width,
                    ..
                },
                PuzzleInput::StopPick(marker),
            ) => *marker >= *window_start && *marker <= *window_start + *window_width,
            // Mismatched input kind cannot solve anything.
            _ => false,
        };

        if solved {
            self.mark_solved();
            return SolveOutcome::Solved;
        }

        match self {
            Puzzle::CodeLock { .. } => SolveOutcome::WrongCode,
            Puzzle::LaserLock { .. } => SolveOutcome::WrongWire,
            Puzzle::LockPick { .. } => SolveOutcome::MissedPick,
        }
    }
}

impl PuzzleSession {
    fn open_for(door_id: EntityId, puzzle: &Puzzle) -> Self {
        let ui = match puzzle {
            Puzzle::CodeLock { .. } => PuzzleUi::Code {
                digits: [0; CODE_DIGIT_COUNT],
                cursor: 0,
            },
            Puzzle::LaserLock { wire_count, .. } => PuzzleUi::Wires {
                selected: 0,
                wire_count: *wire_count,
            },
            Puzzle::LockPick { .. } => PuzzleUi::Pick {
                marker: 0.0,
                rising: true,
            },
        };
        Self { door_id, ui }
    }

    /// Continuous sub-simulation for the lock pick: the marker sweeps 0..1 and
    /// back until stopped.
    fn tick_marker(&mut self, dt_seconds: f32) {
        if let PuzzleUi::Pick { marker, rising } = &mut self.ui {
            let step = dt_seconds / LOCKPICK_SWEEP_SECONDS;
            if *rising {
                *marker += step;
                if *marker >= 1.0 {
                    *marker = 1.0;
                    *rising = false;
                }
            } else {
                *marker -= step;
                if *marker <= 0.0 {
                    *marker = 0.0;
                    *rising = true;
                }
            }
        }
    }

    fn apply_navigation(&mut self, controls: &ControlFrame) {
        match &mut self.ui {
            PuzzleUi::Code { digits, cursor } => {
                if controls.nav_left_pressed && *cursor > 0 {
                    *cursor -= 1;
                }
                if controls.nav_right_pressed && *cursor + 1 < digits.len() {
                    *cursor += 1;
                }
                if controls.nav_up_pressed {
                    digits[*cursor] = (digits[*cursor] + 1) % 10;
                }
                if controls.nav_down_pressed {
                    digits[*cursor] = (digits[*cursor] + 9) % 10;
                }
            }
            PuzzleUi::Wires {
                selected,
                wire_count,
            } => {
                if controls.nav_left_pressed && *selected > 0 {
                    *selected -= 1;
                }
                if controls.nav_right_pressed && *selected + 1 < *wire_count {
                    *selected += 1;
                }
            }
            PuzzleUi::Pick { .. } => {}
        }
    }

    /// The input a confirm press commits with, given the current UI state.
    fn commit_input(&self) -> PuzzleInput {
        match &self.ui {
            PuzzleUi::Code { digits, .. } => {
                let mut entered = String::with_capacity(digits.len());
                for digit in digits {
                    entered.push(char::from(b'0' + digit));
                }
                PuzzleInput::Code(entered)
            }
            PuzzleUi::Wires { selected, .. } => PuzzleInput::CutWire(*selected),
            PuzzleUi::Pick { marker, .. } => PuzzleInput::StopPick(*marker),
        }
    }
}
