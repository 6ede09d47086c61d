//! Tuning constants.
//!
//! These are design parameters, not values a client and server must agree on
//! byte-exact with any particular upstream implementation — they only need
//! to be identical across all participants of one session, which is
//! guaranteed here by being compiled-in constants rather than configuration.

/// Simulation tick rate (fixed, not configurable).
pub const TICKS_PER_SECOND: u32 = 30;

/// Pit width.
pub const PIT_COLS: i32 = 6;

/// Visible pit height, not counting the preview row.
pub const PIT_ROWS: i32 = 10;

/// One row of scroll distance, in the same integer unit as `Pit::scroll`.
pub const ROW_HEIGHT: i32 = 10;

/// Ticks needed for a swap to complete.
pub const SWAP_TIME: i32 = 6;

/// Ticks a physical spends in `Land` before settling to `Rest`.
pub const LAND_TIME: i32 = 20;

/// Ticks a matched block spends in `Break` before dying.
pub const BREAK_TIME: i32 = 30;

/// Ticks a touched garbage block spends in `Break` before shrinking.
pub const DISSOLVE_TIME: i32 = 30;

/// Scroll distance per tick while the pit auto-scrolls.
pub const SCROLL_SPEED: i32 = 1;

/// Scroll distance per tick while the pit is manually raised. Chosen so a
/// held raise clears one row in about as many ticks as a swap takes to
/// resolve.
pub const RAISE_SPEED: i32 = ROW_HEIGHT / SWAP_TIME + 1;

/// Distance per tick a falling physical covers.
pub const FALL_SPEED: i32 = 3;

/// Ticks between the pit being full and the game ending for that player,
/// counted down while the pit is full and not otherwise busy.
pub const PANIC_TIME: i32 = 90;

/// Ticks added back to panic/recovery counters whenever combat activity
/// (a match, a chain, or an active raise) interrupts them.
pub const RECOVERY_TIME: i32 = 60;

/// How many ticks of simulation a `synchronize` pass may advance before a
/// fresh checkpoint is recorded.
pub const CHECKPOINT_INTERVAL: u64 = 60;

/// Sentinel game_time used by a client that does not yet know the
/// server-authoritative tick its input will land on.
pub const TIME_ASAP: u64 = u64::MAX;
