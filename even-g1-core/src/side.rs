//! Side addressing for the paired glasses.

use std::fmt;

/// One physical arm of the glasses.
///
/// Each arm carries its own radio and byte pipe; battery levels and some
/// configuration are per-arm, so most engine bookkeeping is keyed by `Side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both arms, in dispatch order.
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Where a command is dispatched.
///
/// `Both` means "send to both arms"; it is expanded into one registry entry
/// per matching side at admission time, never stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Left,
    Right,
    Both,
}

impl Target {
    /// Whether a command with this target is dispatched to `side`.
    pub fn matches(self, side: Side) -> bool {
        match self {
            Target::Left => side == Side::Left,
            Target::Right => side == Side::Right,
            Target::Both => true,
        }
    }

    /// The concrete sides this target expands to, in dispatch order.
    pub fn sides(self) -> &'static [Side] {
        match self {
            Target::Left => &[Side::Left],
            Target::Right => &[Side::Right],
            Target::Both => &[Side::Left, Side::Right],
        }
    }
}

impl From<Side> for Target {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => Target::Left,
            Side::Right => Target::Right,
        }
    }
}
