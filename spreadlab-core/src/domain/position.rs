use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for Long, -1.0 for Short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// An open position: direction, steps since entry, and the entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: Side,
    pub hold: usize,
    /// Z-score at entry. Only recorded when a stop-loss is configured.
    pub entry_z: Option<f64>,
}

/// Simulator position state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl Position {
    pub fn open(side: Side, entry_z: Option<f64>) -> Self {
        Position::Open(OpenPosition {
            side,
            hold: 0,
            entry_z,
        })
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Position::Flat => None,
            Position::Open(p) => Some(p.side),
        }
    }

    /// Steps since entry; 0 when flat.
    pub fn hold(&self) -> usize {
        match self {
            Position::Flat => 0,
            Position::Open(p) => p.hold,
        }
    }

    /// -1, 0 or +1.
    pub fn sign(&self) -> f64 {
        self.side().map_or(0.0, Side::sign)
    }

    /// Short label used in exports: "flat", "long", "short".
    pub fn label(&self) -> &'static str {
        match self.side() {
            None => "flat",
            Some(Side::Long) => "long",
            Some(Side::Short) => "short",
        }
    }
}
