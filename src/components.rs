//! Plain grid and agent data types. Agents live in an ordered `Vec` inside
//! `Simulation`, not as ECS components, so their processing order is fixed.

use serde::{Deserialize, Serialize};

/// Integer grid coordinate, 0-indexed from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, heading: Heading) -> Self {
        let (dx, dy) = heading.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Movement direction. Declaration order is the scan order of the movement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

/// An evacuee. Reaching an exit is terminal and keeps the last occupied cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Agent {
    Active { cell: Cell, heading: Heading },
    Evacuated { last_cell: Cell },
}

impl Agent {
    pub fn new(cell: Cell, heading: Heading) -> Self {
        Agent::Active { cell, heading }
    }

    pub fn cell(&self) -> Cell {
        match *self {
            Agent::Active { cell, .. } => cell,
            Agent::Evacuated { last_cell } => last_cell,
        }
    }

    pub fn heading(&self) -> Option<Heading> {
        match *self {
            Agent::Active { heading, .. } => Some(heading),
            Agent::Evacuated { .. } => None,
        }
    }

    pub fn is_evacuated(&self) -> bool {
        matches!(self, Agent::Evacuated { .. })
    }
}
