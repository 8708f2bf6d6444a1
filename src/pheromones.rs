use rayon::prelude::*;

use crate::components::Cell;
use crate::config::SimConfig;
use crate::environment::Environment;
use crate::error::{Result, SimError};

/// Coefficients for one relaxation pass of the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldUpdate {
    pub decay: f32,
    pub diffusion: f32,
    pub density_weight: f32,
    pub clamp_negative: bool,
}

impl FieldUpdate {
    pub const DEFAULT_DENSITY_WEIGHT: f32 = 0.05;
}

impl From<&SimConfig> for FieldUpdate {
    fn from(config: &SimConfig) -> Self {
        Self {
            decay: config.decay,
            diffusion: config.diffusion,
            density_weight: config.density_decay_weight,
            clamp_negative: config.clamp_negative,
        }
    }
}

/// Evacuation pheromone field, one scalar per grid cell, row-major.
#[derive(Debug, Clone)]
pub struct PheromoneGrid {
    width: usize,
    height: usize,
    values: Vec<f32>,

    // Double buffer for updates
    buffer: Vec<f32>,
}

impl PheromoneGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            values: vec![0.0; size],
            buffer: vec![0.0; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height {
            Some(cell.y as usize * self.width + cell.x as usize)
        } else {
            None
        }
    }

    /// Field value at `cell`, zero outside the grid.
    pub fn get(&self, cell: Cell) -> f32 {
        self.index(cell).map(|idx| self.values[idx]).unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn total(&self) -> f32 {
        self.values.iter().sum()
    }

    pub fn fill(&mut self, value: f32) {
        self.values.iter_mut().for_each(|v| *v = value);
    }

    pub fn deposit(&mut self, cell: Cell, amount: f32) -> Result<()> {
        match self.index(cell) {
            Some(idx) => {
                self.values[idx] += amount;
                Ok(())
            }
            None => Err(SimError::InvalidCoordinate {
                x: cell.x,
                y: cell.y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// One diffusion and decay pass with the reference density weight and no clamping.
    pub fn diffuse_and_decay(&mut self, env: &Environment, decay: f32, diffusion: f32) {
        self.relax(
            env,
            &FieldUpdate {
                decay,
                diffusion,
                density_weight: FieldUpdate::DEFAULT_DENSITY_WEIGHT,
                clamp_negative: false,
            },
        );
    }

    /// Replaces the field with its smoothed and decayed successor.
    ///
    /// Interior cells take a 3x3 Laplacian step (the sum includes the centre) and then
    /// decay faster where the crowd is denser. Border cells are copied unchanged. Every
    /// read comes from the pre-update values, so rows are computed in parallel.
    pub fn relax(&mut self, env: &Environment, update: &FieldUpdate) {
        let width = self.width;
        let height = self.height;
        if width == 0 || height == 0 {
            return;
        }
        let current = &self.values;

        self.buffer
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let row_start = y * width;
                if y == 0 || y + 1 >= height {
                    row.copy_from_slice(&current[row_start..row_start + width]);
                    return;
                }

                for x in 0..width {
                    let idx = row_start + x;
                    if x == 0 || x + 1 >= width {
                        row[x] = current[idx];
                        continue;
                    }

                    let mut neighbor_sum = 0.0;
                    for nx in x - 1..=x + 1 {
                        for ny in y - 1..=y + 1 {
                            neighbor_sum += current[ny * width + nx];
                        }
                    }

                    let value = current[idx];
                    let diffused = value + update.diffusion * (neighbor_sum - 9.0 * value);
                    let density_factor =
                        1.0 + env.density(Cell::new(x as i32, y as i32)) * update.density_weight;
                    let next = diffused * (1.0 - update.decay * density_factor);

                    row[x] = if update.clamp_negative { next.max(0.0) } else { next };
                }
            });

        std::mem::swap(&mut self.values, &mut self.buffer);
    }
}
