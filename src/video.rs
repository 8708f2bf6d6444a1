use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use bevy::log::info;
use bevy::prelude::Resource;
use png::ColorType;

use crate::colors::ColorConfig;
use crate::components::Cell;
use crate::error::{Result, SimError};
use crate::simulation::Simulation;

/// Upper bound for one RGBA frame buffer.
pub const MAX_FRAME_BYTES: usize = u32::MAX as usize;

/// Pixel dimensions and RGBA byte length of a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Size of a frame for a `grid_width` x `grid_height` grid at `scale` pixels per cell.
pub fn frame_size(grid_width: usize, grid_height: usize, scale: u32) -> Result<FrameSize> {
    let too_large = || {
        SimError::InvalidConfiguration(format!(
            "a {grid_width}x{grid_height} grid at frame_scale {scale} exceeds the {MAX_FRAME_BYTES} byte frame limit"
        ))
    };

    let width = grid_width.checked_mul(scale as usize).ok_or_else(too_large)?;
    let height = grid_height.checked_mul(scale as usize).ok_or_else(too_large)?;
    let bytes = width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(4))
        .filter(|&bytes| bytes <= MAX_FRAME_BYTES)
        .ok_or_else(too_large)?;

    Ok(FrameSize {
        width: u32::try_from(width).map_err(|_| too_large())?,
        height: u32::try_from(height).map_err(|_| too_large())?,
        bytes,
    })
}

/// Captures one RGBA frame per step and saves them as a PNG sequence.
#[derive(Resource)]
pub struct FrameRecorder {
    pub frames: Vec<Vec<u8>>, // Store RGBA frames
    pub size: FrameSize,
    pub scale: u32,
    pub colors: ColorConfig,
}

impl FrameRecorder {
    pub fn new(grid_width: usize, grid_height: usize, scale: u32) -> Result<Self> {
        Ok(Self {
            frames: Vec::new(),
            size: frame_size(grid_width, grid_height, scale)?,
            scale,
            colors: ColorConfig::default(),
        })
    }

    pub fn for_simulation(sim: &Simulation) -> Result<Self> {
        let config = sim.config();
        Self::new(config.width, config.height, config.frame_scale)
    }

    pub fn capture(&mut self, sim: &Simulation) -> Result<()> {
        let frame = render_frame(sim, &self.colors, self.scale)?;
        self.frames.push(frame);
        Ok(())
    }

    /// Writes `frame_NNNN.png` files into `dir` and returns how many were saved.
    pub fn save_png_sequence(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        for (i, frame) in self.frames.iter().enumerate() {
            let path = dir.join(format!("frame_{:04}.png", i));
            save_frame_as_png(&path, frame, self.size.width, self.size.height)?;
        }

        info!("Saved {} frames to {}", self.frames.len(), dir.display());
        Ok(self.frames.len())
    }
}

/// Renders the field as a heat map with features and active agents on top.
pub fn render_frame(sim: &Simulation, colors: &ColorConfig, scale: u32) -> Result<Vec<u8>> {
    let env = sim.environment();
    let field = sim.field();
    let size = frame_size(env.width(), env.height(), scale)?;
    let width = size.width as usize;
    let scale = scale as usize;
    let mut frame = vec![0u8; size.bytes];

    let peak = field.max();
    for y in 0..env.height() as i32 {
        for x in 0..env.width() as i32 {
            let cell = Cell::new(x, y);
            let color = if peak > 0.0 {
                colors.heat(field.get(cell) / peak)
            } else {
                colors.background
            };
            fill_cell(&mut frame, width, scale, cell, color);
        }
    }

    for &exit in env.exits() {
        fill_cell(&mut frame, width, scale, exit, colors.exit);
    }
    for &hospital in env.hospitals() {
        fill_cell(&mut frame, width, scale, hospital, colors.hospital);
    }
    for &hazard in env.hazards() {
        fill_cell(&mut frame, width, scale, hazard, colors.hazard);
    }

    for agent in sim.agents().iter().filter(|agent| !agent.is_evacuated()) {
        fill_cell(&mut frame, width, scale, agent.cell(), colors.agent);
    }

    Ok(frame)
}

// Cells come from an environment whose frame size was already checked.
fn fill_cell(frame: &mut [u8], frame_width: usize, scale: usize, cell: Cell, color: [u8; 3]) {
    let left = cell.x as usize * scale;
    let top = cell.y as usize * scale;
    for py in top..top + scale {
        for px in left..left + scale {
            let idx = (py * frame_width + px) * 4;
            if idx + 3 < frame.len() {
                frame[idx] = color[0];
                frame[idx + 1] = color[1];
                frame[idx + 2] = color[2];
                frame[idx + 3] = 255; // Full opacity
            }
        }
    }
}

pub fn save_frame_as_png(path: &Path, frame_data: &[u8], width: u32, height: u32) -> Result<PathBuf> {
    let expected_size = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4));
    if expected_size != Some(frame_data.len()) {
        return Err(SimError::InvalidConfiguration(format!(
            "frame data size mismatch: expected {}x{} RGBA, got {} bytes",
            width,
            height,
            frame_data.len()
        )));
    }

    let file = File::create(path)?;
    let w = BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame_data)?;
    Ok(path.to_path_buf())
}
