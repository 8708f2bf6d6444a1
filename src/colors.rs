/// Shared color configuration for frame export
#[derive(Debug, Clone)]
pub struct ColorConfig {
    pub background: [u8; 3],

    // Feature colors
    pub exit: [u8; 3],
    pub hospital: [u8; 3],
    pub hazard: [u8; 3],

    pub agent: [u8; 3],
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
            exit: [50, 205, 50],     // Lime
            hospital: [0, 255, 255], // Cyan
            hazard: [255, 0, 0],     // Red
            agent: [30, 90, 255],    // Blue
        }
    }
}

impl ColorConfig {
    /// Black to red to yellow to white ramp for a pheromone level in `[0, 1]`.
    pub fn heat(&self, level: f32) -> [u8; 3] {
        let t = level.clamp(0.0, 1.0) * 3.0;
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
        [channel(t), channel(t - 1.0), channel(t - 2.0)]
    }
}
