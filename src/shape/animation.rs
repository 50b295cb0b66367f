//! Keyframe animation tables.

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub frame_count: u32,
    pub frame_rate: u32,
    /// One node per hierarchy entry, in hierarchy order.
    pub nodes: Vec<AnimNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimNode {
    /// Matches the label of the node's matrix.
    pub label: String,
    pub controllers: Vec<Controller>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    /// Rotation keys (`tcb_rot`).
    Rotation(Vec<SlerpRot>),
    /// Position keys (`linear_pos`).
    Position(Vec<LinearKey>),
}

impl Controller {
    pub fn len(&self) -> usize {
        match self {
            Controller::Rotation(keys) => keys.len(),
            Controller::Position(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Quaternion key in shape axis order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlerpRot {
    pub frame: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearKey {
    pub frame: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}
