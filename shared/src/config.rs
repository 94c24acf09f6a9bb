/// Arena dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/src/generated/")]
pub struct GameSize {
    pub width: f64,
    pub height: f64,
}

impl Default for GameSize {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
        }
    }
}

impl GameSize {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err("width must be finite and > 0".to_string());
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err("height must be finite and > 0".to_string());
        }
        Ok(())
    }
}

/// Options for the physics world, shared with clients so they can mirror it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PhysicsOptions {
    pub gravity: [f64; 2],
    /// 1.0 = perfectly elastic contacts
    pub restitution: f64,
    pub friction: f64,
}

impl Default for PhysicsOptions {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0],
            restitution: 1.0,
            friction: 0.0,
        }
    }
}

impl PhysicsOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err("gravity must be finite".to_string());
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err("restitution must be within [0, 1]".to_string());
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err("friction must be finite and >= 0".to_string());
        }
        Ok(())
    }
}
