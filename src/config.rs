use crate::graph::SizeClass;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub rank_spacing: f32,
    pub node_spacing: f32,
    /// Cross-axis gap kept next to the routing points of long edges.
    pub edge_spacing: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    pub order_passes: usize,
    pub align_passes: usize,
    pub wide: NodeSize,
    pub dot: NodeSize,
    pub loop_return_offset: f32,
}

impl LayoutConfig {
    pub fn size_of(&self, class: SizeClass) -> NodeSize {
        match class {
            SizeClass::Wide => self.wide,
            SizeClass::Dot => self.dot,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_spacing: 60.0,
            node_spacing: 500.0,
            edge_spacing: 20.0,
            margin_x: 30.0,
            margin_y: 20.0,
            order_passes: 4,
            align_passes: 2,
            wide: NodeSize {
                width: 384.0,
                height: 40.0,
            },
            dot: NodeSize {
                width: 28.0,
                height: 30.0,
            },
            loop_return_offset: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub padding: f32,
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            min_width: 200.0,
            min_height: 200.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

/// Loads a JSON5 config file; omitted keys keep their defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = json5::from_str(contents)?;
    if config.layout.rank_spacing < 0.0 || config.layout.node_spacing < 0.0 {
        return Err(anyhow::anyhow!("layout spacing must not be negative"));
    }
    Ok(config)
}
