//! Firework recipes: the named parameter bundles that drive one shell.
//!
//! Recipes come from the built-in preset table or from an external generator
//! that answers with JSON. Generated recipes are validated before use, and a
//! bad one never replaces the recipe already in use.

use std::path::Path;

use fastrand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RecipeError;

pub const MAX_PARTICLE_COUNT: u32 = 2000;
pub const MAX_INITIAL_VELOCITY: f32 = 100.0;
pub const MAX_GRAVITY: f32 = 2.0;

/// Half-open numeric range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample(&self, rng: &mut Rng) -> f32 {
        self.min + rng.f32() * (self.max - self.min)
    }

    fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Detonation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Sphere,    // Classic ball
    Star,      // Spiky, alternating long/short rays
    Ring,      // Flat uniform ring
    Pistil,    // Shell plus a dense inner core
    Willow,    // Long hang time
    Crossette, // Stars that split in flight
    Palm,      // Few thick arms
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::Sphere,
        Shape::Star,
        Shape::Ring,
        Shape::Pistil,
        Shape::Willow,
        Shape::Crossette,
        Shape::Palm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Star => "star",
            Shape::Ring => "ring",
            Shape::Pistil => "pistil",
            Shape::Willow => "willow",
            Shape::Crossette => "crossette",
            Shape::Palm => "palm",
        }
    }
}

/// Immutable parameter bundle for one kind of firework.
///
/// Field names on the wire follow the generator's camelCase schema, with the
/// shape carried as `explosionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub hue: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_hue: Option<f32>,
    /// Percent, 0-100.
    pub saturation: f32,
    /// Percent, 0-100.
    pub lightness: f32,
    #[serde(deserialize_with = "count_from_number")]
    pub particle_count: u32,
    pub initial_velocity: f32,
    pub gravity: f32,
    pub friction: f32,
    pub decay: Range,
    #[serde(rename = "explosionType")]
    pub shape: Shape,
    pub has_trail: bool,
    pub trail_length: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_volume: Option<f32>,
}

// Generators tend to answer `250.0` where an integer is expected.
fn count_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "particle count {value} is out of range"
        )));
    }
    Ok(value.round() as u32)
}

impl Recipe {
    /// Parse a generated recipe.
    ///
    /// Text-generation services often wrap JSON in Markdown fences, so those
    /// are stripped before parsing. The result is validated.
    pub fn from_json(text: &str) -> Result<Self, RecipeError> {
        let recipe: Recipe = serde_json::from_str(strip_code_fences(text))?;
        recipe.validate()?;
        Ok(recipe)
    }

    pub fn validate(&self) -> Result<(), RecipeError> {
        let invalid = |reason: &str| RecipeError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if !self.hue.is_ordered() {
            return Err(invalid("hue range must satisfy min <= max"));
        }
        if !self.decay.is_ordered() {
            return Err(invalid("decay range must satisfy min <= max"));
        }
        if self.decay.min <= 0.0 || self.decay.max > 1.0 {
            return Err(invalid("decay must lie in (0, 1]"));
        }
        if self.particle_count == 0 || self.particle_count > MAX_PARTICLE_COUNT {
            return Err(invalid("particle count must be between 1 and 2000"));
        }
        let scalars = [
            self.saturation,
            self.lightness,
            self.initial_velocity,
            self.gravity,
            self.friction,
            self.trail_length,
        ];
        if scalars.iter().any(|v| !v.is_finite())
            || self.secondary_hue.is_some_and(|h| !h.is_finite())
        {
            return Err(invalid("numeric fields must be finite"));
        }
        if !(self.initial_velocity > 0.0 && self.initial_velocity <= MAX_INITIAL_VELOCITY) {
            return Err(invalid("initial velocity must lie in (0, 100]"));
        }
        if self.gravity.abs() > MAX_GRAVITY {
            return Err(invalid("gravity must lie in [-2, 2]"));
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(invalid("friction must lie in (0, 1]"));
        }
        Ok(())
    }

    /// Hue of the inner core for layered shapes.
    pub fn core_hue(&self) -> f32 {
        self.secondary_hue
            .unwrap_or((self.hue.min + 180.0).rem_euclid(360.0))
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Read a recipe from a JSON file on disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<Recipe, RecipeError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| RecipeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Recipe::from_json(&text)
}

/// An external service that designs a recipe from a natural-language prompt.
pub trait RecipeGenerator {
    fn generate(&mut self, description: &str) -> Result<Recipe, RecipeError>;
}

/// The built-in preset table.
pub fn presets() -> Vec<Recipe> {
    vec![
        Recipe {
            name: "The Sun".into(),
            hue: Range::new(45.0, 60.0),
            secondary_hue: Some(20.0),
            saturation: 100.0,
            lightness: 70.0,
            particle_count: 300,
            initial_velocity: 16.0,
            gravity: 0.15,
            friction: 0.96,
            decay: Range::new(0.01, 0.025),
            shape: Shape::Palm,
            has_trail: true,
            trail_length: 0.6,
            sound_volume: None,
        },
        Recipe {
            name: "The Moon".into(),
            hue: Range::new(180.0, 220.0),
            secondary_hue: Some(0.0),
            saturation: 40.0,
            lightness: 90.0,
            particle_count: 250,
            initial_velocity: 14.0,
            gravity: 0.08,
            friction: 0.94,
            decay: Range::new(0.005, 0.015),
            shape: Shape::Willow,
            has_trail: true,
            trail_length: 0.8,
            sound_volume: None,
        },
        Recipe {
            name: "The Tower".into(),
            hue: Range::new(0.0, 20.0),
            secondary_hue: Some(40.0),
            saturation: 100.0,
            lightness: 60.0,
            particle_count: 350,
            initial_velocity: 18.0,
            gravity: 0.18,
            friction: 0.95,
            decay: Range::new(0.015, 0.035),
            shape: Shape::Crossette,
            has_trail: true,
            trail_length: 0.3,
            sound_volume: None,
        },
        Recipe {
            name: "The Star".into(),
            hue: Range::new(260.0, 320.0),
            secondary_hue: Some(180.0),
            saturation: 90.0,
            lightness: 80.0,
            particle_count: 200,
            initial_velocity: 15.0,
            gravity: 0.12,
            friction: 0.96,
            decay: Range::new(0.02, 0.04),
            shape: Shape::Star,
            has_trail: false,
            trail_length: 0.0,
            sound_volume: None,
        },
        Recipe {
            name: "Wheel of Fortune".into(),
            hue: Range::new(0.0, 360.0),
            secondary_hue: Some(0.0),
            saturation: 100.0,
            lightness: 65.0,
            particle_count: 400,
            initial_velocity: 17.0,
            gravity: 0.14,
            friction: 0.95,
            decay: Range::new(0.01, 0.02),
            shape: Shape::Pistil,
            has_trail: true,
            trail_length: 0.4,
            sound_volume: None,
        },
        Recipe {
            name: "The Magician".into(),
            hue: Range::new(280.0, 300.0),
            secondary_hue: Some(120.0),
            saturation: 100.0,
            lightness: 70.0,
            particle_count: 275,
            initial_velocity: 12.0,
            gravity: 0.1,
            friction: 0.97,
            decay: Range::new(0.01, 0.02),
            shape: Shape::Ring,
            has_trail: true,
            trail_length: 0.2,
            sound_volume: None,
        },
    ]
}
