//! Rocket launch kinematics and burst generation.
//!
//! Everything here is a pure function of its inputs and the supplied RNG.
//! Units are surface pixels and ticks: velocities are pixels per tick and
//! gravity is pixels per tick squared.

use std::f32::consts::PI;
use std::sync::Arc;

use fastrand::Rng;

use crate::recipe::{Recipe, Shape};

/// Vertical acceleration applied to rockets each tick. `launch` derives its
/// velocity from the same constant so rockets peak near their target.
pub const ROCKET_GRAVITY: f32 = 0.15;
/// A rocket detonates once its vertical velocity is at or above this.
pub const APEX_VELOCITY: f32 = -1.0;

pub const RING_COUNT_FACTOR: f32 = 0.4;
pub const HUE_JITTER: f32 = 10.0;
pub const WILLOW_DECAY_FACTOR: f32 = 0.4;
pub const SPLIT_PROBABILITY: f32 = 0.4;

pub const SPLIT_FRICTION: f32 = 0.94;
pub const SPLIT_WINDOW: (f32, f32) = (0.6, 0.7);
pub const SPLIT_CHILDREN: usize = 3;
pub const SPLIT_CHILD_LIFE: f32 = 0.6;
pub const SPLIT_CHILD_DECAY: f32 = 0.03;
pub const SPLIT_SOUND_SIZE: f32 = 0.2;

/// Pistil core relative to the shell.
pub const CORE_COUNT_FACTOR: f32 = 0.4;
pub const CORE_SCALE_FACTOR: f32 = 0.5;

/// Per-explosion size multiplier range.
pub const SIZE_RANGE: (f32, f32) = (0.8, 1.4);

pub fn uniform(rng: &mut Rng, min: f32, max: f32) -> f32 {
    min + rng.f32() * (max - min)
}

#[derive(Debug, Clone)]
pub struct Rocket {
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub hue: f32,
    pub recipe: Arc<Recipe>,
    pub exploded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    /// Crossette star that splits once mid-flight.
    Split,
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub alpha: f32,
    pub hue: f32,
    pub decay: f32,
    pub life: f32,
    pub max_life: f32,
    pub has_trail: bool,
    pub behavior: Behavior,
    pub recipe: Arc<Recipe>,
}

/// Output of one shape lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub behavior: Behavior,
}

impl Emission {
    fn polar(angle: f32, speed: f32) -> Self {
        Self {
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
            life: 1.0,
            behavior: Behavior::Normal,
        }
    }
}

/// Particles produced by one detonation.
#[derive(Debug, Default)]
pub struct Burst {
    pub primary: Vec<Particle>,
    /// Inner core layer, only filled for pistil shells.
    pub secondary: Vec<Particle>,
    pub scale: f32,
}

impl Burst {
    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_particles(self) -> impl Iterator<Item = Particle> {
        self.primary.into_iter().chain(self.secondary)
    }
}

/// Create a rocket that rises from the bottom edge to roughly `target_y`.
pub fn launch(
    rng: &mut Rng,
    target_x: f32,
    target_y: f32,
    surface_height: f32,
    recipe: Arc<Recipe>,
) -> Rocket {
    let start_x = target_x + uniform(rng, -1.0, 1.0);
    let start_y = surface_height;

    // v^2 = 2gh, with a little height variation so repeated clicks don't
    // all stop at exactly the same spot.
    let height = (start_y - target_y).max(0.0);
    let height_variation = uniform(rng, 0.95, 1.1);
    let vy = -(2.0 * ROCKET_GRAVITY * height * height_variation).sqrt();

    let time_to_apex = vy.abs() / ROCKET_GRAVITY;
    let vx = if time_to_apex > 0.0 {
        (target_x - start_x) / time_to_apex
    } else {
        0.0
    };

    Rocket {
        x: start_x,
        y: start_y,
        target_x,
        target_y,
        vx,
        vy,
        hue: recipe.hue.sample(rng),
        recipe,
        exploded: false,
    }
}

/// Number of particles a burst of `shape` emits before shape filtering.
pub fn burst_count(recipe: &Recipe, shape: Shape, scale: f32) -> usize {
    scaled_count(recipe.particle_count as f32, shape, scale)
}

fn scaled_count(base_count: f32, shape: Shape, scale: f32) -> usize {
    let factor = if shape == Shape::Ring {
        RING_COUNT_FACTOR
    } else {
        1.0
    };
    let count = (base_count * factor * scale).floor();
    if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    }
}

/// Velocity, lifetime multiplier and behavior for particle `index` of
/// `count`. Returns `None` for indices the shape leaves out.
pub fn shape_velocity(
    rng: &mut Rng,
    shape: Shape,
    index: usize,
    count: usize,
    v0: f32,
) -> Option<Emission> {
    let even_angle = || 2.0 * PI * index as f32 / count as f32;

    let emission = match shape {
        Shape::Sphere | Shape::Pistil => {
            let angle = uniform(rng, 0.0, 2.0 * PI);
            let velocity = uniform(rng, v0 * 0.5, v0);
            Emission::polar(angle, uniform(rng, 0.1, velocity))
        }
        Shape::Star => {
            let radius = if index % 2 == 0 { v0 } else { v0 * 0.3 };
            Emission::polar(even_angle(), radius)
        }
        Shape::Ring => Emission::polar(even_angle(), v0 * 0.9),
        Shape::Willow => {
            let angle = uniform(rng, 0.0, 2.0 * PI);
            let speed = uniform(rng, 0.2, v0);
            Emission {
                life: uniform(rng, 1.2, 1.8),
                ..Emission::polar(angle, speed)
            }
        }
        Shape::Palm => {
            // index < 0.4 * count, kept in integers
            if index * 5 >= count * 2 {
                return None;
            }
            let angle = uniform(rng, 0.0, 2.0 * PI);
            let mut emission = Emission::polar(angle, uniform(rng, v0 * 0.8, v0));
            emission.vy -= 1.0;
            emission
        }
        Shape::Crossette => {
            let angle = uniform(rng, 0.0, 2.0 * PI);
            let mut emission = Emission::polar(angle, uniform(rng, v0 * 0.5, v0));
            if rng.f32() < SPLIT_PROBABILITY {
                emission.behavior = Behavior::Split;
            }
            emission
        }
    };
    Some(emission)
}

/// Generate the particles of one explosion at `(x, y)`.
///
/// `shape` overrides the recipe's shape, `color` overrides the random base
/// hue. Pistil shells also produce a smaller spherical core in
/// [`Burst::secondary`].
pub fn burst(
    rng: &mut Rng,
    x: f32,
    y: f32,
    recipe: &Arc<Recipe>,
    shape: Option<Shape>,
    scale: f32,
    color: Option<f32>,
) -> Burst {
    burst_within(rng, x, y, recipe, shape, scale, color, usize::MAX)
}

/// Like [`burst`], but emits at most `limit` particles in total. The shape
/// pattern is laid out for the full count and emission stops at the limit.
#[allow(clippy::too_many_arguments)]
pub fn burst_within(
    rng: &mut Rng,
    x: f32,
    y: f32,
    recipe: &Arc<Recipe>,
    shape: Option<Shape>,
    scale: f32,
    color: Option<f32>,
    limit: usize,
) -> Burst {
    let shape = shape.unwrap_or(recipe.shape);
    let primary = emit(
        rng,
        x,
        y,
        recipe,
        shape,
        recipe.particle_count as f32,
        scale,
        color,
        limit,
    );

    let secondary = if shape == Shape::Pistil {
        emit(
            rng,
            x,
            y,
            recipe,
            Shape::Sphere,
            recipe.particle_count as f32 * CORE_COUNT_FACTOR,
            scale * CORE_SCALE_FACTOR,
            Some(recipe.core_hue()),
            limit - primary.len(),
        )
    } else {
        Vec::new()
    };

    Burst {
        primary,
        secondary,
        scale,
    }
}

/// Consume a rocket and explode it with a random size multiplier, emitting
/// at most `limit` particles.
pub fn detonate(rng: &mut Rng, rocket: Rocket, limit: usize) -> Burst {
    let scale = uniform(rng, SIZE_RANGE.0, SIZE_RANGE.1);
    burst_within(rng, rocket.x, rocket.y, &rocket.recipe, None, scale, None, limit)
}

#[allow(clippy::too_many_arguments)]
fn emit(
    rng: &mut Rng,
    x: f32,
    y: f32,
    recipe: &Arc<Recipe>,
    shape: Shape,
    base_count: f32,
    scale: f32,
    color: Option<f32>,
    limit: usize,
) -> Vec<Particle> {
    let count = scaled_count(base_count, shape, scale);
    if count == 0 || limit == 0 {
        return Vec::new();
    }

    let v0 = recipe.initial_velocity * scale;
    let base_hue = color.unwrap_or_else(|| recipe.hue.sample(rng).floor());
    let decay_factor = if shape == Shape::Willow {
        WILLOW_DECAY_FACTOR
    } else {
        1.0
    };

    let mut particles = Vec::with_capacity(count.min(limit));
    for index in 0..count {
        if particles.len() == limit {
            break;
        }
        let Some(emission) = shape_velocity(rng, shape, index, count, v0) else {
            continue;
        };

        particles.push(Particle {
            x,
            y,
            vx: emission.vx,
            vy: emission.vy,
            alpha: 1.0,
            hue: base_hue + uniform(rng, -HUE_JITTER, HUE_JITTER),
            decay: recipe.decay.sample(rng) * decay_factor,
            life: emission.life,
            max_life: emission.life,
            has_trail: recipe.has_trail,
            behavior: emission.behavior,
            recipe: Arc::clone(recipe),
        });
    }
    particles
}
