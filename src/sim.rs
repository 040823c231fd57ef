//! The simulation stepper.
//!
//! [`Simulation`] owns every live rocket and particle and is the only thing
//! that mutates them. One call to [`Simulation::tick`] advances the world by
//! one frame. Dead entries are swap-removed in place so the collections
//! never reallocate during steady-state play.

use std::sync::Arc;

use fastrand::Rng;

use crate::physics::{
    self, Behavior, Particle, Rocket, APEX_VELOCITY, ROCKET_GRAVITY, SPLIT_CHILDREN,
    SPLIT_CHILD_DECAY, SPLIT_CHILD_LIFE, SPLIT_FRICTION, SPLIT_SOUND_SIZE, SPLIT_WINDOW,
};
use crate::recipe::Recipe;

/// Things that happened during a tick that collaborators may react to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    Launch,
    Explosion { size: f32 },
}

pub struct Simulation {
    rockets: Vec<Rocket>,
    particles: Vec<Particle>,
    events: Vec<SimEvent>,
    rng: Rng,
    max_particles: usize,
}

impl Simulation {
    pub fn new(max_particles: usize) -> Self {
        Self::with_rng(Rng::new(), max_particles)
    }

    pub fn with_rng(rng: Rng, max_particles: usize) -> Self {
        Self {
            rockets: Vec::with_capacity(32),
            particles: Vec::with_capacity(max_particles.min(4096)),
            events: Vec::new(),
            rng,
            max_particles,
        }
    }

    pub fn rockets(&self) -> &[Rocket] {
        &self.rockets
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn is_idle(&self) -> bool {
        self.rockets.is_empty() && self.particles.is_empty()
    }

    pub fn rng(&mut self) -> &mut Rng {
        &mut self.rng
    }

    /// Fire a rocket from the bottom edge toward `(x, y)`.
    pub fn launch(&mut self, x: f32, y: f32, surface_height: f32, recipe: Arc<Recipe>) {
        let rocket = physics::launch(&mut self.rng, x, y, surface_height, recipe);
        log::trace!(
            "launch '{}' toward ({x:.0}, {y:.0}) vy={:.2}",
            rocket.recipe.name,
            rocket.vy
        );
        self.push_rocket(rocket);
    }

    pub fn push_rocket(&mut self, rocket: Rocket) {
        self.rockets.push(rocket);
        self.events.push(SimEvent::Launch);
    }

    /// Add particles directly, respecting the particle cap.
    pub fn push_particles(&mut self, particles: impl IntoIterator<Item = Particle>) {
        let room = self.max_particles.saturating_sub(self.particles.len());
        self.particles.extend(particles.into_iter().take(room));
    }

    /// Events recorded since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, SimEvent> {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.rockets.clear();
        self.particles.clear();
        self.events.clear();
    }

    /// Advance all rockets, then all particles, by one tick.
    ///
    /// Particles from a detonation in this tick take their first step in this
    /// same tick. Split children wait until the next one.
    pub fn tick(&mut self) {
        self.step_rockets();
        self.step_particles();
    }

    fn step_rockets(&mut self) {
        let mut i = 0;
        while i < self.rockets.len() {
            let rocket = &mut self.rockets[i];
            rocket.x += rocket.vx;
            rocket.y += rocket.vy;
            rocket.vy += ROCKET_GRAVITY;

            // Apex, not target proximity, triggers the shell.
            if rocket.vy < APEX_VELOCITY {
                i += 1;
                continue;
            }

            let mut rocket = self.rockets.swap_remove(i);
            rocket.exploded = true;
            log::trace!(
                "detonate '{}' at ({:.0}, {:.0}), target ({:.0}, {:.0})",
                rocket.recipe.name,
                rocket.x,
                rocket.y,
                rocket.target_x,
                rocket.target_y
            );
            let room = self.max_particles.saturating_sub(self.particles.len());
            let burst = physics::detonate(&mut self.rng, rocket, room);
            if burst.len() >= room {
                log::debug!(
                    "particle cap {} reached, burst trimmed to {room}",
                    self.max_particles
                );
            }
            self.events.push(SimEvent::Explosion { size: burst.scale });
            self.particles.extend(burst.into_particles());
        }
    }

    fn step_particles(&mut self) {
        let mut children = Vec::new();

        let mut i = 0;
        while i < self.particles.len() {
            let p = &mut self.particles[i];

            p.x += p.vx;
            p.y += p.vy;

            let friction = match p.behavior {
                Behavior::Split => SPLIT_FRICTION,
                Behavior::Normal => p.recipe.friction,
            };
            p.vx *= friction;
            p.vy *= friction;
            p.vy += p.recipe.gravity;

            p.life -= p.decay;
            p.alpha = p.life;

            if p.behavior == Behavior::Split && p.life > SPLIT_WINDOW.0 && p.life < SPLIT_WINDOW.1 {
                p.behavior = Behavior::Normal;
                for _ in 0..SPLIT_CHILDREN {
                    let mut child = p.clone();
                    child.vx += physics::uniform(&mut self.rng, -2.0, 2.0);
                    child.vy += physics::uniform(&mut self.rng, -2.0, 2.0);
                    child.life = SPLIT_CHILD_LIFE;
                    child.max_life = SPLIT_CHILD_LIFE;
                    child.decay = SPLIT_CHILD_DECAY;
                    child.alpha = 1.0;
                    children.push(child);
                }
                p.life = 0.0;
                self.events.push(SimEvent::Explosion {
                    size: SPLIT_SOUND_SIZE,
                });
            }

            if p.life <= 0.0 {
                self.particles.swap_remove(i);
            } else {
                i += 1;
            }
        }

        if !children.is_empty() {
            self.push_particles(children);
        }
    }
}
