//! Paints the simulation onto the canvas once per tick.

use crate::canvas::{hsl, Blend, Canvas, Rgb};
use crate::sim::Simulation;

/// Rocket exhaust: gold.
const ROCKET_TAIL: (f32, f32, f32) = (40.0, 100.0, 70.0);
const ROCKET_TAIL_STEPS: f32 = 4.0;
const PARTICLE_TRAIL_STEPS: f32 = 2.5;
const PARTICLE_RADIUS: f32 = 2.0;

pub struct FrameRenderer {
    /// Surface pixels per canvas pixel.
    scale: f32,
    background: Rgb,
    fade_alpha: f32,
}

impl FrameRenderer {
    pub fn new(scale: f32, background: Rgb, fade_alpha: f32) -> Self {
        Self {
            scale,
            background,
            fade_alpha,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Fade the previous frame, then draw every live entity additively.
    pub fn paint(&self, sim: &Simulation, canvas: &mut Canvas) {
        canvas.set_blend(Blend::SourceOver);
        canvas.fill_rect(self.background, self.fade_alpha);

        canvas.set_blend(Blend::Screen);

        let k = 1.0 / self.scale;
        let tail = hsl(ROCKET_TAIL.0, ROCKET_TAIL.1, ROCKET_TAIL.2);
        for rocket in sim.rockets() {
            let (x, y) = (rocket.x * k, rocket.y * k);
            canvas.stroke_line(
                (rocket.x - rocket.vx * ROCKET_TAIL_STEPS) * k,
                (rocket.y - rocket.vy * ROCKET_TAIL_STEPS) * k,
                x,
                y,
                tail,
                1.0,
            );
            canvas.plot(x, y, Rgb::WHITE, 1.0);
        }

        for p in sim.particles() {
            if p.alpha <= 0.0 || !p.x.is_finite() || !p.y.is_finite() {
                continue;
            }
            let color = hsl(p.hue, p.recipe.saturation, p.recipe.lightness);
            if p.has_trail {
                canvas.stroke_line(
                    (p.x - p.vx * PARTICLE_TRAIL_STEPS) * k,
                    (p.y - p.vy * PARTICLE_TRAIL_STEPS) * k,
                    p.x * k,
                    p.y * k,
                    color,
                    p.alpha,
                );
            } else {
                canvas.fill_disc(p.x * k, p.y * k, PARTICLE_RADIUS * k, color, p.alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::tests::recipe;
    use crate::physics::{Behavior, Particle};
    use crate::recipe::Shape;
    use fastrand::Rng;
    use std::sync::Arc;

    fn lit(canvas: &Canvas) -> usize {
        let mut count = 0;
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                let p = canvas.pixel(x, y);
                if p.r + p.g + p.b > 0.05 {
                    count += 1;
                }
            }
        }
        count
    }

    fn spark(x: f32, y: f32, alpha: f32, has_trail: bool) -> Particle {
        let mut recipe = (*recipe(Shape::Sphere, 10)).clone();
        recipe.has_trail = has_trail;
        Particle {
            x,
            y,
            vx: 4.0,
            vy: 0.0,
            alpha,
            hue: 0.0,
            decay: 0.01,
            life: alpha,
            max_life: 1.0,
            has_trail,
            behavior: Behavior::Normal,
            recipe: Arc::new(recipe),
        }
    }

    #[test]
    fn test_empty_frame_only_fades() {
        let sim = Simulation::with_rng(Rng::with_seed(1), 100);
        let renderer = FrameRenderer::new(1.0, Rgb::BLACK, 0.2);
        let mut canvas = Canvas::new(4, 4);
        canvas.clear(Rgb::WHITE);
        renderer.paint(&sim, &mut canvas);
        let p = canvas.pixel(2, 2);
        assert!((p.r - 0.8).abs() < 1e-4);
        assert_eq!(canvas.blend(), Blend::Screen);
    }

    #[test]
    fn test_disc_particle_is_drawn_in_its_color() {
        let mut sim = Simulation::with_rng(Rng::with_seed(2), 100);
        sim.push_particles([spark(20.0, 20.0, 1.0, false)]);
        let renderer = FrameRenderer::new(2.0, Rgb::BLACK, 0.2);
        let mut canvas = Canvas::new(20, 20);
        renderer.paint(&sim, &mut canvas);

        // red at 60% lightness
        let p = canvas.pixel(10, 10);
        assert!(p.r > 0.9 && p.g > 0.15 && p.g < 0.25);
    }

    #[test]
    fn test_trail_particle_draws_a_segment() {
        let mut sim = Simulation::with_rng(Rng::with_seed(3), 100);
        sim.push_particles([spark(20.0, 5.0, 1.0, true)]);
        let renderer = FrameRenderer::new(1.0, Rgb::BLACK, 0.2);
        let mut canvas = Canvas::new(32, 8);
        renderer.paint(&sim, &mut canvas);
        // tail runs back 10 pixels along -vx
        assert!(lit(&canvas) >= 10);
        assert!(canvas.pixel(12, 5).r > 0.5);
    }

    #[test]
    fn test_invisible_particles_are_skipped() {
        let mut sim = Simulation::with_rng(Rng::with_seed(4), 100);
        sim.push_particles([spark(5.0, 5.0, 0.0, false), spark(f32::NAN, 5.0, 1.0, true)]);
        let renderer = FrameRenderer::new(1.0, Rgb::BLACK, 0.2);
        let mut canvas = Canvas::new(10, 10);
        renderer.paint(&sim, &mut canvas);
        assert_eq!(lit(&canvas), 0);
    }

    #[test]
    fn test_overlapping_sparks_intensify() {
        let renderer = FrameRenderer::new(1.0, Rgb::BLACK, 0.2);

        let mut one = Simulation::with_rng(Rng::with_seed(5), 100);
        one.push_particles([spark(5.5, 5.5, 0.5, false)]);
        let mut canvas_one = Canvas::new(10, 10);
        renderer.paint(&one, &mut canvas_one);

        let mut two = Simulation::with_rng(Rng::with_seed(6), 100);
        two.push_particles([spark(5.5, 5.5, 0.5, false), spark(5.5, 5.5, 0.5, false)]);
        let mut canvas_two = Canvas::new(10, 10);
        renderer.paint(&two, &mut canvas_two);

        assert!(canvas_two.pixel(5, 5).r > canvas_one.pixel(5, 5).r);
    }

    #[test]
    fn test_rocket_draws_head_and_tail() {
        let mut sim = Simulation::with_rng(Rng::with_seed(7), 100);
        sim.launch(8.0, 0.0, 30.0, recipe(Shape::Ring, 10));
        let renderer = FrameRenderer::new(1.0, Rgb::BLACK, 0.2);
        let mut canvas = Canvas::new(16, 32);
        renderer.paint(&sim, &mut canvas);
        let rocket = &sim.rockets()[0];
        let head = canvas.pixel(rocket.x as usize, rocket.y as usize);
        assert!(head.b > 0.9, "head should be white");
        assert!(lit(&canvas) > 1);
    }
}
