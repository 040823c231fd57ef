//! The loop driver.
//!
//! [`Driver`] glues input, the simulation, sound and rendering together. It
//! owns no clock of its own: callers pass a monotonic `now` so the same code
//! runs under the terminal loop and under tests.

use std::sync::Arc;
use std::time::Duration;

use crate::autofire::{sky_target, AutoFire};
use crate::canvas::{Canvas, Rgb};
use crate::config::Settings;
use crate::error::RecipeError;
use crate::gesture::{GestureController, GestureFrame};
use crate::recipe::{self, Recipe, RecipeGenerator};
use crate::render::FrameRenderer;
use crate::sim::{SimEvent, Simulation};
use crate::sound::SoundSink;

pub struct Driver {
    sim: Simulation,
    canvas: Canvas,
    renderer: FrameRenderer,
    presets: Vec<Arc<Recipe>>,
    recipe: Arc<Recipe>,
    auto_fire: AutoFire,
    gesture: GestureController,
    gesture_enabled: bool,
    sound: Box<dyn SoundSink>,
    status: Option<String>,
    rows: u16,
}

impl Driver {
    pub fn new(settings: &Settings, sound: Box<dyn SoundSink>) -> Self {
        Self::with_simulation(settings, sound, Simulation::new(settings.max_particles))
    }

    pub fn with_simulation(
        settings: &Settings,
        sound: Box<dyn SoundSink>,
        sim: Simulation,
    ) -> Self {
        let presets: Vec<Arc<Recipe>> = recipe::presets().into_iter().map(Arc::new).collect();
        let index = if settings.preset < presets.len() {
            settings.preset
        } else {
            log::warn!(
                "preset {} does not exist, using preset 0",
                settings.preset
            );
            0
        };
        let recipe = Arc::clone(&presets[index]);

        Self {
            sim,
            canvas: Canvas::new(0, 0),
            renderer: FrameRenderer::new(
                settings.pixels_per_cell,
                Rgb::from_u8(settings.background),
                settings.fade_alpha,
            ),
            presets,
            recipe,
            auto_fire: AutoFire::new(),
            gesture: GestureController::new(),
            gesture_enabled: false,
            sound,
            status: None,
            rows: 0,
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn recipe(&self) -> &Arc<Recipe> {
        &self.recipe
    }

    pub fn presets(&self) -> &[Arc<Recipe>] {
        &self.presets
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Match the terminal. The bottom row is reserved for the status line and
    /// each remaining cell holds two canvas pixels stacked vertically.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.rows = rows;
        let height = rows.saturating_sub(1) as usize * 2;
        self.canvas.resize(cols as usize, height);
        log::debug!(
            "resized to {cols}x{rows} cells, surface {:.0}x{:.0}",
            self.surface_size().0,
            self.surface_size().1
        );
    }

    /// Simulation-space size of the drawing surface.
    pub fn surface_size(&self) -> (f32, f32) {
        let scale = self.renderer.scale();
        (
            self.canvas.width() as f32 * scale,
            self.canvas.height() as f32 * scale,
        )
    }

    /// Map a terminal cell click to the surface and launch there. Clicks on
    /// the status line are ignored.
    pub fn click(&mut self, column: u16, row: u16) -> bool {
        self.resume_sound();
        if row >= self.rows.saturating_sub(1) {
            return false;
        }
        let scale = self.renderer.scale();
        let x = (column as f32 + 0.5) * scale;
        let y = (row as f32 * 2.0 + 1.0) * scale;
        self.trigger(x, y);
        true
    }

    /// Any user input counts as the interaction that unlocks sound.
    pub fn resume_sound(&mut self) {
        self.sound.resume();
    }

    /// Launch a rocket toward `(x, y)` in surface coordinates with the current
    /// recipe. Any trigger source ends up here.
    pub fn trigger(&mut self, x: f32, y: f32) {
        let (_, height) = self.surface_size();
        self.sim.launch(x, y, height, Arc::clone(&self.recipe));
    }

    /// Launch at a random point high in the sky.
    pub fn fire_random(&mut self) {
        let (width, height) = self.surface_size();
        let (x, y) = sky_target(self.sim.rng(), width, height);
        self.trigger(x, y);
    }

    pub fn select_preset(&mut self, index: usize) -> bool {
        let Some(preset) = self.presets.get(index) else {
            return false;
        };
        self.recipe = Arc::clone(preset);
        self.status = None;
        log::info!("selected preset '{}'", self.recipe.name);
        true
    }

    pub fn set_recipe(&mut self, recipe: Recipe) {
        log::info!("using recipe '{}' ({})", recipe.name, recipe.shape.name());
        self.recipe = Arc::new(recipe);
        self.status = None;
    }

    /// Adopt a generated recipe, or keep the current one when generation
    /// failed or produced something unusable.
    pub fn apply_generated(&mut self, result: Result<Recipe, RecipeError>) -> bool {
        match result.and_then(|recipe| recipe.validate().map(|_| recipe)) {
            Ok(recipe) => {
                self.set_recipe(recipe);
                true
            }
            Err(e) => {
                log::warn!("keeping recipe '{}': {e}", self.recipe.name);
                self.status = Some(format!("recipe rejected: {e}"));
                false
            }
        }
    }

    pub fn generate(&mut self, generator: &mut dyn RecipeGenerator, description: &str) -> bool {
        let result = generator.generate(description);
        self.apply_generated(result)
    }

    pub fn auto_fire(&self) -> bool {
        self.auto_fire.is_active()
    }

    pub fn set_auto_fire(&mut self, on: bool, now: Duration) {
        if on == self.auto_fire.is_active() {
            return;
        }
        if on {
            self.auto_fire.start(now);
        } else {
            self.auto_fire.stop();
        }
        log::info!("auto-fire {}", if on { "on" } else { "off" });
    }

    pub fn toggle_auto_fire(&mut self, now: Duration) {
        let on = !self.auto_fire.is_active();
        self.set_auto_fire(on, now);
    }

    pub fn set_gesture_enabled(&mut self, on: bool) {
        self.gesture_enabled = on;
        self.gesture.reset();
    }

    pub fn gesture_enabled(&self) -> bool {
        self.gesture_enabled
    }

    /// The gesture collaborator could not start (no camera permission, model
    /// failed to load). Gesture input goes inert; everything else keeps going.
    pub fn gesture_unavailable(&mut self, reason: &str) {
        log::warn!("gesture input unavailable: {reason}");
        self.set_gesture_enabled(false);
        self.status = Some(format!("gesture input unavailable: {reason}"));
    }

    /// Feed a recognizer frame. Returns `true` if it launched a rocket.
    pub fn feed_gesture(&mut self, frame: GestureFrame, now: Duration) -> bool {
        if !self.gesture_enabled {
            return false;
        }
        let surface = self.surface_size();
        match self.gesture.observe(frame, now, surface) {
            Some((x, y)) => {
                self.trigger(x, y);
                true
            }
            None => false,
        }
    }

    /// One frame: due auto-fire launches, a simulation step, sound, paint.
    pub fn tick(&mut self, now: Duration) {
        if self.auto_fire.poll(now, self.sim.rng()) {
            self.fire_random();
        }

        self.sim.tick();

        for event in self.sim.drain_events() {
            match event {
                SimEvent::Launch => self.sound.play_launch(),
                SimEvent::Explosion { size } => self.sound.play_explosion(size),
            }
        }

        self.renderer.paint(&self.sim, &mut self.canvas);
    }

    pub fn status_line(&self) -> String {
        let mut line = format!(
            " {} · {} · auto-fire {}",
            self.recipe.name,
            self.recipe.shape.name(),
            if self.auto_fire() { "on" } else { "off" }
        );
        if let Some(status) = &self.status {
            line.push_str(" · ");
            line.push_str(status);
        }
        line
    }

    /// Cancel scheduled work and release the sound sink.
    pub fn shutdown(&mut self) {
        self.auto_fire.stop();
        self.gesture.reset();
        self.sound.release();
        log::info!("driver shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Gesture;
    use crate::physics::tests::recipe;
    use crate::recipe::Shape;
    use crate::sound::tests::Recorder;
    use fastrand::Rng;

    fn driver() -> (Driver, Recorder) {
        let recorder = Recorder::default();
        let sim = Simulation::with_rng(Rng::with_seed(41), 20_000);
        let mut driver =
            Driver::with_simulation(&Settings::default(), Box::new(recorder.clone()), sim);
        driver.resize(80, 25);
        (driver, recorder)
    }

    struct Stub(Result<Recipe, String>);

    impl RecipeGenerator for Stub {
        fn generate(&mut self, _description: &str) -> Result<Recipe, RecipeError> {
            self.0.clone().map_err(RecipeError::Generator)
        }
    }

    #[test]
    fn test_resize_reserves_status_row() {
        let (driver, _) = driver();
        assert_eq!(driver.canvas().width(), 80);
        assert_eq!(driver.canvas().height(), 48);
        assert_eq!(driver.surface_size(), (480.0, 288.0));
    }

    #[test]
    fn test_click_launches_toward_cell() {
        let (mut driver, sound) = driver();
        assert!(driver.click(10, 5));
        let rocket = &driver.simulation().rockets()[0];
        assert!((rocket.target_x - 63.0).abs() < 1e-3);
        assert!((rocket.target_y - 66.0).abs() < 1e-3);
        assert_eq!(rocket.y, 288.0);

        assert!(!driver.click(10, 24));
        assert_eq!(driver.simulation().rockets().len(), 1);

        driver.tick(Duration::ZERO);
        let calls = sound.calls.borrow();
        assert_eq!(calls[0], "resume");
        assert!(calls.contains(&"launch".to_string()));
    }

    #[test]
    fn test_rocket_detonates_and_paints() {
        let (mut driver, sound) = driver();
        driver.trigger(240.0, 60.0);
        let mut now = Duration::ZERO;
        for _ in 0..200 {
            now += Duration::from_millis(16);
            driver.tick(now);
            if driver.simulation().rockets().is_empty() {
                break;
            }
        }
        assert!(driver.simulation().rockets().is_empty());
        assert!(sound.calls.borrow().iter().any(|c| c.starts_with("explosion")));

        let canvas = driver.canvas();
        let mut lit = 0;
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                let p = canvas.pixel(x, y);
                if p.r + p.g + p.b > 0.1 {
                    lit += 1;
                }
            }
        }
        assert!(lit > 0);
    }

    #[test]
    fn test_generated_recipe_failure_keeps_previous() {
        let (mut driver, _) = driver();
        let before = Arc::clone(driver.recipe());

        assert!(!driver.generate(&mut Stub(Err("quota exceeded".into())), "dragons"));
        assert!(Arc::ptr_eq(&before, driver.recipe()));
        assert!(driver.status().unwrap().contains("quota exceeded"));

        let mut broken = (*recipe(Shape::Star, 10)).clone();
        broken.hue = crate::recipe::Range::new(90.0, 10.0);
        assert!(!driver.generate(&mut Stub(Ok(broken)), "inverted"));
        assert!(Arc::ptr_eq(&before, driver.recipe()));

        assert!(!driver.apply_generated(Recipe::from_json("not json")));
        assert!(Arc::ptr_eq(&before, driver.recipe()));
    }

    #[test]
    fn test_generated_recipe_success_is_used() {
        let (mut driver, _) = driver();
        let good = (*recipe(Shape::Willow, 120)).clone();
        assert!(driver.generate(&mut Stub(Ok(good)), "weeping"));
        assert_eq!(driver.recipe().shape, Shape::Willow);
        assert!(driver.status().is_none());

        driver.trigger(100.0, 50.0);
        assert_eq!(driver.simulation().rockets()[0].recipe.shape, Shape::Willow);
    }

    #[test]
    fn test_select_preset() {
        let (mut driver, _) = driver();
        assert!(driver.select_preset(5));
        assert_eq!(driver.recipe().name, "The Magician");
        assert!(!driver.select_preset(6));
        assert_eq!(driver.recipe().name, "The Magician");
    }

    #[test]
    fn test_auto_fire_launches_until_stopped() {
        let (mut driver, _) = driver();
        driver.set_auto_fire(true, Duration::ZERO);
        driver.tick(Duration::ZERO);
        assert_eq!(driver.simulation().rockets().len(), 1);

        // nothing new before the minimum delay
        driver.tick(Duration::from_millis(300));
        assert_eq!(driver.simulation().rockets().len(), 1);

        driver.tick(Duration::from_millis(1600));
        assert_eq!(driver.simulation().rockets().len(), 2);

        driver.set_auto_fire(false, Duration::from_millis(1600));
        let launched = driver.simulation().rockets().len();
        driver.tick(Duration::from_secs(10));
        assert!(driver.simulation().rockets().len() <= launched);
        assert!(driver.status_line().contains("auto-fire off"));
    }

    #[test]
    fn test_gesture_fires_only_when_enabled() {
        let (mut driver, _) = driver();
        let fist = GestureFrame::new(Gesture::ClosedFist, 0.5, 0.5);
        let palm = GestureFrame::new(Gesture::OpenPalm, 0.5, 0.25);

        driver.feed_gesture(fist, Duration::ZERO);
        assert!(!driver.feed_gesture(palm, Duration::from_millis(100)));

        driver.set_gesture_enabled(true);
        driver.feed_gesture(fist, Duration::from_millis(200));
        assert!(driver.feed_gesture(palm, Duration::from_millis(300)));
        let rocket = &driver.simulation().rockets()[0];
        assert!((rocket.target_x - 240.0).abs() < 1e-3);
        assert!((rocket.target_y - 72.0).abs() < 1e-3);
    }

    #[test]
    fn test_gesture_unavailable_goes_inert() {
        let (mut driver, _) = driver();
        driver.set_gesture_enabled(true);
        driver.gesture_unavailable("camera permission denied");
        assert!(!driver.gesture_enabled());
        assert!(driver.status_line().contains("camera permission denied"));

        driver.feed_gesture(GestureFrame::new(Gesture::ClosedFist, 0.5, 0.5), Duration::ZERO);
        assert!(!driver.feed_gesture(
            GestureFrame::new(Gesture::OpenPalm, 0.5, 0.5),
            Duration::from_millis(50)
        ));
        // the show goes on
        driver.trigger(100.0, 100.0);
        driver.tick(Duration::ZERO);
    }

    #[test]
    fn test_shutdown_cancels_and_releases() {
        let (mut driver, sound) = driver();
        driver.set_auto_fire(true, Duration::ZERO);
        driver.shutdown();
        assert!(!driver.auto_fire());
        assert_eq!(sound.calls.borrow().last().unwrap(), "release");
    }
}
