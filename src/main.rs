use anyhow::{bail, Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::env;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use lumiere::config::{parse_hex_color, Settings};
use lumiere::driver::Driver;
use lumiere::recipe;
use lumiere::sound::{Bell, Silent, SoundSink};
use lumiere::terminal::Presenter;

fn print_usage() {
    eprintln!("lumiere - interactive fireworks in the terminal");
    eprintln!();
    eprintln!("Usage: lumiere [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config PATH      Read settings from a TOML file");
    eprintln!("  --bg-color RRGGBB  Set background color as hex (e.g., --bg-color 1a1b26)");
    eprintln!("  --preset N         Start with preset N (1-6)");
    eprintln!("  --auto             Start with auto-fire on");
    eprintln!("  --bell             Ring the terminal bell on launches and bursts");
    eprintln!("  --recipe PATH      Load a recipe from a JSON file");
    eprintln!();
    eprintln!("Controls:");
    eprintln!("  click      launch a rocket toward the pointer");
    eprintln!("  space      launch at a random point in the sky");
    eprintln!("  a          toggle auto-fire");
    eprintln!("  1-9        select a preset");
    eprintln!("  r          reload the recipe file");
    eprintln!();
    eprintln!("Press 'q', ESC, or Ctrl+C to exit");
}

/// Command-line overrides, applied on top of the config file.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    bg_color: Option<(u8, u8, u8)>,
    preset: Option<usize>,
    auto: bool,
    bell: bool,
    recipe: Option<PathBuf>,
    help: bool,
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                parsed.config = Some(PathBuf::from(flag_value(args, i, "--config")?));
                i += 2;
            }
            "--bg-color" => {
                let hex = flag_value(args, i, "--bg-color")?;
                let Some(color) = parse_hex_color(hex) else {
                    bail!("invalid hex color: {hex} (expected RRGGBB, e.g. 1a1b26)");
                };
                parsed.bg_color = Some(color);
                i += 2;
            }
            "--preset" => {
                let n = flag_value(args, i, "--preset")?;
                let n: usize = n
                    .parse()
                    .ok()
                    .filter(|n| *n >= 1)
                    .with_context(|| format!("invalid preset number: {n}"))?;
                parsed.preset = Some(n - 1);
                i += 2;
            }
            "--recipe" => {
                parsed.recipe = Some(PathBuf::from(flag_value(args, i, "--recipe")?));
                i += 2;
            }
            "--auto" => {
                parsed.auto = true;
                i += 1;
            }
            "--bell" => {
                parsed.bell = true;
                i += 1;
            }
            "help" | "--help" | "-h" => {
                parsed.help = true;
                i += 1;
            }
            arg => bail!("unknown option: {arg}"),
        }
    }
    Ok(parsed)
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("unable to load config {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(color) = args.bg_color {
        settings.background = color;
    }
    if let Some(preset) = args.preset {
        settings.preset = preset;
    }
    if args.recipe.is_some() {
        settings.recipe_file = args.recipe.clone();
    }
    settings.auto_fire |= args.auto;
    settings.bell |= args.bell;

    settings.validate()?;
    Ok(settings)
}

fn reload_recipe(driver: &mut Driver, settings: &Settings) {
    match &settings.recipe_file {
        Some(path) => {
            driver.apply_generated(recipe::load_file(path));
        }
        None => driver.set_status("no recipe file given (--recipe)"),
    }
}

/// Returns `false` when the key asks to quit.
fn handle_key(key: KeyEvent, driver: &mut Driver, settings: &Settings, now: Duration) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
        KeyCode::Char('a') => driver.toggle_auto_fire(now),
        KeyCode::Char(' ') => {
            driver.resume_sound();
            driver.fire_random();
        }
        KeyCode::Char('r') => reload_recipe(driver, settings),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if !driver.select_preset(index) {
                driver.set_status(format!("no preset {c}"));
            }
        }
        _ => {}
    }
    true
}

fn show_loop(driver: &mut Driver, settings: &Settings, out: &mut impl Write) -> Result<()> {
    let (cols, rows) = terminal::size().context("unable to read terminal size")?;
    driver.resize(cols, rows);
    let mut status_row = rows.saturating_sub(1);

    let start = Instant::now();
    if settings.auto_fire {
        driver.set_auto_fire(true, Duration::ZERO);
    }

    let mut presenter = Presenter::new();
    let mut last_frame = start;
    let mut accumulator = 0.0f32;
    let fixed_dt = 1.0 / settings.tick_rate as f32;

    loop {
        if event::poll(Duration::from_millis(1))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !handle_key(key, driver, settings, start.elapsed()) {
                        break;
                    }
                }
                Event::Mouse(MouseEvent {
                    kind: MouseEventKind::Down(_),
                    column,
                    row,
                    ..
                }) => {
                    driver.click(column, row);
                }
                Event::Resize(cols, rows) => {
                    driver.resize(cols, rows);
                    status_row = rows.saturating_sub(1);
                    execute!(out, Clear(ClearType::All))?;
                }
                _ => {}
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > fixed_dt * 3.0 {
            accumulator = fixed_dt * 3.0;
        }

        while accumulator >= fixed_dt {
            driver.tick(start.elapsed());
            accumulator -= fixed_dt;
        }

        presenter.present(driver.canvas(), &driver.status_line(), status_row, out)?;
    }

    Ok(())
}

fn run_show(driver: &mut Driver, settings: &Settings) -> Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode().context("unable to enable raw mode")?;
    let result = execute!(
        stdout,
        EnterAlternateScreen,
        Hide,
        Clear(ClearType::All),
        EnableMouseCapture
    )
    .context("unable to prepare the terminal")
    .and_then(|_| show_loop(driver, settings, &mut stdout));

    // Restore the terminal whatever happened in the loop.
    let restored = execute!(stdout, Show, LeaveAlternateScreen, DisableMouseCapture)
        .and_then(|_| terminal::disable_raw_mode());
    driver.shutdown();

    result?;
    restored.context("unable to restore the terminal")?;
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };
    if args.help {
        print_usage();
        return Ok(());
    }

    let settings = load_settings(&args)?;
    let _logger = lumiere::logging::setup(&settings.log_dir())?;
    log::info!("starting with {settings:?}");

    let sound: Box<dyn SoundSink> = if settings.bell {
        Box::new(Bell::new(std::io::stdout()))
    } else {
        Box::new(Silent)
    };
    let mut driver = Driver::new(&settings, sound);
    if settings.recipe_file.is_some() {
        reload_recipe(&mut driver, &settings);
    }

    let result = run_show(&mut driver, &settings);
    if let Err(e) = &result {
        log::error!("{e:#}");
    }
    result
}
