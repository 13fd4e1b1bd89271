use std::{
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use clap_num::maybe_hex;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

use chip8_vm::emu::{DEFAULT_CPU_HZ, DISPLAY_X, DISPLAY_Y, Processor, Profile, Runner, random};

/// Mapping from keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Key release events are not fired in terminals on Linux.
// To handle this, we implement a timeout after which we consider a key released.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(50);

struct App {
    runner: Runner,
    status: String,
    should_quit: bool,
    last_tick: Instant,
    /// Most recently pressed key and when
    key_press: Option<(u8, Instant)>,
}

impl App {
    fn new(processor: Processor, cpu_hz: f32) -> Self {
        Self {
            runner: Runner::new(processor, cpu_hz),
            status: String::new(),
            should_quit: false,
            last_tick: Instant::now(),
            key_press: None,
        }
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            let dt = self.last_tick.elapsed().as_secs_f32();
            self.last_tick = Instant::now();

            if let Err(e) = self.runner.update(dt) {
                log::error!("execution stopped: {e}");
                self.runner.pause();
                self.status = e.to_string();
            }

            terminal
                .draw(|frame| self.draw(frame))
                .context("Failed to draw frame")?;

            self.check_key_timeout();

            if event::poll(Duration::from_millis(16)).context("Failed to poll terminal events")? {
                if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
                    self.handle_key_event(key);
                }
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn check_key_timeout(&mut self) {
        if let Some((_, time)) = self.key_press
            && time.elapsed() > KEY_RELEASE_TIMEOUT
        {
            self.key_press = None;
            self.runner.set_key(0);
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') if key.kind == KeyEventKind::Press => {
                self.runner.toggle_pause();
                self.status.clear();
            }
            _ => {
                if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                    self.runner.set_key(idx as u8);
                    self.key_press = Some((idx as u8, Instant::now()));
                }
            }
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Check if we have enough space
        const MIN_WIDTH: u16 = DISPLAY_X as u16 + 2 + 17 + 2;
        const MIN_HEIGHT: u16 = DISPLAY_Y as u16 + 2 + 1 + 2;
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let center = area.centered(Constraint::Length(45), Constraint::Length(3));

            Paragraph::new(format!(
                "Terminal is too small ({}x{} min)",
                MIN_WIDTH, MIN_HEIGHT
            ))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(Block::bordered())
            .render(center, buf);

            return;
        }

        let [left, right] = Layout::horizontal([
            Constraint::Min(DISPLAY_X as u16 + 2),
            Constraint::Length(17 + 2),
        ])
        .areas(area);

        let [display, status] = Layout::vertical([
            Constraint::Length(DISPLAY_Y as u16 + 2),
            Constraint::Min(1 + 2),
        ])
        .areas(left);

        let [state, registers, instruction, keypad] = Layout::vertical([
            Constraint::Length(1 + 2),
            Constraint::Length(11 + 2),
            Constraint::Length(2 + 2),
            Constraint::Min(1 + 2),
        ])
        .areas(right);

        self.render_display(display, buf);
        self.render_status(status, buf);
        self.render_state(state, buf);
        self.render_registers(registers, buf);
        self.render_instruction(instruction, buf);
        self.render_key(keypad, buf);
    }
}

impl App {
    fn render_display(&self, area: Rect, buf: &mut Buffer) {
        let text: Vec<Line> = self
            .runner
            .processor()
            .display()
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|pixel| {
                        Span::styled(
                            if *pixel { "█" } else { " " },
                            Style::default().fg(Color::Green),
                        )
                    })
                    .collect()
            })
            .collect();

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Display "))
            .render(area, buf);
    }

    fn render_registers(&self, area: Rect, buf: &mut Buffer) {
        let processor = self.runner.processor();
        let mut lines = Vec::new();

        lines.push(Line::from(format!(
            "PC: {:03X}  I: {:03X}",
            processor.pc(),
            processor.i()
        )));
        lines.push(Line::from(format!("DT: {:02X}", processor.delay_timer())));
        lines.push(Line::from(""));

        let v = processor.registers();
        for idx in 0..8 {
            lines.push(Line::from(format!(
                "V{:X}: {:02X}   V{:X}: {:02X}",
                idx,
                v[idx],
                idx + 8,
                v[idx + 8]
            )));
        }

        Paragraph::new(lines)
            .block(Block::bordered().title(" Registers "))
            .render(area, buf);
    }

    fn render_instruction(&self, area: Rect, buf: &mut Buffer) {
        let lines = match self.runner.processor().current_instruction() {
            Some(ins) => vec![
                Line::from(format!("{:04X}", ins.word)),
                Line::from(ins.to_string()),
            ],
            None => vec![Line::from("----")],
        };

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Instruction "))
            .render(area, buf);
    }

    fn render_key(&self, area: Rect, buf: &mut Buffer) {
        let text = match self.key_press {
            Some((key, _)) => format!("{:X}", key),
            None => "-".to_string(),
        };

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Key "))
            .render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.status.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::bordered().title(" Status "))
            .render(area, buf);
    }

    fn render_state(&self, area: Rect, buf: &mut Buffer) {
        let (text, color) = if self.runner.is_paused() {
            ("PAUSED", Color::Yellow)
        } else if self.runner.processor().is_awaiting_key() {
            ("WAITING KEY", Color::Cyan)
        } else {
            ("RUNNING", Color::Green)
        };

        Paragraph::new(Text::styled(text, Style::default().fg(color)))
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" State "))
            .render(area, buf);
    }
}

/// CHIP-8 virtual machine in the terminal.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Space pauses and resumes, Escape exits.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Instruction behavior preset
    #[arg(long, value_enum, default_value_t = Profile::Legacy)]
    profile: Profile,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_CPU_HZ)]
    cpu_hz: f32,

    /// Seed for the random number generator (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = maybe_hex::<u64>)]
    seed: Option<u64>,

    /// Write log output to this file (filter with RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(path: Option<&Path>) -> anyhow::Result<()> {
    // The terminal belongs to the UI, so logs only go to a file
    let Some(path) = path else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.cpu_hz > 0.0, "--cpu-hz must be positive");

    init_logging(args.log_file.as_deref())?;

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;
    let rng = match args.seed {
        Some(seed) => random::seeded(seed),
        None => random::os_seeded(),
    };
    let processor = Processor::with_config(&rom, args.profile.into(), rng)
        .context("Failed to load ROM into CHIP-8 memory")?;
    log::info!(
        "loaded {} ({} bytes), profile {:?}, {} Hz",
        args.rom_path.display(),
        rom.len(),
        args.profile,
        args.cpu_hz
    );

    let mut app = App::new(processor, args.cpu_hz);

    let mut terminal = ratatui::init();
    let app_result = app.run(&mut terminal);
    ratatui::restore();

    app_result
}
