use crossbeam_channel::{unbounded, Receiver, Sender};
use hrv_monitor::config::Config;
use hrv_monitor::connection::{ConnectionCommand, ConnectionManager};
use hrv_monitor::device_scanner::{self, BluetoothDevice};
use hrv_monitor::monitor::{Monitor, MonitorOutput, SessionReport};
use hrv_monitor::sensor::{ConnectionStatus, SensorUpdate};
use hrv_monitor::session::{format_elapsed, Tag, TagColor};
use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Could not load config, using defaults: {}", e);
            Config::default()
        }
    };

    // Channel for communication between the data collection thread and the monitor loop
    let (sensor_sender, sensor_receiver) = unbounded::<SensorUpdate>();

    // Create the connection manager in its own thread
    let (manager, connect_sender) = ConnectionManager::new(sensor_sender, config.scan_duration_secs);
    std::thread::spawn(move || {
        manager.run();
    });

    // Stdin command thread
    let (line_sender, line_receiver) = unbounded::<String>();
    std::thread::spawn(move || {
        read_stdin_lines(line_sender);
    });

    // 1-second timer for elapsed-time bookkeeping
    let (tick_sender, tick_receiver) = unbounded::<()>();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(1));
        if tick_sender.send(()).is_err() {
            break;
        }
    });

    println!("hrv-monitor - type 'help' for commands");

    let mut shell = Shell {
        monitor: Monitor::new(),
        config,
        connect_sender,
        devices: Vec::new(),
    };

    if shell.config.enable_autoconnect {
        shell.autoconnect();
    }

    run_loop(&mut shell, &sensor_receiver, &line_receiver, &tick_receiver);
}

struct Shell {
    monitor: Monitor,
    config: Config,
    connect_sender: mpsc::Sender<ConnectionCommand>,
    devices: Vec<BluetoothDevice>,
}

fn read_stdin_lines(sender: Sender<String>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                if sender.send(line).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    // EOF behaves like quit
    let _ = sender.send("quit".to_string());
}

fn run_loop(
    shell: &mut Shell,
    updates: &Receiver<SensorUpdate>,
    lines: &Receiver<String>,
    ticks: &Receiver<()>,
) {
    loop {
        crossbeam_channel::select! {
            recv(updates) -> update => {
                match update {
                    Ok(update) => shell.handle_sensor_update(update),
                    Err(_) => break,
                }
            }
            recv(lines) -> line => {
                match line {
                    Ok(line) => {
                        if !shell.handle_command(line.trim()) {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            recv(ticks) -> tick => {
                match tick {
                    Ok(()) => shell.monitor.tick(),
                    Err(_) => break,
                }
            }
        }
    }

    let _ = shell.connect_sender.send(ConnectionCommand::Disconnect);
}

impl Shell {
    fn handle_sensor_update(&mut self, update: SensorUpdate) {
        match self.monitor.handle_update(update) {
            Some(MonitorOutput::Live(tick)) => {
                let hrv = match self.monitor.session().last_hrv() {
                    Some(score) => format!("{:.2}", score),
                    None => "--".to_string(),
                };
                println!(
                    "{}  HR {:>3} bpm  HRV {}",
                    format_elapsed(self.monitor.elapsed_secs()),
                    tick.bpm,
                    hrv
                );
            }
            Some(MonitorOutput::Status(status)) => match status {
                ConnectionStatus::Connecting => println!("Connecting..."),
                ConnectionStatus::Connected => println!("Connected. Streaming heart rate."),
                ConnectionStatus::Disconnected => println!("Disconnected."),
                ConnectionStatus::Error(e) => println!("Connection error: {}", e),
            },
            Some(MonitorOutput::SessionEnded(report)) => print_report(&report),
            None => {}
        }
    }

    /// Returns false when the shell should exit.
    fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "" => {}
            "help" => print_help(),
            "scan" => self.scan(),
            "connect" => self.connect(rest),
            "tag" => self.tag(rest),
            "comment" => self.comment(rest),
            "pause" => {
                let _ = self.connect_sender.send(ConnectionCommand::Pause);
                self.monitor.set_paused(true);
                println!("Paused.");
            }
            "resume" => {
                let _ = self.connect_sender.send(ConnectionCommand::Resume);
                self.monitor.set_paused(false);
                println!("Resumed.");
            }
            "stop" => {
                let _ = self.connect_sender.send(ConnectionCommand::Disconnect);
            }
            "quit" => return false,
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
        true
    }

    fn scan(&mut self) {
        println!(
            "Scanning for heart rate devices ({} s)...",
            self.config.scan_duration_secs
        );
        match block_on_scan(self.config.scan_duration_secs) {
            Ok(devices) => {
                if devices.is_empty() {
                    println!("No heart rate devices found.");
                }
                for (i, device) in devices.iter().enumerate() {
                    println!("  [{}] {} ({})", i, device.name, device.id);
                }
                self.devices = devices;
            }
            Err(e) => println!("Scan failed: {}", e),
        }
    }

    fn connect(&mut self, arg: &str) {
        if arg.is_empty() {
            println!("Usage: connect <index|device-id>");
            return;
        }

        // Accept either an index into the last scan or a raw device id
        let device_id = match arg.parse::<usize>() {
            Ok(index) => match self.devices.get(index) {
                Some(device) => device.id.clone(),
                None => {
                    println!("No device at index {}. Run 'scan' first.", index);
                    return;
                }
            },
            Err(_) => arg.to_string(),
        };

        if let Err(e) = self
            .connect_sender
            .send(ConnectionCommand::Connect(device_id))
        {
            println!("Failed to send connection request: {}", e);
        }
    }

    fn tag(&mut self, rest: &str) {
        let mut parts = rest.splitn(3, ' ');
        let color = parts.next().unwrap_or("").trim();
        let label = parts.next().unwrap_or("").trim();
        let comments = parts.next().unwrap_or("").trim();

        let Some(color) = TagColor::from_name(color) else {
            println!("Usage: tag <red|green|blue|orange|purple> <label> [comments]");
            return;
        };
        if label.is_empty() {
            println!("Usage: tag <color> <label> [comments]");
            return;
        }

        self.monitor.add_tag(color, label, comments);
        println!(
            "Tagged '{}' at {}.",
            label,
            format_elapsed(self.monitor.elapsed_secs())
        );
    }

    fn comment(&mut self, rest: &str) {
        let mut parts = rest.splitn(2, ' ');
        let index = parts.next().unwrap_or("").trim().parse::<usize>();
        let text = parts.next().unwrap_or("").trim();

        match index {
            Ok(index) if self.monitor.edit_tag_comments(index, text) => {
                println!("Updated tag {}.", index);
            }
            Ok(index) => println!("No tag {}.", index),
            Err(_) => println!("Usage: comment <tag-index> <text>"),
        }
    }

    fn autoconnect(&mut self) {
        println!("Autoconnect enabled, scanning...");
        match block_on_scan(self.config.scan_duration_secs) {
            Ok(devices) if !devices.is_empty() => {
                let device = devices[0].clone();
                println!("Autoconnecting to {} ({})", device.name, device.id);
                self.devices = devices;
                let _ = self
                    .connect_sender
                    .send(ConnectionCommand::Connect(device.id));
            }
            Ok(_) => println!("Autoconnect: no heart rate devices found."),
            Err(e) => println!("Autoconnect scan failed: {}", e),
        }
    }
}

/// Discovery is the one async operation driven from the shell thread; a
/// short-lived runtime keeps the scan self-contained.
fn block_on_scan(
    scan_duration_secs: u64,
) -> Result<Vec<BluetoothDevice>, Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let devices = rt.block_on(device_scanner::scan_devices(scan_duration_secs))?;
    Ok(devices)
}

fn print_help() {
    println!("Commands:");
    println!("  scan                       discover heart rate devices");
    println!("  connect <index|id>         connect and start a session");
    println!("  tag <color> <label> [txt]  annotate the current moment");
    println!("  comment <n> <text>         edit the comments of tag n");
    println!("  pause | resume             suspend / resume the stream");
    println!("  stop                       end the session (prints summary)");
    println!("  quit                       exit");
}

fn print_report(report: &SessionReport) {
    println!();
    println!("=== Session summary ({}) ===", format_elapsed(report.duration_secs));

    let Some(summary) = &report.summary else {
        println!("No data recorded.");
        return;
    };

    let hr = &summary.heart_rate;
    println!("Heart rate: avg {:.2} bpm", hr.average);
    println!(
        "            max {:.0} bpm (sample {}), min {:.0} bpm (sample {})",
        hr.max.value, hr.max.index, hr.min.value, hr.min.index
    );

    match &summary.hrv {
        Some(hrv) => {
            println!("HRV score:  avg {:.2}", hrv.average);
            println!(
                "            max {:.2} (sample {})",
                hrv.max.value, hrv.max.index
            );
            match &hrv.min {
                Some(min) => println!("            min {:.2} (sample {})", min.value, min.index),
                None => println!("            min n/a (no non-zero samples)"),
            }
            println!(
                "            first 5 min avg {:.2}, last 5 min avg {:.2}",
                hrv.opening_average, hrv.closing_average
            );
        }
        None => println!("HRV score:  no samples (insufficient RR data)"),
    }

    if !report.tags.is_empty() {
        println!("Tags:");
        for (i, tag) in report.tags.iter().enumerate() {
            print_tag(i, tag);
        }
    }
}

fn print_tag(index: usize, tag: &Tag) {
    let hr = tag
        .heart_rate
        .map(|bpm| bpm.to_string())
        .unwrap_or_else(|| "--".to_string());
    let hrv = tag
        .hrv
        .map(|score| format!("{:.2}", score))
        .unwrap_or_else(|| "--".to_string());
    println!(
        "  [{}] {}  HR {}  HRV {}  {} ({})  {}",
        index,
        tag.time,
        hr,
        hrv,
        tag.label,
        tag.color.name(),
        tag.comments
    );
}
