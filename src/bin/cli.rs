//! Pollcom command line interface: a polling serial terminal.

use std::{
    io::{self, BufRead, Write},
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
    ArgMatches,
};
use console::{style, Term};
use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, trace, Level::Debug, LevelFilter};
use simplelog::*;

use pollcom::{
    self as pc,
    binding::{config_from_value, Serial, NO_DATA},
    transport::{available_ports, SerialPortTransport},
    FlowControl, Value,
};

const POLL_PERIOD: Duration = Duration::from_millis(50);
const STALLED_POLLS: u32 = 4;

fn main() {
    println!("[PC] pollcom v{}", crate_version!());

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Pollcom opens a serial port and polls it: anything received is \
            printed to stdout, as text when it is valid UTF-8 and as a hex \
            dump otherwise. Each line typed on stdin is sent to the device.\n\
            \n\
            The line framing is given as a mnemonic such as `8N1` or `7E2`, \
            or as the packed integer form such as `0x801`.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the tty device to use")
                .long_help(
                    "the tty device to use; when not set, the list of \
                     available ports is presented for selection.",
                )
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("19200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("CONFIG")
                .help("line framing, e.g. 8N1 or 0x801")
                .short("-c")
                .long("--config")
                .takes_value(true)
                .default_value("8N1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FLOW_CONTROL")
                .help("flow control mode")
                .short("-f")
                .long("--flow-control")
                .takes_value(true)
                .possible_values(&["none", "soft", "hard"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("TIMEOUT")
                .help("transport timeout in milliseconds")
                .long("--timeout")
                .takes_value(true)
                .default_value("0")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("LIST")
                .help("list the available ports and exit")
                .short("-l")
                .long("--list"),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'pollcom -v -v -v' or 'pollcom -vvv' vs 'pollcom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("could not initialize logging: {}", e);
    }

    trace!("{:#?}", matches);

    if matches.is_present("LIST") {
        for port in available_ports() {
            println!("{}", port);
        }
        process::exit(0);
    }

    // Arguments with default values ===========================================

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32)
        .unwrap_or_else(|_| invalid_argument(&matches, "BAUD_RATE", "baud-rate"));
    let timeout = value_t!(matches.value_of("TIMEOUT"), u64)
        .unwrap_or_else(|_| invalid_argument(&matches, "TIMEOUT", "timeout"));

    let flow_control = match matches.value_of("FLOW_CONTROL") {
        Some("soft") => FlowControl::Software,
        Some("hard") => FlowControl::Hardware,
        _ => FlowControl::None,
    };

    let config = config_argument(matches.value_of("CONFIG").unwrap_or("8N1"));
    if let Err(e) = config_from_value(&config) {
        println!("{}: {}", style("error").red(), e);
        process::exit(-1);
    }

    // END - Arguments with default values =====================================

    let settings = pc::SettingsBuilder::new()
        .baud_rate(baud_rate)
        .flow_control(flow_control)
        .timeout(Duration::from_millis(timeout))
        .finalize();

    let path = match matches.value_of("DEVICE_TTY") {
        Some(path) => path.to_string(),
        None => match select_port() {
            Some(path) => path,
            None => process::exit(0),
        },
    };

    let mut serial = Serial::new(SerialPortTransport::new(), settings);
    if !serial.open(&path, Some(&config)) {
        println!(
            "{} could not open {}",
            style("❌").red(),
            style(&path).cyan()
        );
        process::exit(1);
    }
    println!(
        "[PC] 👍 {} is open ({}), Ctrl+C to quit",
        style(&path).green(),
        serial.config().unwrap_or_default()
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)) {
        info!("could not install the Ctrl+C handler: {}", e);
    }

    let lines = spawn_stdin_reader();
    let exit_code = terminal(&mut serial, &running, &lines);

    serial.close();
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

/// Poll the device and stdin until interrupted.
fn terminal(
    serial: &mut Serial<SerialPortTransport>,
    running: &AtomicBool,
    lines: &mpsc::Receiver<String>,
) -> i32 {
    let mut stdout = io::stdout();
    let mut stalled = 0;
    while running.load(Ordering::SeqCst) {
        if let Some(text) = serial.read_string() {
            stalled = 0;
            print!("{}", text);
            let _ = stdout.flush();
            if log_enabled!(Debug) {
                dump(text.as_bytes());
            }
        } else if serial.available_for_read() > 0 {
            // Either the start of a character still in transit, or bytes that
            // are not text at all. Give the former a few polls to complete,
            // then show the head byte raw.
            stalled += 1;
            if stalled >= STALLED_POLLS {
                stalled = 0;
                let byte = serial.read();
                if byte != NO_DATA {
                    dump(&[byte as u8]);
                }
            }
        }

        match lines.try_recv() {
            Ok(line) => {
                let errors = serial.write(&[Value::from(line), Value::from("\n")]);
                if errors > 0 {
                    info!("{} values could not be sent", errors);
                }
                serial.flush();
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                // stdin closed, keep listening to the device
            }
        }

        if !serial.is_connected() {
            return 1;
        }
        thread::sleep(POLL_PERIOD);
    }
    println!("🛑 received Ctrl+C!");
    0
}

/// Read stdin lines on a helper thread so that the polling loop never blocks
/// on the terminal.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

fn dump(bytes: &[u8]) {
    let view = HexViewBuilder::new(bytes)
        .address_offset(0)
        .row_width(16)
        .finish();
    println!("{}", view);
}

/// Integers (decimal or `0x` hexadecimal) are passed as packed
/// configurations, anything else as a mnemonic.
fn config_argument(arg: &str) -> Value {
    let parsed = if let Some(hex) = arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else {
        arg.parse::<i64>().ok()
    };
    match parsed {
        Some(value) => Value::Int(value),
        None => Value::from(arg),
    }
}

fn invalid_argument(matches: &ArgMatches, name: &str, long: &str) -> ! {
    println!(
        "{}: `{}` needs to be a numeric value",
        style("error").red(),
        style(long).cyan()
    );
    println!(
        "   {} `{}` is not a valid value",
        style("-->").cyan(),
        style(matches.value_of(name).unwrap_or("")).on_red()
    );
    process::exit(-1);
}

fn select_port() -> Option<String> {
    use dialoguer::{theme::ColorfulTheme, Select};

    let ports = available_ports();
    if ports.is_empty() {
        println!("{} no serial port found", style("❌").red());
        return None;
    }

    let term = Term::buffered_stderr();
    let theme = ColorfulTheme::default();
    let mut select = Select::with_theme(&theme);
    select.with_prompt("Select a port to be used");
    for item in &ports {
        select.item(item);
    }

    let selection = select.default(0).interact_on_opt(&term).ok()??;
    ports
        .get(selection)
        .and_then(|p| p.split(':').next())
        .map(String::from)
}
