// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchgate::config::{self, Interceptor};
use touchgate::controller;
use touchgate::midi;
use touchgate::session::Session;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=aftertouch note gate

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/touchgate
ExecStart=/usr/local/bin/touchgate start --no-keyboard "$TOUCHGATE_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=touchgate.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Turns polyphonic aftertouch into notes and filters release bounce."
)]
struct Cli {
    /// Logs every incoming and outgoing event.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI input/output devices.
    Devices {},
    /// Starts intercepting events from the input device.
    Start {
        /// The path to the configuration file. Flags override values from the file.
        config_path: Option<PathBuf>,
        /// The MIDI device to read from.
        #[arg(short, long)]
        input: Option<String>,
        /// The MIDI device to write to.
        #[arg(short, long)]
        output: Option<String>,
        /// The pressure threshold (1-20).
        #[arg(short, long)]
        threshold: Option<u8>,
        /// Pass pressure through for notes that were genuinely played. Takes an optional
        /// true or false to override the config file.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        pass_polytouch: Option<bool>,
        /// Enable release bounce detection. Takes an optional true or false to override the
        /// config file.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        bounce: Option<bool>,
        /// How long to wait between polls of the input, e.g. 5ms (1ms-10ms).
        #[arg(long)]
        poll_interval: Option<String>,
        /// Don't read commands from stdin. Stop with Ctrl-C instead.
        #[arg(long)]
        no_keyboard: bool,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Devices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start {
            config_path,
            input,
            output,
            threshold,
            pass_polytouch,
            bounce,
            poll_interval,
            no_keyboard,
        } => {
            let overrides = Interceptor::new(
                input,
                output,
                threshold,
                pass_polytouch,
                bounce,
                poll_interval,
            );
            let resolved = config::resolve(config_path.as_deref(), overrides)?;
            let mut session = Session::start(
                resolved.input,
                resolved.output,
                resolved.settings.clone(),
            )?;

            if no_keyboard {
                tokio::signal::ctrl_c().await?;
                session.stop();
                return Ok(());
            }

            let keyboard = controller::Driver::new(resolved.settings).monitor_events();
            tokio::select! {
                result = keyboard => {
                    session.stop();
                    result??;
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    session.stop();
                    // The keyboard driver is still blocked on stdin and would keep the
                    // runtime from shutting down.
                    info!("Interrupted.");
                    std::process::exit(0);
                }
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::{Cli, Commands};

    fn toggles(args: &[&str]) -> (Option<bool>, Option<bool>) {
        let mut argv = vec!["touchgate", "start"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).map(|cli| cli.command) {
            Ok(Commands::Start {
                pass_polytouch,
                bounce,
                ..
            }) => (pass_polytouch, bounce),
            _ => panic!("unable to parse start command {:?}", args),
        }
    }

    #[test]
    fn toggles_can_be_set_either_way() {
        assert_eq!((None, None), toggles(&[]));
        assert_eq!(
            (Some(true), Some(true)),
            toggles(&["--pass-polytouch", "--bounce"])
        );
        assert_eq!(
            (Some(false), Some(false)),
            toggles(&["--pass-polytouch", "false", "--bounce", "false"])
        );
        assert_eq!(
            (None, Some(false)),
            toggles(&["--bounce=false", "touchgate.yaml"])
        );
    }
}
