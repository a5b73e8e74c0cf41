//! Run a command batch against one Cisco IOS device.
//!
//! Show commands run first, then the remaining lines as one configuration
//! block. `write memory` anywhere in the list saves the configuration.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example run_batch -- --host 192.168.122.2 --user admin --password cisco \
//!     --secret class "show ip interface brief" "interface Gi0/1" "no shutdown"
//!
//! # Apply the VLAN sub-interface template
//! cargo run --example run_batch -- --host 192.168.122.2 --user admin --password cisco \
//!     --template vlan_config vlan_id=10 ip_address=10.0.10.1 subnet_mask=255.255.255.0
//! ```

use std::env;
use std::time::Duration;

use netpilot::session::{
    DeviceCredentials, DeviceSlot, ExecuteOptions, SessionConfig, SessionKey, SessionManager,
    SshConnector,
};
use netpilot::template::{self, Fields};
use netpilot::transport::HostKeyVerification;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let commands = match &args.template {
        Some(name) => template::find(name)?.render(&args.fields)?,
        None => args.commands.clone(),
    };
    if commands.is_empty() {
        eprintln!("Error: no commands given");
        std::process::exit(1);
    }

    println!("=== netpilot batch ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let config = SessionConfig {
        connect_timeout: Duration::from_secs(args.timeout),
        host_key_verification: HostKeyVerification::Disabled,
        ..SessionConfig::default()
    };
    let manager = SessionManager::new(SshConnector::new(config));
    let key = SessionKey::new("cli", DeviceSlot::Adhoc);

    let mut credentials = DeviceCredentials::new(&args.host, &args.user, &args.password)
        .with_port(args.port);
    if let Some(secret) = &args.secret {
        credentials = credentials.with_secret(secret);
    }

    let summary = manager.connect(key.clone(), credentials).await?;
    println!("Connected! Prompt: {} ({})\n", summary.prompt, summary.enable_status);

    let options = ExecuteOptions {
        save_config: args.save,
    };
    let result = manager.execute(&key, &commands, options).await?;

    println!("{}", result.combined_output);
    for error in &result.errors {
        println!("! {}: {}", error.command, error.message);
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }

    manager.disconnect(&key).await;
    println!("\nDone!");
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: String,
    secret: Option<String>,
    timeout: u64,
    save: bool,
    template: Option<String>,
    fields: Fields,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "192.168.122.2".to_string();
        let mut port = 22u16;
        let mut user = "admin".to_string();
        let mut password = env::var("NETPILOT_PASSWORD").unwrap_or_default();
        let mut secret = env::var("NETPILOT_SECRET").ok();
        let mut timeout = 30u64;
        let mut save = false;
        let mut template = None;
        let mut rest = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = args[i].clone();
                    }
                }
                "--secret" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        secret = Some(args[i].clone());
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--template" => {
                    i += 1;
                    if i < args.len() {
                        template = Some(args[i].clone());
                    }
                }
                "--save" => save = true,
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => rest.push(other.to_string()),
            }
            i += 1;
        }

        // With a template, positional arguments are `name=value` fields.
        let mut fields = Fields::new();
        let mut commands = Vec::new();
        for arg in rest {
            match (&template, arg.split_once('=')) {
                (Some(_), Some((name, value))) => {
                    fields.insert(name.to_string(), value.to_string());
                }
                _ => commands.push(arg),
            }
        }

        Self {
            host,
            port,
            user,
            password,
            secret,
            timeout,
            save,
            template,
            fields,
            commands,
        }
    }

    fn print_help() {
        println!("Usage: run_batch [OPTIONS] [COMMAND...]");
        println!();
        println!("Options:");
        println!("  -h, --host <HOST>        Device address [default: 192.168.122.2]");
        println!("  -p, --port <PORT>        SSH port [default: 22]");
        println!("  -u, --user <USER>        Username [default: admin]");
        println!("  -P, --password <PASS>    Password [env: NETPILOT_PASSWORD]");
        println!("  -s, --secret <SECRET>    Enable secret [env: NETPILOT_SECRET]");
        println!("  -t, --timeout <SECS>     Connect timeout [default: 30]");
        println!("      --template <NAME>    Render a named template from name=value fields");
        println!("      --save               Save the configuration afterwards");
        println!("      --help               Print help");
    }
}
