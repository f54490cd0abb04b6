use clap::{Parser, Subcommand, ValueEnum};
use eyre::{bail, Result};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use atmodem::{
    modem::Modem, profile::DeviceProfile, Air780, DeliveryClass, Generic, Sim7600,
    SmsGroup, Status,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(
        short = 'd',
        long = "device",
        default_value = "/dev/ttyUSB2",
        help = "Path to the modem serial device"
    )]
    device: String,

    #[arg(
        short = 'b',
        long = "baudrate",
        default_value_t = 115_200,
        help = "Serial baud rate"
    )]
    baudrate: u32,

    #[arg(
        short = 'p',
        long = "profile",
        value_enum,
        default_value_t = Profile::Generic,
        help = "Device profile"
    )]
    profile: Profile,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Generic,
    Sim7600,
    Air780,
}

impl Profile {
    fn build(self) -> Box<dyn DeviceProfile> {
        match self {
            Profile::Generic => Box::new(Generic),
            Profile::Sim7600 => Box::new(Sim7600),
            Profile::Air780 => Box::new(Air780),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print device identity (manufacturer, model, version, IMEI, ...)
    Info,
    /// Print signal quality
    Signal,
    /// Scan for visible network operators (slow)
    Operators,
    /// List configured PDP contexts and addresses
    Contexts,
    /// Send a text message
    Send {
        number: String,
        message: String,
        #[arg(long, help = "Send as a class 0 flash message")]
        flash: bool,
    },
    /// List stored text messages
    List {
        #[arg(value_enum, default_value_t = Group::Unread)]
        group: Group,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Group {
    Unread,
    Read,
    All,
}

impl From<Group> for SmsGroup {
    fn from(group: Group) -> Self {
        match group {
            Group::Unread => SmsGroup::Unread,
            Group::Read => SmsGroup::Read,
            Group::All => SmsGroup::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Initializing modem on {}", cli.device);
    let mut modem = Modem::open(&cli.device, cli.baudrate, cli.profile.build())?;
    if modem.sync_baudrate(false)? != Status::Ok {
        bail!("baudrate sync failed; check the device path and baud rate");
    }

    match cli.command {
        Command::Info => {
            println!("Manufacturer: {}", modem.manufacturer()?);
            println!("Model: {}", modem.model()?);
            println!("Version: {}", modem.version()?);
            println!("IMEI: {}", modem.imei()?);
            println!("IMSI: {}", modem.imsi()?);
            println!("Serial: {}", modem.serial()?);
            println!("ICCID: {}", modem.iccid()?);
        }
        Command::Signal => {
            let signal = modem.signal_quality()?;
            println!("RSSI: {}", signal.rssi);
            println!("BER: {}", signal.ber);
            println!("Quality: {:.0}%", signal.quality_percent());
            if let Ok(lte) = modem.lte_signal() {
                println!(
                    "RSRP: {} dBm, RSRQ: {} dB ({}/5, {})",
                    lte.rsrp_dbm(),
                    lte.rsrq_db(),
                    lte.bars(),
                    lte.tier()
                );
            }
        }
        Command::Operators => {
            for op in modem.scan_operators()? {
                println!(
                    "{} ({}) numeric={} stat={}",
                    op.long, op.short, op.numeric, op.stat
                );
            }
        }
        Command::Contexts => {
            for ctx in modem.contexts()? {
                println!(
                    "{}: {} apn={:?} value={:?}",
                    ctx.id, ctx.context_type, ctx.apn, ctx.value
                );
            }
            for addr in modem.addresses()? {
                println!("{}: ip={:?}", addr.id, addr.ip);
            }
        }
        Command::Send {
            number,
            message,
            flash,
        } => {
            let class = if flash {
                DeliveryClass::Flash
            } else {
                DeliveryClass::Normal
            };
            let status = modem.send_sms(&number, &message, class)?;
            if status != Status::Ok {
                bail!("sending failed: {status}");
            }
            println!("Sent.");
        }
        Command::List { group } => {
            for record in modem.receive_sms(group.into())? {
                println!(
                    "{} {} {}\n  {}",
                    record.date, record.time, record.sender, record.body
                );
            }
        }
    }

    Ok(())
}
