// ============================================
// region-tools - сервер и консольный клиент
// ============================================

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};

use region_tools::blocks::Material;
use region_tools::config::ServerConfig;
use region_tools::control::{ControlState, Mode};
use region_tools::network::{Client, ProtocolError, Server, ServerMessage};
use region_tools::template::{Mirror, Rotation};
use region_tools::world::BlockPos;

#[derive(Parser, Debug)]
#[command(name = "region-tools", about = "Region control blocks: box, fill, copy and paste")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Запустить сервер
    Serve(ServeArgs),
    /// Отправить снимок блока управления
    Sync(SyncArgs),
    /// Измерить регион между двумя точками
    Measure {
        #[command(flatten)]
        conn: ConnArgs,
        #[arg(long, value_parser = parse_pos)]
        first: BlockPos,
        #[arg(long, value_parser = parse_pos)]
        second: BlockPos,
    },
    /// Залить регион между двумя точками
    Fill {
        #[command(flatten)]
        conn: ConnArgs,
        #[arg(long, value_parser = parse_pos)]
        first: BlockPos,
        #[arg(long, value_parser = parse_pos)]
        second: BlockPos,
        #[arg(long)]
        material: Material,
    },
    /// Поставить блок управления
    Place {
        #[command(flatten)]
        conn: ConnArgs,
        #[arg(long, value_parser = parse_pos)]
        pos: BlockPos,
    },
    /// Убрать блок управления
    Remove {
        #[command(flatten)]
        conn: ConnArgs,
        #[arg(long, value_parser = parse_pos)]
        pos: BlockPos,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// JSON конфиг; флаги ниже его перекрывают
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    world_file: Option<PathBuf>,
    #[arg(long)]
    controls_file: Option<PathBuf>,
    #[arg(long)]
    template_dir: Option<PathBuf>,
    #[arg(long)]
    save_interval_secs: Option<u64>,
    /// Можно повторять
    #[arg(long = "operator")]
    operators: Vec<String>,
}

#[derive(Args, Debug)]
struct ConnArgs {
    #[arg(long, default_value = "127.0.0.1:25580")]
    server: String,
    #[arg(long, default_value = "console")]
    name: String,
    /// Сколько ждать ответов сервера, мс
    #[arg(long, default_value_t = 1500)]
    wait_ms: u64,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(flatten)]
    conn: ConnArgs,
    #[arg(long, value_parser = parse_pos)]
    anchor: BlockPos,
    #[arg(long, value_enum, default_value_t = ModeArg::Box)]
    mode: ModeArg,
    #[arg(long, value_parser = parse_pos, default_value = "0,0,0")]
    size: BlockPos,
    #[arg(long, value_parser = parse_pos, default_value = "0,0,0")]
    offset: BlockPos,
    #[arg(long)]
    filler: Option<Material>,
    #[arg(long)]
    template: Option<String>,
    /// 0, 90, 180 или 270 (по часовой)
    #[arg(long, default_value_t = 0, value_parser = parse_rotation)]
    rotation: u16,
    #[arg(long, value_enum, default_value_t = MirrorArg::None)]
    mirror: MirrorArg,
    /// Выполнить действие режима
    #[arg(long)]
    perform: bool,
    /// Только подготовить область (PASTE)
    #[arg(long)]
    preview: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Box,
    Fill,
    Copy,
    Paste,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Box => Mode::Box,
            ModeArg::Fill => Mode::Fill,
            ModeArg::Copy => Mode::Copy,
            ModeArg::Paste => Mode::Paste,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MirrorArg {
    None,
    LeftRight,
    FrontBack,
}

impl From<MirrorArg> for Mirror {
    fn from(mirror: MirrorArg) -> Self {
        match mirror {
            MirrorArg::None => Mirror::None,
            MirrorArg::LeftRight => Mirror::LeftRight,
            MirrorArg::FrontBack => Mirror::FrontBack,
        }
    }
}

fn parse_pos(raw: &str) -> Result<BlockPos, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [x, y, z] = <[&str; 3]>::try_from(parts).map_err(|_| format!("expected x,y,z, got {:?}", raw))?;
    let axis = |v: &str| v.parse::<i32>().map_err(|e| format!("bad coordinate {:?}: {}", v, e));
    Ok(BlockPos::new(axis(x)?, axis(y)?, axis(z)?))
}

fn parse_rotation(raw: &str) -> Result<u16, String> {
    let degrees: u16 = raw.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    if !Rotation::ALL.iter().any(|r| r.degrees() == degrees) {
        return Err(format!("rotation must be 0, 90, 180 or 270, got {}", degrees));
    }
    Ok(degrees)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args),
        Command::Sync(args) => {
            let rotation = Rotation::ALL
                .into_iter()
                .find(|r| r.degrees() == args.rotation)
                .unwrap_or(Rotation::None);
            let mut state = ControlState {
                mode: args.mode.into(),
                size: args.size,
                offset: args.offset,
                filler: args.filler,
                rotation,
                mirror: args.mirror.into(),
                ..ControlState::default()
            };
            state.set_template_name(args.template.as_deref().unwrap_or(""));

            let mut client = connect(&args.conn)?;
            client.send_control(args.anchor, &state, args.perform, args.preview)?;
            print_replies(&mut client, &args.conn)
        }
        Command::Measure { conn, first, second } => {
            let mut client = connect(&conn)?;
            client.measure(first, second)?;
            print_replies(&mut client, &conn)
        }
        Command::Fill {
            conn,
            first,
            second,
            material,
        } => {
            let mut client = connect(&conn)?;
            client.wand_fill(first, second, &material)?;
            print_replies(&mut client, &conn)
        }
        Command::Place { conn, pos } => {
            let mut client = connect(&conn)?;
            client.place_control(pos)?;
            print_replies(&mut client, &conn)
        }
        Command::Remove { conn, pos } => {
            let mut client = connect(&conn)?;
            client.remove_control(pos)?;
            print_replies(&mut client, &conn)
        }
    }
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load_from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(path) = args.world_file {
        config.world_file = path;
    }
    if let Some(path) = args.controls_file {
        config.controls_file = path;
    }
    if let Some(dir) = args.template_dir {
        config.template_dir = dir;
    }
    if let Some(secs) = args.save_interval_secs {
        config.save_interval_secs = secs;
    }
    if !args.operators.is_empty() {
        config.operators = args.operators;
    }
    if config.fill_chunk_edge < 1 {
        bail!("fill_chunk_edge must be positive, got {}", config.fill_chunk_edge);
    }

    let server = Server::bind(config)?;
    let shutdown = server.shutdown_handle();
    // Консоль: `stop` останавливает сервер и сохраняет мир
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim() == "stop" => {
                    log::info!("[SERVER] Stop requested from console");
                    shutdown.request();
                    break;
                }
                Ok(line) if !line.trim().is_empty() => {
                    log::warn!("[SERVER] Unknown console command '{}'", line.trim());
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    server.run()?;
    Ok(())
}

fn connect(conn: &ConnArgs) -> anyhow::Result<Client> {
    let mut client =
        Client::connect(conn.server.as_str()).with_context(|| format!("cannot connect to {}", conn.server))?;
    client.set_read_timeout(Some(Duration::from_millis(conn.wait_ms.max(1))))?;
    client.hello(&conn.name)?;
    Ok(client)
}

/// Печатать ответы, пока сервер молчит меньше wait_ms
fn print_replies(client: &mut Client, conn: &ConnArgs) -> anyhow::Result<()> {
    loop {
        let message = match client.recv() {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(()),
            Err(ProtocolError::Io(e)) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(());
            }
            Err(e) => return Err(e).with_context(|| format!("reading from {}", conn.server)),
        };

        match message {
            ServerMessage::Welcome { operator } => {
                log::debug!("[CLIENT] Welcome (operator: {})", operator);
            }
            ServerMessage::Notice { severity, text } => println!("[{:?}] {}", severity, text),
            ServerMessage::ControlSnapshot { anchor, state } => {
                println!(
                    "control {}: {} size {} offset {} rotation {} mirror {:?}",
                    anchor,
                    state.mode.name(),
                    state.size,
                    state.offset,
                    state.rotation.degrees(),
                    state.mirror
                );
            }
            ServerMessage::ControlRemoved { anchor } => println!("control {} removed", anchor),
        }
    }
}
