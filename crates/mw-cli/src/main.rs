use clap::{Args as ClapArgs, Parser, Subcommand};
use mw_core::edit::{CloudTemplate, WeatherBlockStrategy, WeatherEdit};
use mw_core::path::{self, KeyPath};
use mw_core::{LiteralNode, Settings, TemplateSource, settings, templates, writer};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mw-cli",
    about = "Randomize or set the weather, date and start time of DCS .miz missions",
    version
)]
struct Cli {
    /// Log stage-by-stage progress
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Draw a random edit from settings.json and apply it
    Randomize(RandomizeArgs),
    /// Apply an explicit edit
    Set(SetArgs),
    /// Replace only the weather block with a template file (legacy mode)
    Template(TemplateArgs),
    /// Print the value at a dotted path (e.g. date.Month)
    Get(PathArgs),
    /// List children at a dotted path
    List(PathArgs),
}

#[derive(ClapArgs, Debug)]
struct RandomizeArgs {
    /// .miz container to rewrite in place
    miz: PathBuf,
    /// Settings file (defaults to settings.json next to the executable)
    #[arg(long)]
    settings: Option<PathBuf>,
    /// How the weather block is replaced: structural or textual
    #[arg(long, default_value = "structural")]
    strategy: WeatherBlockStrategy,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    /// .miz container to rewrite in place
    miz: PathBuf,
    #[arg(long)]
    day: u32,
    #[arg(long)]
    month: u32,
    /// Start time in seconds after midnight; left untouched when omitted
    #[arg(long)]
    time: Option<u32>,
    /// Weather template file (a ["weather"] block); weather is left alone when omitted
    #[arg(long)]
    template: Option<PathBuf>,
    /// Cloud preset name; needs --thickness, --density and --base
    #[arg(long, requires = "thickness")]
    preset: Option<String>,
    #[arg(long, requires_all = ["density", "base"])]
    thickness: Option<i32>,
    #[arg(long, requires = "thickness")]
    density: Option<i32>,
    /// Precipitation code (iprecptns), 0 when omitted
    #[arg(long, requires = "thickness")]
    precipitation: Option<i32>,
    #[arg(long, requires = "thickness")]
    base: Option<i32>,
    #[arg(long, default_value = "structural")]
    strategy: WeatherBlockStrategy,
}

#[derive(ClapArgs, Debug)]
struct TemplateArgs {
    /// .miz container to rewrite in place
    miz: PathBuf,
    /// Template file name inside the template directory; random when omitted
    #[arg(long)]
    name: Option<String>,
    /// Template directory (defaults to weather-templates next to the executable)
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct PathArgs {
    /// .miz container or extracted mission file
    file: PathBuf,
    /// Dotted path below the mission root; empty for the root
    #[arg(long, default_value = "")]
    path: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Cmd::Randomize(a) => cmd_randomize(a),
        Cmd::Set(a) => cmd_set(a),
        Cmd::Template(a) => cmd_template(a),
        Cmd::Get(a) => cmd_get(a),
        Cmd::List(a) => cmd_list(a),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn cmd_randomize(args: RandomizeArgs) {
    let settings_path = args
        .settings
        .unwrap_or_else(|| exe_dir().join(settings::SETTINGS_FILE));
    let settings = Settings::load(&settings_path).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    let edit = settings.random_edit(&mut rand::rng()).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    run_set_weather(&args.miz, &edit, args.strategy);
}

fn cmd_set(args: SetArgs) {
    let weather_template = args.template.map(|path| {
        templates::read_template(&path).unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            std::process::exit(2);
        })
    });
    let clouds = match (args.thickness, args.density, args.base) {
        (Some(thickness), Some(density), Some(base)) => Some(CloudTemplate {
            preset: args.preset,
            thickness,
            density,
            precipitation: args.precipitation.unwrap_or(0),
            base,
        }),
        _ => None,
    };
    let edit = WeatherEdit {
        day: args.day,
        month: args.month,
        start_time: args.time,
        weather_template,
        clouds,
    };
    run_set_weather(&args.miz, &edit, args.strategy);
}

fn run_set_weather(miz: &Path, edit: &WeatherEdit, strategy: WeatherBlockStrategy) {
    if let Err(e) = mw_core::set_weather(miz, edit, strategy) {
        eprintln!("error: {}", e);
        std::process::exit(3);
    }
}

fn cmd_template(args: TemplateArgs) {
    let dir = match args.dir {
        Some(d) => d,
        None => templates::default_template_dir().unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }),
    };
    let source = match args.name {
        Some(n) => TemplateSource::Named(n),
        None => TemplateSource::Random,
    };
    if let Err(e) = mw_core::set_weather_from_dir(&args.miz, &dir, &source, &mut rand::rng()) {
        eprintln!("error: {}", e);
        std::process::exit(3);
    }
}

fn cmd_get(args: PathArgs) {
    let doc = mw_core::load_mission(&args.file).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    let key_path = KeyPath::parse(&args.path);
    if key_path.is_root() {
        print!("{}", writer::serialize(&doc.root, &doc.name));
        return;
    }
    match path::get(&doc.root, key_path.keys()) {
        Ok(LiteralNode::Table(t)) => print!("{}", writer::serialize(t, &key_path.to_string())),
        Ok(scalar) => println!("{}", writer::render_scalar(scalar).unwrap_or_default()),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(3);
        }
    }
}

fn cmd_list(args: PathArgs) {
    let doc = mw_core::load_mission(&args.file).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    let key_path = KeyPath::parse(&args.path);
    match path::list_children(&doc.root, key_path.keys()) {
        Ok(children) => {
            for c in children {
                println!(
                    "{}\t{}{}",
                    c.key,
                    c.kind,
                    c.len.map(|n| format!("\t(len={})", n)).unwrap_or_default()
                );
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(3);
        }
    }
}
