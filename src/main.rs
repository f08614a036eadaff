//! Lanelet Map Repair.
//!
//! Kommandozeilen-Werkzeug zum Reparieren und Transformieren von
//! Lanelet2-Karten im OSM-Format.

use anyhow::Context;
use clap::{Parser, Subcommand};
use lanelet_map_repair::{JobFile, MapCommand, MapSession, RepairOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optionen-Datei (TOML); Standard: neben der Binary
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Zieldatei; Standard: Eingabedatei überschreiben
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Ergebnis-Report als JSON auf stdout ausgeben
    #[arg(long, global = true)]
    report: bool,

    /// Eingabedatei (Lanelet2 OSM)
    file: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Doppelte Mittellinien erkennen und reparieren
    FixDoubled,
    /// Punkte mit gleicher Koordinate zusammenführen
    DedupPoints,
    /// Ways mit gleichen Endpunkten zusammenführen
    DedupWays,
    /// Unreferenzierte Punkte löschen
    RemoveOrphans,
    /// Ein Lanelet nach Distanz teilen
    Split {
        #[arg(long)]
        lanelet: u64,
        /// Ziel-Segmentlänge in Metern
        #[arg(long)]
        distance: Option<f64>,
    },
    /// Alle überlangen Lanelets teilen
    SplitOverlong {
        #[arg(long)]
        distance: Option<f64>,
    },
    /// Lanelet-Längen ausgeben
    Lengths,
    /// Alle Koordinaten in Grad verschieben
    Offset {
        #[arg(long, allow_negative_numbers = true)]
        d_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        d_lon: f64,
    },
    /// Alle Koordinaten in Metern verschieben
    OffsetMeters {
        #[arg(long, allow_negative_numbers = true)]
        east: f64,
        #[arg(long, allow_negative_numbers = true)]
        north: f64,
        #[arg(long, allow_negative_numbers = true)]
        reference_lat: Option<f64>,
    },
    /// Lanelets umkehren (ohne IDs: alle)
    Reverse {
        #[arg(long, value_delimiter = ',')]
        lanelets: Vec<u64>,
    },
    /// Ein Lanelet samt Rand-Ways entfernen
    RemoveLanelet {
        #[arg(long)]
        lanelet: u64,
    },
    /// Alle Lanelets außer den angegebenen entfernen
    RemoveLanelets {
        #[arg(long, value_delimiter = ',', required = true)]
        keep: Vec<u64>,
    },
    /// Punkte löschen
    RemovePoints {
        #[arg(long, value_delimiter = ',', required = true)]
        points: Vec<u64>,
    },
    /// Punkt `remove` in Punkt `keep` überführen
    MergePoint {
        #[arg(long)]
        keep: u64,
        #[arg(long)]
        remove: u64,
    },
    /// Ways als gestrichelt markieren
    Dashed {
        #[arg(long, value_delimiter = ',', required = true)]
        ways: Vec<u64>,
    },
    /// Job-Datei mit geordneter Schrittliste ausführen
    Run {
        #[arg(long)]
        job: PathBuf,
    },
}

impl Command {
    fn into_steps(self) -> anyhow::Result<Vec<MapCommand>> {
        let step = match self {
            Command::FixDoubled => MapCommand::FixDoubled,
            Command::DedupPoints => MapCommand::DedupPoints,
            Command::DedupWays => MapCommand::DedupWays,
            Command::RemoveOrphans => MapCommand::RemoveOrphans,
            Command::Split { lanelet, distance } => MapCommand::Split { lanelet, distance },
            Command::SplitOverlong { distance } => MapCommand::SplitOverlong { distance },
            Command::Lengths => MapCommand::Lengths,
            Command::Offset { d_lat, d_lon } => MapCommand::Offset { d_lat, d_lon },
            Command::OffsetMeters {
                east,
                north,
                reference_lat,
            } => MapCommand::OffsetMeters {
                east,
                north,
                reference_lat,
            },
            Command::Reverse { lanelets } => MapCommand::Reverse { lanelets },
            Command::RemoveLanelet { lanelet } => MapCommand::RemoveLanelet { lanelet },
            Command::RemoveLanelets { keep } => MapCommand::RemoveLanelets { keep },
            Command::RemovePoints { points } => MapCommand::RemovePoints { points },
            Command::MergePoint { keep, remove } => MapCommand::MergePoint { keep, remove },
            Command::Dashed { ways } => MapCommand::Dashed { ways },
            Command::Run { job } => return Ok(JobFile::load(&job)?.steps),
        };
        Ok(vec![step])
    }
}

fn main() -> anyhow::Result<()> {
    AppRunner::run(Args::parse())
}

struct AppRunner;

impl AppRunner {
    fn run(args: Args) -> anyhow::Result<()> {
        // Logger initialisieren
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();

        log::info!("Lanelet Map Repair v{} startet...", env!("CARGO_PKG_VERSION"));

        // Optionen aus TOML laden (oder Standardwerte)
        let config_path = args.config.unwrap_or_else(RepairOptions::config_path);
        let options = RepairOptions::load_from_file(&config_path);

        let steps = args.cmd.into_steps()?;
        let mut session = MapSession::open(&args.file, options)?;
        session.execute_all(steps)?;

        if session.command_log().has_mutations() {
            let target = args.output.as_deref().unwrap_or(&args.file);
            session.save(target)?;
        } else {
            log::info!("Keine verändernden Befehle, Datei bleibt unverändert");
        }

        if args.report {
            let json = serde_json::to_string_pretty(&session.report())
                .context("Report nicht serialisierbar")?;
            println!("{}", json);
        }
        Ok(())
    }
}
