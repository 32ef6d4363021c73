//! enex2md - Evernote export to Markdown converter

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use enex2md::enex::{self, StreamDecoder};
use enex2md::{ConvertConfig, Converter, DEFAULT_TAG_TEMPLATE, NoteWriter, WriterConfig};

#[derive(Parser)]
#[command(name = "enex2md")]
#[command(version, about = "Convert Evernote exports to Markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    enex2md export.enex                 Convert into ./notes
    enex2md export.enex -o vault        Convert into ./vault
    enex2md exports/ --folders          Convert every .enex file, one folder per note")]
struct Cli {
    /// Export file, or a directory of .enex files
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "notes")]
    output: PathBuf,

    /// Template for each tag, must contain {{tag}} once
    #[arg(long, value_name = "TEMPLATE", default_value = DEFAULT_TAG_TEMPLATE)]
    tag_template: String,

    /// Prepend a YAML front matter block
    #[arg(long)]
    front_matter: bool,

    /// File holding a custom front matter template
    #[arg(long, value_name = "FILE", requires = "front_matter")]
    front_matter_template: Option<PathBuf>,

    /// Render highlighted text as plain text
    #[arg(long)]
    no_highlights: bool,

    /// Put every note in its own folder
    #[arg(long)]
    folders: bool,

    /// Set file modification times from note update times
    #[arg(long)]
    timestamps: bool,

    /// Decode notes one at a time, skipping notes that fail
    #[arg(long)]
    stream: bool,

    /// Show debug output
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(count) => {
            info!("converted {count} notes into {}", cli.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<usize, Box<dyn std::error::Error>> {
    let front_matter_template = cli
        .front_matter_template
        .as_deref()
        .map(fs::read_to_string)
        .transpose()?;

    let mut converter = Converter::new(ConvertConfig {
        tag_template: cli.tag_template.clone(),
        highlights: !cli.no_highlights,
        front_matter: cli.front_matter,
        front_matter_template,
        ..Default::default()
    })?;
    let writer = NoteWriter::with_config(
        &cli.output,
        WriterConfig {
            folders: cli.folders,
            timestamps: cli.timestamps,
        },
    );

    let mut count = 0;
    for path in input_files(&cli.input)? {
        info!("converting {}", path.display());
        count += if cli.stream {
            convert_stream(&path, &mut converter, &writer)?
        } else {
            convert_batch(&path, &mut converter, &writer)?
        };
    }
    Ok(count)
}

/// The input file itself, or every `.enex` file of a directory, sorted.
fn input_files(input: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        let is_enex = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("enex"));
        if is_enex && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn convert_batch(
    path: &Path,
    converter: &mut Converter,
    writer: &NoteWriter,
) -> Result<usize, Box<dyn std::error::Error>> {
    let export = enex::decode(BufReader::new(File::open(path)?))?;
    let count = export.notes.len();
    for mut note in export.notes {
        let markdown = converter.convert(&mut note)?;
        let name = converter.unique_note_name(&note.title);
        writer.save(&name, &markdown)?;
    }
    Ok(count)
}

fn convert_stream(
    path: &Path,
    converter: &mut Converter,
    writer: &NoteWriter,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut count = 0;
    for note in StreamDecoder::open(File::open(path)?)? {
        let mut note = match note {
            Ok(note) => note,
            Err(e) => {
                error!("skipping note: {e}");
                continue;
            }
        };
        let markdown = match converter.convert(&mut note) {
            Ok(markdown) => markdown,
            Err(e) => {
                error!(title = %note.title, "skipping note: {e}");
                continue;
            }
        };
        let name = converter.unique_note_name(&note.title);
        writer.save(&name, &markdown)?;
        count += 1;
    }
    Ok(count)
}
