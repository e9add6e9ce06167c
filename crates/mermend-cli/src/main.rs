use futures::executor::block_on;
use mermend::client::{ApiClient, ClientConfig, ClientError};
use mermend::render::raster::{RasterError, RasterOptions, render_result_png};
use mermend::render::{LadderError, RenderOutput, flowchart_ladder, sanitize_svg_id};
use mermend::{DiagramInput, extract_mermaid_blocks, normalize};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Raster(RasterError),
    Client(ClientError),
    Json(serde_json::Error),
    Embedded(String),
    NoDiagram,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Client(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Embedded(url) => {
                write!(f, "Input is an embedded diagram link ({url}); nothing to render locally")
            }
            CliError::NoDiagram => write!(f, "{}", LadderError::NoDiagram),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<LadderError> for CliError {
    fn from(value: LadderError) -> Self {
        match value {
            LadderError::NoDiagram => Self::NoDiagram,
        }
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<ClientError> for CliError {
    fn from(value: ClientError) -> Self {
        Self::Client(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Normalize,
    Render,
    Extract,
    Png,
    Drawio,
    Docx,
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
    Json,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    json: bool,
    pretty: bool,
    render_format: RenderFormat,
    render_scale: f32,
    background: Option<String>,
    diagram_id: Option<String>,
    out: Option<String>,
    api: Option<String>,
    verbosity: u8,
}

fn usage() -> &'static str {
    "mermend-cli\n\
\n\
USAGE:\n\
  mermend-cli [normalize] [--json] [--pretty] [<path>|-]\n\
  mermend-cli render [--format svg|png|json] [--scale <n>] [--background <css-color>] [--id <diagram-id>] [--out <path>] [--pretty] [<path>|-]\n\
  mermend-cli extract [--json] [--pretty] [<path>|-]\n\
  mermend-cli png [--api <url>] [--out <path>] [<path>|-]\n\
  mermend-cli drawio [--api <url>] [--out <path>] [<path>|-]\n\
  mermend-cli docx [--api <url>] [--out <path>] [<path>|-]\n\
\n\
OPTIONS:\n\
  -v, -vv         log debug / trace output to stderr (default: RUST_LOG or warn)\n\
  --api <url>     backend base URL (default: $MERMEND_API_BASE_URL or the hosted backend)\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - normalize prints the repaired diagram; --json adds every intermediate candidate.\n\
  - render never fails on bad syntax: it degrades to a simplified diagram or a text panel.\n\
  - extract prints the mermaid fences of a Markdown document.\n\
  - png, drawio and docx call the backend; their output defaults to writing next to the\n\
    input file (or ./out.<ext> for stdin). Use --out - for stdout.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        render_scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "normalize" => args.command = Command::Normalize,
            "render" => args.command = Command::Render,
            "extract" => args.command = Command::Extract,
            "png" => args.command = Command::Png,
            "drawio" => args.command = Command::Drawio,
            "docx" => args.command = Command::Docx,
            "--json" => args.json = true,
            "--pretty" => args.pretty = true,
            "-v" => args.verbosity = args.verbosity.max(1),
            "-vv" => args.verbosity = 2,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                let Some(scale) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_scale = scale.parse::<f32>().map_err(|_| CliError::Usage(usage()))?;
                if !(args.render_scale.is_finite() && args.render_scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--background" => {
                let Some(bg) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--id" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.diagram_id = Some(id.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--api" => {
                let Some(api) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.api = Some(api.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn default_out_path(input: Option<&str>, ext: &str) -> PathBuf {
    match input {
        Some(path) if path != "-" => PathBuf::from(path).with_extension(ext),
        _ => PathBuf::from(format!("out.{ext}")),
    }
}

fn write_bytes(bytes: &[u8], out: Option<&str>, input: Option<&str>, ext: &str) -> Result<(), CliError> {
    let out = out
        .map(PathBuf::from)
        .unwrap_or_else(|| default_out_path(input, ext));
    if out == Path::new("-") {
        std::io::stdout().lock().write_all(bytes)?;
    } else {
        std::fs::write(&out, bytes)?;
        tracing::debug!(path = %out.display(), bytes = bytes.len(), "wrote output");
    }
    Ok(())
}

fn diagram_id(args: &Args) -> String {
    let raw = args.diagram_id.clone().unwrap_or_else(|| {
        args.input
            .as_deref()
            .filter(|p| *p != "-")
            .and_then(|p| Path::new(p).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "diagram".to_string())
    });
    sanitize_svg_id(&raw)
}

fn api_client(api: Option<&str>) -> Result<ApiClient, CliError> {
    let config = match api {
        Some(url) => ClientConfig::new(url)?,
        None => ClientConfig::from_env()?,
    };
    Ok(ApiClient::new(config)?)
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;

    match args.command {
        Command::Normalize => {
            let code = match DiagramInput::classify(Some(&text)) {
                DiagramInput::Empty => return Err(CliError::NoDiagram),
                DiagramInput::Embed(_) => {
                    write_text(&text, None)?;
                    return Ok(());
                }
                DiagramInput::Source(code) => code,
            };
            let normalized = normalize(code);
            if args.json {
                write_json(&normalized, args.pretty)?;
            } else {
                println!("{}", normalized.code);
            }
            Ok(())
        }
        Command::Render => {
            let code = match DiagramInput::classify(Some(&text)) {
                DiagramInput::Empty => return Err(CliError::NoDiagram),
                DiagramInput::Embed(url) => return Err(CliError::Embedded(url.to_string())),
                DiagramInput::Source(code) => code,
            };
            let ladder = flowchart_ladder();
            let result = block_on(ladder.render(&diagram_id(&args), code))?;
            if let Some(notice) = &result.notice {
                eprintln!("{notice}");
            }

            match args.render_format {
                RenderFormat::Svg => match &result.output {
                    RenderOutput::Svg(svg) => write_text(svg, args.out.as_deref())?,
                    RenderOutput::Text(panel) => write_text(&panel.to_html(), args.out.as_deref())?,
                },
                RenderFormat::Png => {
                    let raster = RasterOptions {
                        scale: args.render_scale,
                        background: args.background.clone(),
                    };
                    let bytes = render_result_png(&result, &raster)?;
                    write_bytes(&bytes, args.out.as_deref(), args.input.as_deref(), "png")?;
                }
                RenderFormat::Json => write_json(&result, args.pretty)?,
            }
            Ok(())
        }
        Command::Extract => {
            let blocks = extract_mermaid_blocks(&text);
            if blocks.is_empty() {
                return Err(CliError::NoDiagram);
            }
            if args.json {
                write_json(&blocks, args.pretty)?;
            } else {
                println!("{}", blocks.join("\n\n"));
            }
            Ok(())
        }
        Command::Png | Command::Drawio | Command::Docx => {
            if text.trim().is_empty() {
                return Err(CliError::NoDiagram);
            }
            let client = api_client(args.api.as_deref())?;
            let rt = runtime()?;
            let out = args.out.as_deref();
            let input = args.input.as_deref();
            match args.command {
                Command::Png => {
                    let bytes = rt.block_on(client.render_png(&text))?;
                    write_bytes(&bytes, out, input, "png")
                }
                Command::Drawio => {
                    let xml = rt.block_on(client.convert_to_drawio(&text))?;
                    write_bytes(xml.as_bytes(), out, input, "drawio")
                }
                _ => {
                    let bytes = rt.block_on(client.convert_to_docx(&text))?;
                    write_bytes(&bytes, out, input, "docx")
                }
            }
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing(args.verbosity);

    match run(args) {
        Ok(()) => {}
        Err(CliError::NoDiagram) => {
            eprintln!("{}", CliError::NoDiagram);
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
