//! Host-side tool: inspect and rewrite scene documents, and build and serve
//! the editor site locally.

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::{Command, ExitCode};

    use anyhow::{bail, Context, Result};
    use clap::{Parser, Subcommand};
    use log::info;

    use vertex_viz::document::SceneDocument;
    use vertex_viz::geometry::find_duplicates;
    use vertex_viz::{site, EditorConfig, Geometry, Scene};

    #[derive(Parser)]
    #[command(name = "vertex-viz", version, about = "Indexed vertex editor tooling")]
    struct Cli {
        /// Editor config JSON (tolerance, defaults)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        /// Override the dedup tolerance from the config
        #[arg(long, global = true)]
        tolerance: Option<f64>,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Print per-layer geometry statistics
        Inspect { file: PathBuf },
        /// Drop unreferenced vertices from indexed layers
        Compact {
            file: PathBuf,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        /// Convert flat layers to indexed geometry
        Index {
            file: PathBuf,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        /// Expand every layer to flat geometry
        Flatten {
            file: PathBuf,
            #[arg(short, long)]
            output: Option<PathBuf>,
        },
        /// Stamp local .css/.js links in HTML files with a version query
        CacheBust {
            dir: PathBuf,
            /// Version string to append; defaults to each file's mtime
            #[arg(short = 'v', long = "version")]
            version: Option<String>,
        },
        /// Build the wasm bundle into static/pkg and serve static/
        Serve {
            #[arg(short, long, default_value_t = 8000)]
            port: u16,
        },
    }

    pub fn run() -> ExitCode {
        vertex_viz::logging::init();
        match execute(Cli::parse()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(cli: Cli) -> Result<()> {
        let mut config = match &cli.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("cannot read '{}'", path.display()))?;
                EditorConfig::from_json(&text)?
            }
            None => EditorConfig::default(),
        };
        if let Some(tolerance) = cli.tolerance {
            config.tolerance = tolerance;
        }

        match cli.command {
            Commands::Inspect { file } => {
                let scene = load(&file, config)?;
                print!("{}", describe(&scene));
            }
            Commands::Compact { file, output } => {
                let mut scene = load(&file, config)?;
                let changed = scene.compact_all();
                info!("compacted {changed} layers");
                write(output.as_deref(), &scene.to_document())?;
            }
            Commands::Index { file, output } => {
                let mut scene = load(&file, config)?;
                let ids: Vec<_> = scene.layers().iter().map(|l| l.id()).collect();
                for id in ids {
                    if let Some(layer) = scene.layer_mut(id) {
                        layer.index_geometry();
                    }
                }
                write(output.as_deref(), &scene.to_document())?;
            }
            Commands::Flatten { file, output } => {
                let scene = load(&file, config)?;
                write(output.as_deref(), &scene.to_flat_document())?;
            }
            Commands::CacheBust { dir, version } => {
                let updated = site::bust_dir(&dir, version.as_deref())?;
                println!("{} file(s) updated", updated.len());
            }
            Commands::Serve { port } => serve(port)?,
        }
        Ok(())
    }

    fn load(path: &Path, config: EditorConfig) -> Result<Scene> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let mut scene = Scene::new(config);
        scene
            .import_json(&text)
            .with_context(|| format!("cannot load '{}'", path.display()))?;
        Ok(scene)
    }

    fn write(output: Option<&Path>, document: &SceneDocument) -> Result<()> {
        let text = serde_json::to_string_pretty(document)?;
        match output {
            Some(path) => fs::write(path, text + "\n")
                .with_context(|| format!("cannot write '{}'", path.display()))?,
            None => println!("{text}"),
        }
        Ok(())
    }

    fn describe(scene: &Scene) -> String {
        let mut out = format!("period: {}\n", scene.period());
        for layer in scene.layers() {
            let (storage, duplicates) = match layer.geometry() {
                Geometry::Flat(_) => ("flat", 0),
                Geometry::Indexed(indexed) => ("indexed", find_duplicates(indexed.indices()).len()),
            };
            out.push_str(&format!(
                "{:>4}  {:<20} {:<8} {:<14} unique={:<6} draw={:<6} repeated={}\n",
                layer.id().0,
                layer.name(),
                storage,
                layer.draw_mode().as_str(),
                layer.unique_vertex_count(),
                layer.render_vertex_count(),
                duplicates,
            ));
        }
        out
    }

    fn serve(port: u16) -> Result<()> {
        println!("Building WASM pkg …");
        let status = Command::new("wasm-pack")
            .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
            .status()
            .context("wasm-pack not found in PATH (https://rustwasm.github.io/wasm-pack/)")?;
        if !status.success() {
            bail!("wasm-pack finished with errors");
        }

        site::bust_dir(Path::new("static"), None)?;

        println!("Launching local server at http://127.0.0.1:{port} …");
        let port = port.to_string();
        let status = Command::new("python3")
            .args(["-m", "http.server", port.as_str(), "--directory", "static"])
            .status()
            .context("failed to start http server")?;
        if !status.success() {
            bail!("http server exited with {status}");
        }
        Ok(())
    }
}
