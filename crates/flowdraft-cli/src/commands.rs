//! Subcommand implementations.

use crate::cli::{Cli, Command};
use flowdraft_core::model::now_millis;
use flowdraft_core::storage::{FileStorage, create_default_storage};
use flowdraft_core::{
    ConfigError, Diagram, DiagramLibrary, DiagramStorage, DiagramStore, EditorConfig, EditorSession, GestureEffect,
    GestureEvent, ImportError, ShortcutRegistry, StorageError, export_filename, export_json, import_diagram,
};
use flowdraft_render::{GridStyle, Renderer, RendererError, SvgRenderer};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid event file {}: {source}", path.display())]
    Events {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Export failed: {0}")]
    Export(#[from] serde_json::Error),
    #[error("Output failed: {0}")]
    Output(#[from] io::Error),
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

fn file_error(path: &Path) -> impl FnOnce(io::Error) -> CliError + '_ {
    move |source| CliError::File {
        path: path.to_path_buf(),
        source,
    }
}

/// Run a parsed command line against the configured file store.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::from_json_file(path)?,
        None => EditorConfig::default(),
    };
    let storage = match cli.store {
        Some(dir) => FileStorage::new(dir)?,
        None => create_default_storage()?,
    };
    log::debug!("Using store at {}", storage.base_path().display());
    let stdout = io::stdout();
    run_with(Arc::new(storage), config, cli.command, &mut stdout.lock()).await
}

/// Run one command against `storage`, writing human-readable output to `out`.
pub async fn run_with<S: DiagramStorage + ?Sized>(
    storage: Arc<S>,
    config: EditorConfig,
    command: Command,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let library = DiagramLibrary::new(Arc::clone(&storage));
    match command {
        Command::List => {
            let diagrams = library.list().await?;
            if diagrams.is_empty() {
                writeln!(out, "No diagrams")?;
            }
            for d in diagrams {
                writeln!(
                    out,
                    "{}  {:<24} {:>3} nodes {:>3} connections",
                    d.id,
                    d.name,
                    d.nodes.len(),
                    d.connections.len()
                )?;
            }
        }
        Command::New { name } => {
            let diagram = library.create(&name).await?;
            writeln!(out, "{}\t{}", diagram.id, diagram.name)?;
        }
        Command::Delete { id } => {
            // Removal of a missing id is not an error for the backends.
            if !storage.exists(&id).await? {
                return Err(StorageError::NotFound(id).into());
            }
            library.remove(&id).await?;
            writeln!(out, "Deleted {id}")?;
        }
        Command::Duplicate { id } => {
            let copy = library.duplicate(&id).await?;
            writeln!(out, "{}\t{}", copy.id, copy.name)?;
        }
        Command::Show { id } => show(&library.get(&id).await?, &mut *out)?,
        Command::Export { id, output } => {
            let diagram = library.get(&id).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(export_filename(&diagram.name, now_millis())));
            fs::write(&path, export_json(&diagram)?).map_err(file_error(&path))?;
            writeln!(out, "{}", path.display())?;
        }
        Command::Import { file, mode } => {
            let json = read_file(&file)?;
            let diagram = import_diagram(&*storage, &json, mode.into()).await?;
            writeln!(out, "Imported {} as {}", diagram.name, diagram.id)?;
        }
        Command::Render {
            id,
            output,
            grid,
            fit,
        } => {
            let mut store = DiagramStore::from_document(library.get(&id).await?, config);
            if fit {
                store.fit_to_content();
            }
            let grid = GridStyle::from(grid);
            let mut renderer = SvgRenderer::new().with_grid(grid);
            let events = store.drain_events();
            renderer.sync(&store, &events);
            write_svg(&renderer, &output)?;
            writeln!(out, "{} ({} grid)", output.display(), grid.name())?;
        }
        Command::Replay {
            id,
            events,
            svg,
            dry_run,
        } => {
            let recorded: Vec<GestureEvent> =
                serde_json::from_str(&read_file(&events)?).map_err(|source| CliError::Events {
                    path: events.clone(),
                    source,
                })?;
            let session = EditorSession::open(library.get(&id).await?, config);
            let mut replay = Replay::new(session, GridStyle::default());
            for event in recorded {
                replay.apply(event, &*storage, dry_run, &mut *out).await?;
            }
            if !dry_run && replay.session.is_dirty() {
                replay.session.save(&*storage).await?;
            }
            if let Some(path) = svg {
                write_svg(&replay.renderer, &path)?;
            }
            let store = replay.session.store();
            writeln!(
                out,
                "Applied {} events: {} nodes, {} connections, {} warnings",
                replay.applied,
                store.nodes().len(),
                store.connections().len(),
                replay.warnings
            )?;
        }
        Command::Shortcuts => write!(out, "{}", ShortcutRegistry::describe())?,
    }
    Ok(())
}

fn show(diagram: &Diagram, out: &mut impl Write) -> Result<(), CliError> {
    writeln!(out, "{} ({})", diagram.name, diagram.id)?;
    for node in &diagram.nodes {
        writeln!(
            out,
            "  {:<6} {:<10} ({}, {}) {:?}",
            node.id.as_str(),
            node.kind.name(),
            node.position.x,
            node.position.y,
            node.content
        )?;
    }
    for conn in &diagram.connections {
        writeln!(
            out,
            "  {:<6} {}.{} -> {}.{}",
            conn.id.as_str(),
            conn.from,
            conn.from_anchor,
            conn.to,
            conn.to_anchor
        )?;
    }
    Ok(())
}

fn write_svg(renderer: &SvgRenderer, path: &Path) -> Result<(), CliError> {
    let file = fs::File::create(path).map_err(file_error(path))?;
    let mut writer = io::BufWriter::new(file);
    renderer.write_svg(&mut writer)?;
    writer.flush().map_err(file_error(path))?;
    log::info!("Rendered {}", path.display());
    Ok(())
}

/// A session fed from recorded events, with a renderer following along.
struct Replay {
    session: EditorSession,
    renderer: SvgRenderer,
    applied: usize,
    warnings: usize,
}

impl Replay {
    fn new(mut session: EditorSession, grid: GridStyle) -> Self {
        let mut renderer = SvgRenderer::new().with_grid(grid);
        let events = session.drain_events();
        renderer.sync(session.store(), &events);
        Self {
            session,
            renderer,
            applied: 0,
            warnings: 0,
        }
    }

    async fn apply<S: DiagramStorage + ?Sized>(
        &mut self,
        event: GestureEvent,
        storage: &S,
        dry_run: bool,
        out: &mut impl Write,
    ) -> Result<(), CliError> {
        for effect in self.session.dispatch(event) {
            match effect {
                GestureEffect::Warning(err) => {
                    self.warnings += 1;
                    writeln!(out, "warning: {err}")?;
                }
                GestureEffect::SaveRequested if !dry_run => {
                    self.session.save(storage).await?;
                }
                other => log::debug!("Effect {other:?}"),
            }
        }
        let events = self.session.drain_events();
        self.renderer.sync(self.session.store(), &events);
        self.renderer.set_overlay(self.session.overlay());
        self.applied += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{GridArg, ImportModeArg};
    use flowdraft_core::MemoryStorage;
    use tempfile::tempdir;

    fn exec(storage: &Arc<MemoryStorage>, command: Command) -> Result<String, CliError> {
        let mut out = Vec::new();
        pollster::block_on(run_with(Arc::clone(storage), EditorConfig::default(), command, &mut out))?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn new_diagram(storage: &Arc<MemoryStorage>, name: &str) -> String {
        let out = exec(storage, Command::New { name: name.to_string() }).unwrap();
        out.split('\t').next().unwrap().to_string()
    }

    #[test]
    fn test_new_and_list() {
        let storage = Arc::new(MemoryStorage::new());
        new_diagram(&storage, "Payroll");
        new_diagram(&storage, "Payroll");
        let listing = exec(&storage, Command::List).unwrap();
        assert!(listing.contains("Payroll (1)"));
        assert_eq!(listing.lines().count(), 2);
    }

    #[test]
    fn test_delete_unknown_fails() {
        let storage = Arc::new(MemoryStorage::new());
        let result = exec(&storage, Command::Delete { id: "nope".to_string() });
        assert!(matches!(result, Err(CliError::Storage(StorageError::NotFound(_)))));
    }

    #[test]
    fn test_duplicate_lists_copy() {
        let storage = Arc::new(MemoryStorage::new());
        let id = new_diagram(&storage, "Payroll");
        let out = exec(&storage, Command::Duplicate { id: id.clone() }).unwrap();
        let (copy_id, copy_name) = out.trim_end().split_once('\t').unwrap();
        assert_ne!(copy_id, id);
        assert_eq!(copy_name, "Payroll (copy)");
        assert_eq!(exec(&storage, Command::List).unwrap().lines().count(), 2);

        let missing = exec(&storage, Command::Duplicate { id: "nope".to_string() });
        assert!(matches!(missing, Err(CliError::Storage(StorageError::NotFound(_)))));
    }

    #[test]
    fn test_replay_saves_and_renders() {
        let storage = Arc::new(MemoryStorage::new());
        let id = new_diagram(&storage, "Flow");
        let dir = tempdir().unwrap();
        let events = dir.path().join("events.json");
        fs::write(
            &events,
            r#"[
                {"kind": "createNode", "nodeType": "start", "position": {"x": 100, "y": 100}},
                {"kind": "createNode", "nodeType": "end", "position": {"x": 300, "y": 100}},
                {"kind": "pointerDown", "position": {"x": 220, "y": 160}},
                {"kind": "pointerMove", "position": {"x": 260, "y": 160}},
                {"kind": "pointerUp", "position": {"x": 300, "y": 160}},
                {"kind": "pointerDown", "position": {"x": 360, "y": 160}},
                {"kind": "pointerMove", "position": {"x": 361, "y": 160}},
                {"kind": "pointerUp", "position": {"x": 361, "y": 160}}
            ]"#,
        )
        .unwrap();
        let svg = dir.path().join("out.svg");

        let summary = exec(
            &storage,
            Command::Replay {
                id: id.clone(),
                events,
                svg: Some(svg.clone()),
                dry_run: false,
            },
        )
        .unwrap();
        assert!(summary.contains("Applied 8 events: 2 nodes, 1 connections, 0 warnings"));

        let saved = pollster::block_on(storage.get(&id)).unwrap();
        assert_eq!(saved.nodes.len(), 2);
        assert_eq!(saved.connections.len(), 1);
        let rendered = fs::read_to_string(svg).unwrap();
        assert!(rendered.contains("class=\"connection\""));
    }

    #[test]
    fn test_replay_reports_rejected_connection() {
        let storage = Arc::new(MemoryStorage::new());
        let id = new_diagram(&storage, "Flow");
        let dir = tempdir().unwrap();
        let events = dir.path().join("events.json");
        // Connect start.right -> end.left twice.
        fs::write(
            &events,
            r#"[
                {"kind": "createNode", "nodeType": "start", "position": {"x": 0, "y": 0}},
                {"kind": "createNode", "nodeType": "end", "position": {"x": 400, "y": 0}},
                {"kind": "pointerDown", "position": {"x": 120, "y": 60}},
                {"kind": "pointerMove", "position": {"x": 300, "y": 60}},
                {"kind": "pointerUp", "position": {"x": 400, "y": 60}},
                {"kind": "pointerDown", "position": {"x": 120, "y": 60}},
                {"kind": "pointerMove", "position": {"x": 300, "y": 60}},
                {"kind": "pointerUp", "position": {"x": 400, "y": 60}}
            ]"#,
        )
        .unwrap();

        let summary = exec(
            &storage,
            Command::Replay {
                id: id.clone(),
                events,
                svg: None,
                dry_run: true,
            },
        )
        .unwrap();
        assert!(summary.contains("warning: Connection"));
        assert!(summary.contains("1 warnings"));
        assert!(pollster::block_on(storage.get(&id)).unwrap().nodes.is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        let id = new_diagram(&storage, "Shared");
        let dir = tempdir().unwrap();
        let file = dir.path().join("shared.json");

        exec(&storage, Command::Export { id: id.clone(), output: Some(file.clone()) }).unwrap();
        let conflict = exec(&storage, Command::Import { file: file.clone(), mode: ImportModeArg::Cancel });
        assert!(matches!(conflict, Err(CliError::Import(ImportError::AlreadyExists(_)))));

        let imported = exec(&storage, Command::Import { file, mode: ImportModeArg::Create }).unwrap();
        assert!(imported.starts_with("Imported Shared (1)"));
    }

    #[test]
    fn test_render_writes_svg() {
        let storage = Arc::new(MemoryStorage::new());
        let id = new_diagram(&storage, "Empty");
        let dir = tempdir().unwrap();
        let output = dir.path().join("empty.svg");
        let printed = exec(
            &storage,
            Command::Render {
                id,
                output: output.clone(),
                grid: GridArg::Lines,
                fit: true,
            },
        )
        .unwrap();
        assert!(printed.contains("(lines grid)"));
        let svg = fs::read_to_string(output).unwrap();
        assert!(svg.contains("<title>Empty</title>"));
        assert!(svg.contains("<pattern id=\"grid\""));
    }

    #[test]
    fn test_shortcuts_listing() {
        let storage = Arc::new(MemoryStorage::new());
        let out = exec(&storage, Command::Shortcuts).unwrap();
        assert!(out.contains("Ctrl+Z"));
    }
}
