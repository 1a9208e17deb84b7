use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use drive_core::{
    load_settings, Activation, DirectoryOrchestrator, DirectorySnapshot, DriveEvent, ListEntry,
    MenuAction, SessionHooks, UploadFile, UploadStatus,
};
use shared::domain::{DirectoryId, FileId, ItemRef};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long)]
    server_url: Option<String>,
    /// Raw `Cookie` header value for the signed-in session.
    #[arg(long)]
    session_cookie: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory to operate in; the root when omitted.
    #[arg(long)]
    dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ls,
    Mkdir {
        name: String,
    },
    Rename {
        id: String,
        name: String,
        #[arg(long)]
        file: bool,
    },
    Rm {
        id: String,
        #[arg(long)]
        file: bool,
    },
    Upload {
        path: PathBuf,
    },
    Open {
        file_id: String,
    },
}

struct TerminalHooks;

impl SessionHooks for TerminalHooks {
    fn on_unauthorized(&self) {
        eprintln!("session expired; sign in again and pass a fresh --session-cookie");
    }

    fn on_mutation_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref());
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(cookie) = cli.session_cookie {
        settings.session_cookie = Some(cookie);
    }
    info!(server_url = %settings.server_url, command = ?cli.command, "connecting to drive");
    let drive = DirectoryOrchestrator::connect(&settings, Arc::new(TerminalHooks))
        .context("failed to set up drive client")?;

    let dir = cli.dir.map(DirectoryId::new);
    drive
        .navigate(dir.clone())
        .await
        .with_context(|| format!("failed to open directory {}", dir.as_ref().map_or("root", |d| d.as_str())))?;

    match cli.command {
        Command::Ls => print_listing(&drive.snapshot().await),
        Command::Mkdir { name } => {
            if !drive.open_create_folder().await {
                bail!("this directory does not accept new folders");
            }
            drive.edit_modal_input(name).await;
            drive.submit_modal().await.context("create folder failed")?;
            print_listing(&drive.snapshot().await);
        }
        Command::Rename { id, name, file } => {
            let item = item_ref(id, file);
            open_modal(&drive, &item, MenuAction::Rename).await?;
            drive.edit_modal_input(name).await;
            drive.submit_modal().await.context("rename failed")?;
            print_listing(&drive.snapshot().await);
        }
        Command::Rm { id, file } => {
            let item = item_ref(id, file);
            open_modal(&drive, &item, MenuAction::Delete).await?;
            drive.submit_modal().await.context("delete failed")?;
            print_listing(&drive.snapshot().await);
        }
        Command::Upload { path } => upload(&drive, path).await?,
        Command::Open { file_id } => {
            match drive.activate(&ItemRef::File(FileId::new(file_id))).await? {
                Activation::OpenFile(url) => println!("{url}"),
                other => bail!("nothing to open ({other:?})"),
            }
        }
    }

    Ok(())
}

fn item_ref(id: String, file: bool) -> ItemRef {
    if file {
        ItemRef::File(FileId::new(id))
    } else {
        ItemRef::Directory(DirectoryId::new(id))
    }
}

async fn open_modal(drive: &DirectoryOrchestrator, item: &ItemRef, action: MenuAction) -> Result<()> {
    drive.toggle_menu(item.clone()).await;
    drive.choose_action(item, action).await?;
    if drive.snapshot().await.modal.is_none() {
        bail!("{item} is not listed in this directory");
    }
    Ok(())
}

async fn upload(drive: &DirectoryOrchestrator, path: PathBuf) -> Result<()> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("upload path has no file name")?
        .to_string();
    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let mut events = drive.subscribe_events();
    let temp_id = drive
        .upload(UploadFile::new(name.clone(), content_type, bytes))
        .await
        .context("upload rejected")?;
    info!(%temp_id, %name, "upload started");

    let mut shown = 0u8;
    let status = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(DriveEvent::UploadProgress { temp_id: id, percent }) if id == temp_id => {
                    let percent = percent.floor() as u8;
                    if percent > shown {
                        shown = percent;
                        eprint!("\r{name}: {percent:>3}%");
                    }
                }
                Ok(DriveEvent::UploadSettled { temp_id: id, status }) if id == temp_id => break status,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => bail!("event feed closed before the upload settled"),
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                warn!(%temp_id, "interrupted; cancelling upload");
                if !drive.cancel_upload(&temp_id).await {
                    eprintln!("\rtransfer already finished; waiting for commit");
                }
            }
        }
    };
    eprintln!();
    info!(%temp_id, ?status, "upload settled");

    match status {
        UploadStatus::Committed => {
            let file_id = drive
                .last_upload()
                .await
                .and_then(|session| session.target_file_id)
                .map(|id| id.to_string())
                .unwrap_or_default();
            println!("uploaded {name} ({file_id})");
            Ok(())
        }
        UploadStatus::Cancelled => {
            println!("cancelled {name}");
            Ok(())
        }
        other => {
            let message = drive.error_message().await.unwrap_or_default();
            bail!("upload ended {other:?}: {message}")
        }
    }
}

fn print_listing(snapshot: &DirectorySnapshot) {
    println!("{}", snapshot.view.name);
    if !snapshot.mutations_enabled() {
        println!("  (directory not found or not accessible)");
        return;
    }
    for entry in &snapshot.view.entries {
        match entry {
            ListEntry::Directory(dir) => println!("  [dir]  {:<40} {}", dir.name, dir.id),
            ListEntry::File(file) => println!(
                "  [{:?}] {:<40} {} ({} bytes)",
                file.kind(),
                file.name,
                file.id,
                file.size
            ),
            ListEntry::Upload(row) => {
                println!("  [up]   {:<40} {}%", row.name, row.display_percent())
            }
        }
    }
}
