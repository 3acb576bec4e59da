use app_state::UploadConstants;
use clap::Subcommand;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail, eyre};
use common_services::api::storage::get_user_storage;
use common_services::api::upload::{select_file, size_rejection, upload_photos_with_progress};
use common_services::api::vault::create_vault;
use common_services::backend::{BackendClient, BackendConnector};
use common_services::membership::get_user_vaults;
use common_types::{Session, UploadFile, UploadItem, UploadStatus};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the backend is reachable.
    Health,
    /// List the vaults you are a member of.
    Vaults,
    /// Show estimated storage usage across your vaults.
    Storage,
    /// Create a new vault owned by you.
    CreateVault {
        name: String,
        #[clap(long)]
        description: Option<String>,
        #[clap(long)]
        color: Option<String>,
    },
    /// Upload image files into a vault.
    Upload {
        #[clap(long)]
        vault_id: Uuid,
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

pub struct Context<'a> {
    pub connector: &'a BackendConnector,
    pub user_id: Option<Uuid>,
    pub access_token: Option<String>,
    pub json: bool,
}

impl Context<'_> {
    fn session(&self) -> Result<Session> {
        let (Some(user_id), Some(access_token)) = (self.user_id, self.access_token.clone()) else {
            bail!(
                "This command needs --user-id and --access-token \
                 (or VAULTS_USER_ID / VAULTS_ACCESS_TOKEN)"
            );
        };
        Ok(Session {
            user_id,
            access_token,
        })
    }

    fn client(&self) -> Result<(BackendClient, Uuid)> {
        let session = self.session()?;
        Ok((self.connector.client_for(&session), session.user_id))
    }
}

pub async fn run(context: &Context<'_>, command: Command) -> Result<()> {
    match command {
        Command::Health => {
            context.connector.check_health().await?;
            println!("Backend is reachable.");
        }
        Command::Vaults => {
            let (client, user_id) = context.client()?;
            let vaults = get_user_vaults(&client, user_id).await?;
            if context.json {
                println!("{}", serde_json::to_string_pretty(&vaults)?);
            } else if vaults.is_empty() {
                println!("You are not a member of any vault yet.");
            } else {
                for vault in vaults {
                    println!(
                        "{}  {:<24} {:<7} {:>5} photos",
                        vault.id, vault.name, vault.role.as_str(), vault.photo_count
                    );
                }
            }
        }
        Command::Storage => {
            let (client, user_id) = context.client()?;
            let constants = &context.connector.constants().storage;
            let estimate = get_user_storage(&client, user_id, constants).await?;
            if context.json {
                println!("{}", serde_json::to_string_pretty(&estimate)?);
            } else {
                println!(
                    "{:.1} MB of {:.0} MB used ({:.1}%), {:.1} MB available",
                    estimate.used_mb,
                    estimate.total_mb,
                    estimate.used_percentage,
                    estimate.available_mb
                );
                if estimate.is_over_quota() {
                    warn!("Storage quota exceeded");
                }
            }
        }
        Command::CreateVault {
            name,
            description,
            color,
        } => {
            let (client, user_id) = context.client()?;
            let vault = create_vault(&client, user_id, &name, description, color).await?;
            if context.json {
                println!("{}", serde_json::to_string_pretty(&vault)?);
            } else {
                println!("Created vault '{}' ({})", vault.name, vault.id);
            }
        }
        Command::Upload { vault_id, files } => {
            let (client, user_id) = context.client()?;
            upload(context, &client, user_id, vault_id, &files).await?;
        }
    }
    Ok(())
}

/// Reads a picked file into an upload item. Files over the size limit are skipped without
/// being loaded.
async fn read_item(path: &Path, constants: &UploadConstants) -> Result<UploadItem> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| eyre!("{} has no usable file name", path.display()))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let size = tokio::fs::metadata(path)
        .await
        .wrap_err_with(|| format!("Could not inspect {}", path.display()))?
        .len();

    if let Some(reason) = size_rejection(file_name, size, constants) {
        return Ok(UploadItem {
            file: UploadFile::new(file_name, mime.essence_str(), Vec::new()),
            status: UploadStatus::Skipped { reason },
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("Could not read {}", path.display()))?;
    Ok(select_file(
        UploadFile::new(file_name, mime.essence_str(), bytes),
        constants,
    ))
}

async fn upload(
    context: &Context<'_>,
    client: &BackendClient,
    user_id: Uuid,
    vault_id: Uuid,
    paths: &[PathBuf],
) -> Result<()> {
    let constants = &context.connector.constants().upload;
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        items.push(read_item(path, constants).await?);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing the current file and skipping the rest");
            on_interrupt.cancel();
        }
    });

    let total = items.len();
    let report = upload_photos_with_progress(
        client,
        user_id,
        vault_id,
        items,
        constants,
        &cancel,
        |index, item| {
            if item.status == UploadStatus::Uploading {
                println!("[{}/{total}] {}", index + 1, item.file.file_name);
            }
        },
    )
    .await;
    interrupt.abort();

    for item in &report.items {
        match &item.status {
            UploadStatus::Success { photo } => {
                println!("uploaded  {} -> {}", item.file.file_name, photo.id);
            }
            UploadStatus::Skipped { reason } => {
                println!("skipped   {}: {reason}", item.file.file_name);
            }
            UploadStatus::Failed { reason, orphaned_key } => {
                println!("failed    {}: {reason}", item.file.file_name);
                if let Some(key) = orphaned_key {
                    println!("          stored file left without a record: {key}");
                }
            }
            UploadStatus::Pending | UploadStatus::Uploading => {
                println!("pending   {}", item.file.file_name);
            }
        }
    }

    if report.has_failures() {
        bail!("Some files failed to upload");
    }
    Ok(())
}
