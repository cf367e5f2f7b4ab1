//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use cloudpan_client::{
    Account, Credentials, Downloader, Endpoints, Gateway, HttpGateway, ListOptions, Metadata,
    RefreshingToken, StaticToken, TokenSource, build_http_client,
};
use cloudpan_protocol::messages::FileManagerItem;
use cloudpan_protocol::{FileOperation, OnDuplicate};
use cloudpan_transfer::BlockSize;
use cloudpan_upload::{BatchOptions, BatchOrchestrator, FileUploader, UploadOptions};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::args::{Command, UploadArgs};
use crate::config::Config;
use crate::render::{format_entry, human_bytes, print_events};

/// Builds the HTTP gateway from configured credentials. The refreshing
/// token source is returned too so renewed credentials can be saved.
fn gateway(config: &Config) -> anyhow::Result<(Arc<dyn Gateway>, Option<Arc<RefreshingToken>>)> {
    let creds = config.credentials.clone();
    if creds.can_refresh() {
        let refresher = Arc::new(RefreshingToken::new(
            build_http_client()?,
            Endpoints::default().token_url,
            creds,
        ));
        let token: Arc<dyn TokenSource> = refresher.clone();
        return Ok((Arc::new(HttpGateway::new(token)?), Some(refresher)));
    }
    if creds.access_token.is_empty() {
        bail!("no access token configured; set CLOUDPAN_ACCESS_TOKEN or edit the config file");
    }
    let token: Arc<dyn TokenSource> = Arc::new(StaticToken::new(creds.access_token));
    Ok((Arc::new(HttpGateway::new(token)?), None))
}

/// Runs `command`, then writes back credentials renewed along the way.
/// Saving happens even when the command fails.
pub async fn run(command: Command, config: Config, config_path: &Path) -> anyhow::Result<()> {
    let (gw, refresher) = gateway(&config)?;
    let result = dispatch(command, &config, gw).await;

    if let Some(refresher) = refresher {
        let current = refresher.credentials().await;
        match save_if_refreshed(config_path, &config.credentials, &current) {
            Ok(true) => debug!(path = %config_path.display(), "refreshed credentials saved"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "could not save refreshed credentials"),
        }
    }
    result
}

fn save_if_refreshed(path: &Path, before: &Credentials, after: &Credentials) -> anyhow::Result<bool> {
    if before == after {
        return Ok(false);
    }
    Config::store_credentials(path, after)?;
    Ok(true)
}

async fn dispatch(command: Command, config: &Config, gw: Arc<dyn Gateway>) -> anyhow::Result<()> {
    match command {
        Command::Whoami => {
            let user = Account::new(gw).user_info().await?;
            println!("name:  {}", user.baidu_name);
            println!("uk:    {}", user.uk);
            println!(
                "tier:  {} (block size {})",
                user.vip_type,
                human_bytes(BlockSize::for_vip_type(user.vip_type).bytes())
            );
        }
        Command::Quota => {
            let quota = Account::new(gw).quota().await?;
            println!(
                "{} used of {} ({} free)",
                human_bytes(quota.used),
                human_bytes(quota.total),
                human_bytes(quota.free)
            );
        }
        Command::Ls { dir, recursive } => {
            let dir = config.resolve_remote(&dir);
            let metadata = Metadata::new(gw);
            let entries = if recursive {
                metadata.list_all(&dir, true).await?
            } else {
                metadata.list_dir(&dir, &ListOptions::default()).await?
            };
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
        }
        Command::Search {
            key,
            dir,
            recursive,
        } => {
            let dir = config.resolve_remote(&dir);
            for entry in Metadata::new(gw).search(&key, &dir, recursive).await? {
                println!("{}", format_entry(&entry));
            }
        }
        Command::Upload(args) => upload(gw, config, args).await?,
        Command::Mkdir { remote } => {
            let remote = config.resolve_remote(&remote);
            let options = UploadOptions {
                policy: config.conflict_policy,
                ..Default::default()
            };
            let created = FileUploader::new(gw, options).create_dir(&remote).await?;
            println!("created {}", created.path);
        }
        Command::Download {
            remote,
            local,
            overwrite,
            recursive,
        } => {
            let remote = config.resolve_remote(&remote);
            let downloader = Downloader::new(gw);
            if recursive {
                let outcome = downloader.download_dir(&remote, &local, overwrite).await?;
                for path in &outcome.skipped {
                    eprintln!("skipped {path}: local file exists");
                }
                println!(
                    "downloaded {} file(s) from {} -> {} ({})",
                    outcome.files.len(),
                    remote,
                    local.display(),
                    human_bytes(outcome.bytes())
                );
            } else {
                let outcome = downloader.download_file(&remote, &local, overwrite).await?;
                println!(
                    "downloaded {} -> {} ({})",
                    outcome.remote_path,
                    outcome.local_path.display(),
                    human_bytes(outcome.bytes)
                );
            }
        }
        Command::Rm { paths } => {
            let items = paths
                .iter()
                .map(|p| FileManagerItem::Delete(config.resolve_remote(p)))
                .collect();
            file_op(gw, FileOperation::Delete, items).await?;
        }
        Command::Mv { from, to_dir } => {
            let item = relocate(config, &from, &to_dir)?;
            file_op(gw, FileOperation::Move, vec![item]).await?;
        }
        Command::Cp { from, to_dir } => {
            let item = relocate(config, &from, &to_dir)?;
            file_op(gw, FileOperation::Copy, vec![item]).await?;
        }
        Command::Rename { path, new_name } => {
            let item = FileManagerItem::Rename {
                path: config.resolve_remote(&path),
                newname: new_name,
            };
            file_op(gw, FileOperation::Rename, vec![item]).await?;
        }
    }
    Ok(())
}

fn relocate(config: &Config, from: &str, to_dir: &str) -> anyhow::Result<FileManagerItem> {
    let path = config.resolve_remote(from);
    let newname = path
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .with_context(|| format!("no file name in {path}"))?
        .to_string();
    Ok(FileManagerItem::Relocate {
        path,
        dest: config.resolve_remote(to_dir),
        newname,
    })
}

async fn file_op(
    gw: Arc<dyn Gateway>,
    op: FileOperation,
    items: Vec<FileManagerItem>,
) -> anyhow::Result<()> {
    let resp = Metadata::new(gw)
        .file_manager(op, items, OnDuplicate::Fail)
        .await?;
    let mut failed = 0;
    for info in &resp.info {
        if info.errno == 0 {
            println!("{} {}", op.as_str(), info.path);
        } else {
            failed += 1;
            eprintln!("{} {} failed: errno {}", op.as_str(), info.path, info.errno);
        }
    }
    if let Some(task) = resp.taskid {
        info!(taskid = task, "file operation queued");
    }
    if failed > 0 {
        bail!("{failed} item(s) failed");
    }
    Ok(())
}

async fn upload(gw: Arc<dyn Gateway>, config: &Config, args: UploadArgs) -> anyhow::Result<()> {
    let remote = config.resolve_remote(&args.remote);
    let block_size = match Account::new(Arc::clone(&gw)).block_size().await {
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, "could not read account tier, using the default block size");
            BlockSize::default()
        }
    };
    let upload = UploadOptions {
        policy: args.policy.unwrap_or(config.conflict_policy),
        block_size,
        chunk_workers: args.chunk_workers.unwrap_or(config.chunk_workers).max(1),
        ..Default::default()
    };

    let meta = std::fs::metadata(&args.local)
        .with_context(|| format!("cannot access {}", args.local.display()))?;
    if meta.is_dir() {
        let mut exclude = config.exclude.clone();
        exclude.extend(args.exclude);
        let options = BatchOptions {
            file_workers: args.file_workers.unwrap_or(config.file_workers).max(1),
            exclude,
            upload,
        };
        upload_dir(gw, options, &args.local, &remote).await
    } else {
        let (tx, rx) = mpsc::channel(256);
        let printer = tokio::spawn(print_events(rx));
        let uploader = FileUploader::new(gw, upload).with_events(tx);
        let result = uploader.upload_file(&args.local, &remote).await;
        drop(uploader);
        let _ = printer.await;

        let created = result?;
        println!(
            "uploaded {} -> {} ({})",
            args.local.display(),
            created.path,
            human_bytes(created.size)
        );
        Ok(())
    }
}

async fn upload_dir(
    gw: Arc<dyn Gateway>,
    options: BatchOptions,
    local: &Path,
    remote: &str,
) -> anyhow::Result<()> {
    let mut orchestrator = BatchOrchestrator::new(gw, options);
    let printer = orchestrator.take_events().map(|rx| tokio::spawn(print_events(rx)));

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing files in flight");
            cancel.cancel();
        }
    });

    let result = orchestrator.upload_dir(local, remote).await?;
    drop(orchestrator);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    println!(
        "{} of {} file(s) uploaded",
        result.success_count(),
        result.total_files
    );
    for failure in &result.failures {
        eprintln!(
            "  {}: {} failed: {}",
            failure.remote_path,
            failure.stage.step(),
            failure.error
        );
    }
    if !result.is_complete_success() {
        bail!("{} file(s) failed", result.failure_count());
    }
    Ok(())
}
