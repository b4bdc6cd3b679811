//! Subcommand handlers.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use cloudshelf_core::config::Config;
use cloudshelf_core::models::{FileRecord, FileUpload, Registration, SearchQuery};
use cloudshelf_core::utils::{format_bytes, format_timestamp, truncate_string};
use cloudshelf_core::ApiClient;

use crate::Command;

/// Width of the name column in file listings.
const NAME_COLUMN_WIDTH: usize = 48;

pub async fn run(command: Command, client: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Register { username, email } => {
            let password = prompt_password()?;
            let registration = Registration {
                username: username.clone(),
                email,
                password,
            };
            client.register(&registration).await?;
            remember_username(config, username);
            println!("Account created, you are logged in.");
        }
        Command::Login { username } => {
            let username = match username {
                Some(username) => username,
                None => prompt_username(config.last_username.as_deref())?,
            };
            let password = prompt_password()?;
            client.login(&username, &password).await?;
            remember_username(config, username);
            println!("Login successful!");
        }
        Command::Logout => {
            client.logout();
            println!("Logged out.");
        }
        Command::Status => {
            if client.store().state().is_authenticated() {
                match config.last_username.as_deref() {
                    Some(username) => println!("Logged in as {}", username),
                    None => println!("Logged in"),
                }
            } else {
                println!("Not logged in");
            }
        }
        Command::Whoami => {
            let profile = client.profile().await?;
            println!("{} <{}>", profile.username, profile.email);
            if let Some(ref created) = profile.created_at {
                println!("Member since {}", format_timestamp(created));
            }
        }
        Command::Ls { tree } => {
            if tree {
                let listing = client.list_files_and_folders().await?;
                for folder in &listing.folders {
                    println!("{}/ (#{})", folder.folder_name, folder.folder_id);
                    for file in &folder.files {
                        println!("  {}", file_line(file));
                    }
                }
                for file in &listing.independent_files {
                    println!("{}", file_line(file));
                }
                println!("{} file(s) in {} folder(s)", listing.file_count(), listing.folders.len());
            } else {
                let files = client.list_files().await?;
                print_files(&files);
            }
        }
        Command::Upload { path, folder, name } => {
            let content = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = match name {
                Some(name) => name,
                None => local_file_name(&path)?,
            };
            let mut upload = FileUpload::new(file_name, content);
            if let Some(folder) = folder {
                upload = upload.in_folder(folder);
            }
            let uploaded = client.upload_file(&upload).await?;
            match uploaded.file_id {
                Some(id) => println!("Uploaded {} (#{})", uploaded.display_name(&upload.file_name), id),
                None => println!("Uploaded {}", uploaded.display_name(&upload.file_name)),
            }
        }
        Command::Download { file_id, output } => {
            let download = client.download_file(file_id).await?;
            let path = output.unwrap_or_else(|| download_path(download.file_name.as_deref(), file_id));
            std::fs::write(&path, &download.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} to {}", format_bytes(download.bytes.len() as u64), path.display());
        }
        Command::Rm { file_id } => {
            let ack = client.delete_file(file_id).await?;
            println!("{}", ack.text().unwrap_or("File deleted"));
        }
        Command::Search {
            keyword,
            file_type,
            after,
            before,
        } => {
            let query = SearchQuery {
                keyword,
                file_type,
                created_after: after,
                created_before: before,
            };
            let files = client.search_files(&query).await?;
            print_files(&files);
        }
        Command::Versions { file_id } => {
            let versions = client.file_versions(file_id).await?;
            if versions.is_empty() {
                println!("No versions recorded");
            }
            for version in &versions {
                let size = version.file_size.map(format_bytes).unwrap_or_default();
                let created = version.created_at.as_deref().map(format_timestamp).unwrap_or_default();
                println!("v{:<4} {:>10}  {}", version.version_number, size, created);
            }
        }
        Command::Rollback { file_id, version } => {
            let ack = client.rollback(file_id, version).await?;
            println!("{}", ack.text().unwrap_or("Rolled back"));
        }
        Command::Mkdir { name, parent } => {
            let folder = client.create_folder(&name, parent).await?;
            println!("Created folder {} (#{})", folder.folder_name, folder.folder_id);
        }
        Command::Folders => {
            let folders = client.list_folders().await?;
            for folder in &folders {
                match folder.parent_id {
                    Some(parent) => println!("#{:<6} {} (in #{})", folder.folder_id, folder.folder_name, parent),
                    None => println!("#{:<6} {}", folder.folder_id, folder.folder_name),
                }
            }
        }
        Command::Rmdir { folder_id } => {
            let ack = client.delete_folder(folder_id).await?;
            println!("{}", ack.text().unwrap_or("Folder deleted"));
        }
        Command::Share { file_id, user, access } => {
            let ack = client.share_file(file_id, &user, access).await?;
            println!("{}", ack.text().unwrap_or("File shared"));
        }
        Command::Analytics => {
            let analytics = client.usage_analytics().await?;
            if analytics.is_empty() {
                println!("No usage data yet");
            }
            for (name, value) in analytics.iter() {
                println!("{:<24} {}", name, value);
            }
        }
    }
    Ok(())
}

fn file_line(file: &FileRecord) -> String {
    let size = file.file_size.map(format_bytes).unwrap_or_default();
    format!(
        "#{:<6} {:<width$} {:>10}",
        file.file_id,
        truncate_string(file.display_name(), NAME_COLUMN_WIDTH),
        size,
        width = NAME_COLUMN_WIDTH
    )
}

fn print_files(files: &[FileRecord]) {
    if files.is_empty() {
        println!("No files");
        return;
    }
    for file in files {
        println!("{}", file_line(file));
    }
}

fn local_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))
}

/// Default output path for a download: a bare name in the current directory.
fn download_path(suggested: Option<&str>, file_id: i64) -> PathBuf {
    suggested
        .and_then(|name| Path::new(name).file_name())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("file_{}", file_id)))
}

fn remember_username(config: &mut Config, username: String) {
    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => Err(anyhow::anyhow!("Username required")),
        (false, _) => Ok(input.to_string()),
    }
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        return Err(anyhow::anyhow!("Password required"));
    }
    Ok(password)
}
