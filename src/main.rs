use anyhow::Context;
use clap::Parser;
use sashido_s3_adapter::config::Command;
use sashido_s3_adapter::utils::validation::{validate_non_empty_string, Validate};
use sashido_s3_adapter::utils::logger;
use sashido_s3_adapter::{CliConfig, LocationPolicy, StorageProxyAdapter, TomlConfig};
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = TomlConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    if config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let adapter = StorageProxyAdapter::new(config.adapter.clone());

    if let Err(e) = run(&adapter, &config, cli.command).await {
        tracing::error!("❌ {:#}", e);
        let message = e
            .downcast_ref::<sashido_s3_adapter::AdapterError>()
            .map(|err| err.user_friendly_message())
            .unwrap_or_else(|| format!("{:#}", e));
        eprintln!("❌ {}", message);
        std::process::exit(2);
    }

    Ok(())
}

async fn run(
    adapter: &StorageProxyAdapter,
    config: &TomlConfig,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Upload {
            path,
            name,
            content_type,
        } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("cannot derive a file name from the path, pass --name")?,
            };
            let content_type = content_type.unwrap_or_else(|| {
                mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string()
            });

            tracing::info!("Uploading {} ({} bytes) as '{}'", path.display(), data.len(), name);
            adapter.create_file(&name, data, &content_type).await?;
            println!("✅ Uploaded '{}'", name);
        }
        Command::Download { name, output } => {
            let data = adapter.get_file_data(&name).await?;
            match output {
                Some(output) => {
                    tokio::fs::write(&output, &data)
                        .await
                        .with_context(|| format!("failed to write {}", output.display()))?;
                    tracing::info!("📁 Saved {} bytes to {}", data.len(), output.display());
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Delete { name } => {
            let body = adapter.delete_file(&name).await?;
            tracing::debug!("deleteFile response: {}", body);
            println!("✅ Deleted '{}'", name);
        }
        Command::Locate {
            name,
            mount,
            application_id,
        } => {
            let mut files = config.location_config().cloned().unwrap_or_default();
            if let Some(mount) = mount {
                files.mount = mount;
            }
            if let Some(application_id) = application_id {
                files.application_id = application_id;
            }
            if *adapter.location_policy() == LocationPolicy::Proxied {
                validate_non_empty_string("files.mount", &files.mount)?;
                validate_non_empty_string("files.applicationId", &files.application_id)?;
            }

            println!("{}", adapter.get_file_location(&files, &name));
        }
    }

    Ok(())
}
