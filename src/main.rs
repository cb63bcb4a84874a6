use anyhow::Context;
use clap::Parser;
use table_export::adapters::verify::verifier_for;
use table_export::utils::logger;
use table_export::{run_export, CliArgs, DuckDbConnector, EtlError, ExportConfig, ExportResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    logger::init_cli_logger(args.verbose, args.log_format);
    tracing::info!("Starting table-export");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    tracing::info!("✅ Configuration loaded and validated successfully");

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - the engine will not be opened");
        display_plan(&config);
        return Ok(());
    }

    // The engine blocks; keep it off the async workers.
    let pipeline_config = config.clone();
    let outcome =
        tokio::task::spawn_blocking(move || run_export(&DuckDbConnector, &pipeline_config))
            .await
            .context("export pipeline task did not complete")?;

    let result = match outcome {
        Ok(result) => result,
        // already logged with its stage by the pipeline
        Err(e) => fail(&e),
    };

    if args.verify {
        verify_destination(&config, &result).await;
    }

    tracing::info!("✅ Export completed successfully!");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("✅ Export completed successfully!");
        println!("📁 Output saved to: {}", result.destination);
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> table_export::Result<ExportConfig> {
    let raw = args.resolve()?;
    if args.verbose {
        tracing::debug!("Resolved config: {:?}", raw);
    }
    raw.into_export_config()
}

async fn verify_destination(config: &ExportConfig, result: &ExportResult) {
    let Some(verifier) = verifier_for(config).await else {
        tracing::info!(
            "Verification not available for {} destinations, skipping",
            config.destination.scheme.as_str()
        );
        return;
    };

    match verifier.verify(&result.destination).await {
        Ok(Some(size)) => tracing::info!("🔎 Verified {} ({} bytes)", result.destination, size),
        Ok(None) => tracing::info!("🔎 Verified {}", result.destination),
        Err(e) => fail(&e),
    }
}

/// Reports the failure on stderr and exits with the code for its severity.
fn fail(e: &EtlError) -> ! {
    tracing::debug!(
        "Failure category {:?}, severity {:?}",
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.report_line());

    // a recoverable error never reaches here on its own, but the exit must stay non-zero
    std::process::exit(e.severity().exit_code().max(1));
}

fn display_plan(config: &ExportConfig) {
    let secret = config.secret_record();
    let attachment = config.attachment();

    println!("📋 Export Plan:");
    println!("  Local store: {}", config.store_path.display());
    println!(
        "  Secret: {} (region {}, key {})",
        secret.name, secret.region, secret.access_key_id
    );
    if let Some(endpoint) = &secret.endpoint {
        println!("  Storage endpoint: {}", endpoint);
    }
    println!(
        "  Remote database: {} as '{}' (read-only)",
        attachment.kind.attach_type(),
        attachment.alias
    );
    println!("  Source table: {}", config.source);
    println!("  Destination: {}", config.destination_path());
    println!(
        "  Format: {} / {}",
        config.format.extension(),
        config.compression.codec_name(config.format)
    );
    if let Some(row_group_size) = config.row_group_size {
        println!("  Row group size: {}", row_group_size);
    }
    println!();
}
