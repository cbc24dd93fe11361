//! `formcraft generate`

use super::{open_local_store, open_remote_store};
use crate::config::Config;
use crate::error::{FormcraftError, Result};
use crate::gateway::{GenerationRequest, SchemaGateway};
use crate::orchestrator::{EntryPoint, GenerationOptions, GenerationOrchestrator};
use crate::providers::create_provider;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Generate a schema for `image` and record the attempt in local history
///
/// With `remote`, a successful result is also saved to the remote store.
/// The schema is printed to stdout unless `output` is given.
pub async fn run_generate(
    config: Config,
    image: PathBuf,
    prompt: Option<String>,
    remote: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = tokio::fs::read(&image).await.map_err(|e| {
        FormcraftError::Validation(format!("Cannot read image {}: {}", image.display(), e))
    })?;

    let gateway = Arc::new(SchemaGateway::new(create_provider(&config.provider)?));
    let mut orchestrator =
        GenerationOrchestrator::new(gateway).with_local(open_local_store(&config)?);

    let mut options = GenerationOptions::new(EntryPoint::Cli);
    if remote {
        orchestrator = orchestrator.with_remote(Arc::new(open_remote_store(&config)?));
        options = options.with_remote_save(file_name(&image));
    }

    let request = GenerationRequest::new(bytes, prompt.unwrap_or_default());
    let outcome = orchestrator.run(request, options).await?;
    let rendered = outcome.schema.to_pretty_string();

    match output {
        Some(path) => {
            tokio::fs::write(&path, format!("{}\n", rendered)).await?;
            eprintln!(
                "{} {}",
                "Schema written to".green(),
                path.display().to_string().cyan()
            );
        }
        None => println!("{}", rendered),
    }

    eprintln!(
        "Generated in {} ms with {} top-level fields",
        outcome.processing_time_ms,
        outcome.schema.field_names().len()
    );
    if let Some(id) = &outcome.local_id {
        eprintln!("Local history: {}", id.cyan());
    }
    if remote {
        match &outcome.history_id {
            Some(id) => eprintln!("Remote history: {}", id.cyan()),
            None => eprintln!("{}", "Remote history save failed; see logs".yellow()),
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{temp_dir, test_config};

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/mock/login.png")), "login.png");
        assert_eq!(file_name(Path::new("/")), "image");
    }

    #[tokio::test]
    async fn test_missing_image_is_validation_error() {
        let dir = temp_dir();
        let config = test_config(&dir);

        let err = run_generate(config, dir.path().join("nope.png"), None, false, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormcraftError>(),
            Some(FormcraftError::Validation(_))
        ));
    }
}
