//! Command-line catalogue loader.
//!
//! Opens a directory of `*.json` documents, loads them into a registry,
//! resolves every link and reports what is still dangling.
//!
//! # Usage
//!
//! ```bash
//! muster <catalogue_dir> [catalogue] [--date YYYY-MM-DD] [--translations dict.json] [--save]
//! ```
//!
//! Without `catalogue` every stored document is loaded. `MUSTER_LOG` sets the
//! log filter and `MUSTER_LOG_FORMAT` picks `pretty`, `compact` or `json`.
//!
//! # Example
//!
//! ```bash
//! muster ./data "Knights" --date 2024-06-01 --translations ./fr.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use muster_core::{TracingFormat, TracingSetup};
use muster_graph::Translations;
use muster_registry::{BooksDate, CatalogueRegistry, FileSystemStorage};
use muster_schema::CatalogueReference;

const USAGE: &str =
    "Usage: muster <catalogue_dir> [catalogue] [--date YYYY-MM-DD] [--translations FILE] [--save]";

#[derive(Debug)]
struct Args {
    dir: PathBuf,
    catalogue: Option<String>,
    books_date: Option<BooksDate>,
    translations: Option<PathBuf>,
    save: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut dir = None;
        let mut catalogue = None;
        let mut books_date = None;
        let mut translations = None;
        let mut save = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--date" => {
                    let value = args.next().ok_or("--date needs a value")?;
                    books_date = Some(value.parse::<BooksDate>().map_err(|e| e.to_string())?);
                }
                "--translations" => {
                    let value = args.next().ok_or("--translations needs a file")?;
                    translations = Some(PathBuf::from(value));
                }
                "--save" => save = true,
                flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
                _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
                _ if catalogue.is_none() => catalogue = Some(arg),
                _ => return Err(format!("unexpected argument {arg}")),
            }
        }

        Ok(Self {
            dir: dir.ok_or("missing catalogue directory")?,
            catalogue,
            books_date,
            translations,
            save,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let format = std::env::var("MUSTER_LOG_FORMAT")
        .ok()
        .and_then(|format| format.parse::<TracingFormat>().ok())
        .unwrap_or_default();
    TracingSetup::new()
        .with_format(format)
        .with_env_var("MUSTER_LOG")
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(unresolved) => {
            tracing::warn!(unresolved, "finished with unresolved links");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads and reports; returns the number of links left unresolved.
async fn run(args: Args) -> Result<usize, Box<dyn std::error::Error>> {
    if !args.dir.is_dir() {
        return Err(format!("{} is not a directory", args.dir.display()).into());
    }

    let storage = Arc::new(FileSystemStorage::open(&args.dir).await?);
    let mut registry = CatalogueRegistry::new().with_storage(storage);

    if let Some(path) = &args.translations {
        let text = tokio::fs::read_to_string(path).await?;
        let translations: Translations = serde_json::from_str(&text)?;
        tracing::info!(path = %path.display(), entries = translations.len(), "using translations");
        registry.set_translations(Some(translations));
    }

    let loaded = match &args.catalogue {
        Some(key) => {
            let reference = CatalogueReference::by_id(key.as_str()).with_name(key.as_str());
            let id = registry
                .load(reference, args.books_date.as_ref(), false)
                .await?;
            let system = registry
                .catalogue(id)
                .and_then(|catalogue| catalogue.game_system_id())
                .map(str::to_owned);
            if let Some(system) = system {
                registry
                    .load(CatalogueReference::by_id(system), args.books_date.as_ref(), false)
                    .await?;
            }
            registry.all_loaded().count()
        }
        None => {
            let mut progress = |current: usize, total: usize, message: Option<String>| {
                tracing::info!(
                    "[{}/{}] {}",
                    current + 1,
                    total,
                    message.as_deref().unwrap_or_default()
                );
                async {}
            };
            registry.load_all(&mut progress).await?
        }
    };

    for (_, catalogue) in registry.all_loaded() {
        tracing::info!(
            kind = %catalogue.kind(),
            id = catalogue.id(),
            name = catalogue.name(),
            revision = catalogue.revision(),
            nodes = catalogue.node_count(),
            "catalogue"
        );
    }

    for (target_id, links) in registry.unresolved_links() {
        for link in links {
            let link_id = registry.node(*link).and_then(|node| node.id()).unwrap_or("?");
            tracing::warn!(target_id = %target_id, link = link_id, owner = %link.catalogue, "unresolved link");
        }
    }

    if args.save {
        let ids: Vec<String> = registry
            .all_loaded()
            .map(|(_, catalogue)| catalogue.id().to_owned())
            .collect();
        for id in ids {
            registry
                .save(CatalogueReference::by_id(id), args.books_date.as_ref())
                .await?;
        }
    }

    let unresolved = registry.unresolved_count();
    tracing::info!(documents = loaded, unresolved, "done");
    Ok(unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        Args::parse(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn parses_positional_and_flags() {
        let args = parse(&["data", "Knights", "--date", "2024-06-01", "--save"]).unwrap();
        assert_eq!(args.dir, PathBuf::from("data"));
        assert_eq!(args.catalogue.as_deref(), Some("Knights"));
        assert_eq!(args.books_date, Some(BooksDate::new(2024, 6, 1)));
        assert!(args.save);
        assert!(args.translations.is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["data", "--date"]).is_err());
        assert!(parse(&["data", "--date", "June"]).is_err());
        assert!(parse(&["data", "--verbose"]).is_err());
        assert!(parse(&["data", "a", "b"]).is_err());
    }
}
