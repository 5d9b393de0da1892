//! CLI command definitions and handlers

use clap::{Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::client::Translator;
use crate::core::document::SUPPORTED_EXTENSIONS;
use crate::core::glossary::GlossaryEntries;
use crate::core::models::{DocumentHandle, GlossaryRef};
use crate::core::options::{Formality, TranslateDocumentOptions, TranslateTextOptions};

/// Formality as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormalityArg {
    /// Server default
    Default,
    /// Informal
    Less,
    /// Formal
    More,
    /// Informal where supported
    PreferLess,
    /// Formal where supported
    PreferMore,
}

impl From<FormalityArg> for Formality {
    fn from(arg: FormalityArg) -> Self {
        match arg {
            FormalityArg::Default => Formality::Default,
            FormalityArg::Less => Formality::Less,
            FormalityArg::More => Formality::More,
            FormalityArg::PreferLess => Formality::PreferLess,
            FormalityArg::PreferMore => Formality::PreferMore,
        }
    }
}

/// Commands for DeepL Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate text given as arguments
    Text {
        /// Texts to translate
        #[arg(required = true)]
        text: Vec<String>,

        /// Source language (auto-detect if not specified)
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language
        #[arg(short, long)]
        target_lang: String,

        /// Formality of the translation
        #[arg(long, value_enum)]
        formality: Option<FormalityArg>,

        /// Glossary ID
        #[arg(long)]
        glossary: Option<String>,
    },

    /// Translate a document, or every supported document in a directory
    Document {
        /// Input file or directory
        #[arg(short, long)]
        file: PathBuf,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language (auto-detect if not specified)
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language
        #[arg(short, long)]
        target_lang: String,

        /// Formality of the translation
        #[arg(long, value_enum)]
        formality: Option<FormalityArg>,

        /// Glossary ID
        #[arg(long)]
        glossary: Option<String>,

        /// Output file type, e.g. docx for a PDF input
        #[arg(long)]
        output_format: Option<String>,
    },

    /// Show the status of an uploaded document
    Status {
        /// Document ID printed after upload
        #[arg(long)]
        document_id: String,

        /// Document key printed after upload
        #[arg(long)]
        document_key: String,
    },

    /// Download a translated document
    Download {
        /// Document ID printed after upload
        #[arg(long)]
        document_id: String,

        /// Document key printed after upload
        #[arg(long)]
        document_key: String,

        /// Output file (must not exist)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show account usage
    Usage,

    /// List supported languages
    Languages {
        /// List target instead of source languages
        #[arg(long)]
        target: bool,
    },

    /// Manage glossaries
    Glossaries {
        /// Glossary operation
        #[command(subcommand)]
        action: GlossaryAction,
    },
}

/// Glossary subcommands
#[derive(Subcommand, Debug)]
pub enum GlossaryAction {
    /// List all glossaries
    List,

    /// Show glossary details
    Show {
        /// Glossary ID
        glossary_id: String,
    },

    /// Print glossary entries as TSV
    Entries {
        /// Glossary ID
        glossary_id: String,
    },

    /// Create a glossary from a TSV file
    Create {
        /// Glossary name
        #[arg(long)]
        name: String,

        /// Language of the source terms
        #[arg(long)]
        source_lang: String,

        /// Language of the target terms
        #[arg(long)]
        target_lang: String,

        /// File with one `source<TAB>target` entry per line
        #[arg(long)]
        entries: PathBuf,
    },

    /// Delete a glossary
    Delete {
        /// Glossary ID
        glossary_id: String,
    },
}

/// Dispatch a parsed command
pub async fn run(translator: &Translator, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Text {
            text,
            source_lang,
            target_lang,
            formality,
            glossary,
        } => {
            let options = TranslateTextOptions {
                formality: formality.map(Formality::from),
                glossary: glossary.map(GlossaryRef::from),
                ..Default::default()
            };
            handle_text(translator, &text, source_lang.as_deref(), &target_lang, &options).await
        }
        Commands::Document {
            file,
            output,
            source_lang,
            target_lang,
            formality,
            glossary,
            output_format,
        } => {
            let options = TranslateDocumentOptions {
                formality: formality.map(Formality::from),
                glossary: glossary.map(GlossaryRef::from),
                output_format,
            };
            handle_document(translator, file, output, source_lang.as_deref(), &target_lang, &options)
                .await
        }
        Commands::Status {
            document_id,
            document_key,
        } => handle_status(translator, DocumentHandle::from_pair(document_id, document_key)).await,
        Commands::Download {
            document_id,
            document_key,
            output,
        } => {
            handle_download(translator, DocumentHandle::from_pair(document_id, document_key), &output)
                .await
        }
        Commands::Usage => handle_usage(translator).await,
        Commands::Languages { target } => handle_languages(translator, target).await,
        Commands::Glossaries { action } => handle_glossaries(translator, action).await,
    }
}

/// Handle text translation command
pub async fn handle_text(
    translator: &Translator,
    texts: &[String],
    source_lang: Option<&str>,
    target_lang: &str,
    options: &TranslateTextOptions,
) -> anyhow::Result<()> {
    let results = translator
        .translate_text(texts, source_lang, target_lang, options)
        .await?;

    for result in results {
        info!("Detected source language: {}", result.detected_source_lang);
        println!("{}", result);
    }
    Ok(())
}

/// Handle document translation command
pub async fn handle_document(
    translator: &Translator,
    file: PathBuf,
    output: Option<PathBuf>,
    source_lang: Option<&str>,
    target_lang: &str,
    options: &TranslateDocumentOptions,
) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let output = output.unwrap_or_else(|| default_output(&file, target_lang));

    info!("Starting document translation");
    info!("Input: {}", file.display());
    info!("Output: {}", output.display());
    info!("Target language: {}", target_lang);

    let jobs = if file.is_dir() {
        find_documents(&file)
            .into_iter()
            .map(|input| {
                let relative = input.strip_prefix(&file).unwrap_or(&input).to_path_buf();
                (input, output.join(relative))
            })
            .collect()
    } else {
        vec![(file, output)]
    };

    if jobs.is_empty() {
        anyhow::bail!("No supported documents found");
    }

    let pb = create_spinner()?;
    let mut processed = 0;
    let mut failed = 0;

    for (input, target) in jobs {
        pb.set_message(format!("Translating: {}", input.display()));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match translator
            .translate_document(&input, &target, source_lang, target_lang, options)
            .await
        {
            Ok(status) => {
                processed += 1;
                info!(
                    "Translated {} ({} characters billed)",
                    input.display(),
                    status.billed_characters.unwrap_or_default()
                );
            }
            Err(e) => {
                failed += 1;
                pb.println(format!("Error processing {}: {}", input.display(), e));
                if let Some(handle) = e.document_handle() {
                    pb.println(format!(
                        "   Recover with: --document-id {} --document-key {}",
                        handle.document_id, handle.document_key
                    ));
                }
            }
        }
    }

    pb.finish_with_message("Completed");

    let duration = start_time.elapsed();
    info!(
        "Completed: {} processed, {} failed in {:?}",
        processed, failed, duration
    );

    println!("\n✅ Document translation completed!");
    println!("   Processed: {}", processed);
    println!("   Failed: {}", failed);
    println!("   Time: {:?}", duration);

    if failed > 0 {
        anyhow::bail!("{} document(s) failed", failed);
    }
    Ok(())
}

/// Handle status command
pub async fn handle_status(translator: &Translator, handle: DocumentHandle) -> anyhow::Result<()> {
    let status = translator.get_document_status(&handle).await?;

    println!("{}", handle);
    println!("   Status: {}", status.status);
    if let Some(secs) = status.seconds_remaining {
        println!("   Seconds remaining: {}", secs);
    }
    if let Some(billed) = status.billed_characters {
        println!("   Billed characters: {}", billed);
    }
    if let Some(message) = status.error_message {
        println!("   Error: {}", message);
    }
    Ok(())
}

/// Handle download command
pub async fn handle_download(
    translator: &Translator,
    handle: DocumentHandle,
    output: &Path,
) -> anyhow::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .await?;

    if let Err(e) = translator.download_document(&handle, &mut file).await {
        drop(file);
        let _ = tokio::fs::remove_file(output).await;
        return Err(e.into());
    }

    println!("✅ Downloaded to {}", output.display());
    Ok(())
}

/// Handle usage command
pub async fn handle_usage(translator: &Translator) -> anyhow::Result<()> {
    let usage = translator.get_usage().await?;
    println!("{}", usage);
    if usage.any_limit_reached() {
        println!("\n⚠️  A usage limit has been reached");
    }
    Ok(())
}

/// Handle languages command
pub async fn handle_languages(translator: &Translator, target: bool) -> anyhow::Result<()> {
    let languages = if target {
        translator.get_target_languages().await?
    } else {
        translator.get_source_languages().await?
    };

    for language in languages {
        let formality = match language.supports_formality {
            Some(true) => " (supports formality)",
            _ => "",
        };
        println!("{:<8} {}{}", language.code, language.name, formality);
    }
    Ok(())
}

/// Handle glossary commands
pub async fn handle_glossaries(translator: &Translator, action: GlossaryAction) -> anyhow::Result<()> {
    match action {
        GlossaryAction::List => {
            for glossary in translator.list_glossaries().await? {
                println!(
                    "{}  {} ({} -> {}, {} entries)",
                    glossary.glossary_id,
                    glossary.name,
                    glossary.source_lang,
                    glossary.target_lang,
                    glossary.entry_count
                );
            }
        }
        GlossaryAction::Show { glossary_id } => {
            let glossary = translator.get_glossary(&GlossaryRef::from(glossary_id)).await?;
            println!("{}", serde_json::to_string_pretty(&glossary)?);
        }
        GlossaryAction::Entries { glossary_id } => {
            let entries = translator
                .get_glossary_entries(&GlossaryRef::from(glossary_id))
                .await?;
            println!("{}", entries.to_tsv());
        }
        GlossaryAction::Create {
            name,
            source_lang,
            target_lang,
            entries,
        } => {
            let content = tokio::fs::read_to_string(&entries).await?;
            let entries = GlossaryEntries::from_tsv(&content)?;
            let glossary = translator
                .create_glossary(&name, &source_lang, &target_lang, &entries)
                .await?;
            println!("✅ Created glossary {} ({} entries)", glossary.glossary_id, glossary.entry_count);
        }
        GlossaryAction::Delete { glossary_id } => {
            translator
                .delete_glossary(&GlossaryRef::from(glossary_id.as_str()))
                .await?;
            println!("✅ Deleted glossary {}", glossary_id);
        }
    }
    Ok(())
}

fn create_spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// `report.docx` translated to DE becomes `report_de.docx`; directories get a `translated` subdirectory
fn default_output(input: &Path, target_lang: &str) -> PathBuf {
    if input.is_dir() {
        return input.join("translated");
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, target_lang.to_lowercase(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, target_lang.to_lowercase()),
    };
    input.with_file_name(name)
}

/// Supported documents below `dir`, skipping an existing `translated` output tree
fn find_documents(dir: &Path) -> Vec<PathBuf> {
    let skip = dir.join("translated");
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.path() != skip)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect()
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
