//! quizzer CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use quizzer::{
    commands::{
        cmd_ask, cmd_db_init, cmd_db_reset, cmd_db_status, cmd_delete_quiz, cmd_generate,
        cmd_init, cmd_list_documents, cmd_list_quizzes, cmd_remove_documents, cmd_results,
        cmd_show_quiz, cmd_take, cmd_upload, open_chunk_store, open_sheets, print_ask_result,
        print_db_status, print_documents, print_init_report, print_quiz, print_quizzes,
        print_remove_report, print_results, print_take_outcome, print_upload_report,
        InitOptions, ResultFilter,
    },
    config::Config,
    documents::IngestOptions,
    error::{Error, Result},
    llm::{create_completer, create_judge, Completer},
    progress::LogWriterFactory,
    quiz::{GeneratorSettings, QuizGenerator, QuizRepository, RepositorySettings},
    results::ResultStore,
    session::{QuizSession, SessionOptions},
    validation::AnswerValidator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "quizzer")]
#[command(version, about = "Generate and take quizzes grounded in your documents", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize quizzer configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Upload a document (txt, md, pdf; docx is not supported yet)
    Upload {
        /// Path to the document
        file: PathBuf,

        /// Maximum characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared between neighbouring chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// List uploaded documents
    Documents,

    /// Remove documents and their chunks
    Remove {
        /// Document IDs to remove (use 'quizzer documents' to list)
        #[arg(required = true)]
        document_ids: Vec<String>,
    },

    /// Ask a question about a document
    Ask {
        /// Document ID or filename
        document: String,

        /// The question
        question: String,

        /// Number of passages to retrieve
        #[arg(short)]
        k: Option<usize>,
    },

    /// Generate a quiz from a document
    Generate {
        /// Document ID
        document_id: String,

        /// Number of questions
        #[arg(short = 'n', long)]
        questions: Option<usize>,
    },

    /// List quizzes
    Quizzes {
        /// Only quizzes for this document ID
        #[arg(long)]
        document: Option<String>,
    },

    /// Show a quiz with its answers
    ShowQuiz {
        quiz_id: String,
    },

    /// Delete a quiz
    DeleteQuiz {
        quiz_id: String,
    },

    /// Take a quiz interactively
    Take {
        quiz_id: String,

        /// Name recorded with the result
        #[arg(short, long, env = "QUIZZER_USER")]
        user: String,

        /// Grade answers without recording a result
        #[arg(long)]
        practice: bool,
    },

    /// Show recorded results, most recent first
    Results {
        /// Only results for this user
        #[arg(long, conflicts_with_all = ["document", "quiz"])]
        user: Option<String>,

        /// Only results for this document ID
        #[arg(long, conflicts_with = "quiz")]
        document: Option<String>,

        /// Only results for this quiz ID
        #[arg(long)]
        quiz: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Manage the vector collection and local database
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database management actions
#[derive(Subcommand)]
enum DbAction {
    /// Create the Qdrant collection and local schema
    Init,

    /// Show collection and worksheet status
    Status,

    /// Delete all documents, quizzes and results
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Init and completions run without an existing config
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force, cli.json).await;
    }
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "quizzer", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Upload {
            file,
            chunk_size,
            chunk_overlap,
        } => {
            let chunks = open_chunk_store(&config).await?;
            let options = IngestOptions {
                chunk_size,
                chunk_overlap,
            };
            let report = cmd_upload(&chunks, &file, options).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_upload_report(&report);
            }
        }

        Commands::Documents => {
            let chunks = open_chunk_store(&config).await?;
            let documents = cmd_list_documents(&chunks).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else {
                print_documents(&documents);
            }
        }

        Commands::Remove { document_ids } => {
            let chunks = open_chunk_store(&config).await?;
            let report = cmd_remove_documents(&chunks, &document_ids).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_remove_report(&report);
            }
        }

        Commands::Ask {
            document,
            question,
            k,
        } => {
            let chunks = open_chunk_store(&config).await?;
            let completer = create_completer(&config)?;
            let result =
                cmd_ask(&config, &chunks, completer.as_ref(), &document, &question, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_ask_result(&result);
            }
        }

        Commands::Generate {
            document_id,
            questions,
        } => {
            let chunks = open_chunk_store(&config).await?;
            let completer: Arc<dyn Completer> = Arc::from(create_completer(&config)?);
            let generator = QuizGenerator::new(completer, GeneratorSettings::from_config(&config));
            let repository = open_repository(&config).await?;

            let quiz = cmd_generate(
                &config,
                &chunks,
                &generator,
                &repository,
                &document_id,
                questions,
            )
            .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quiz)?);
            } else {
                println!("✓ Created quiz {}", quiz.quiz_id);
                print_quiz(&quiz);
            }
        }

        Commands::Quizzes { document } => {
            let repository = open_repository(&config).await?;
            let quizzes = cmd_list_quizzes(&repository, document.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quizzes)?);
            } else {
                print_quizzes(&quizzes);
            }
        }

        Commands::ShowQuiz { quiz_id } => {
            let repository = open_repository(&config).await?;
            let quiz = cmd_show_quiz(&repository, &quiz_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quiz)?);
            } else {
                print_quiz(&quiz);
            }
        }

        Commands::DeleteQuiz { quiz_id } => {
            let repository = open_repository(&config).await?;
            cmd_delete_quiz(&repository, &quiz_id).await?;
            if json {
                println!(r#"{{"status": "ok", "deleted": "{}"}}"#, quiz_id);
            } else {
                println!("✓ Deleted quiz {}", quiz_id);
            }
        }

        Commands::Take {
            quiz_id,
            user,
            practice,
        } => {
            handle_take(&config, &quiz_id, user, practice, json).await?;
        }

        Commands::Results {
            user,
            document,
            quiz,
        } => {
            let store = ResultStore::open(open_sheets(&config).await?).await?;
            let filter = ResultFilter {
                username: user,
                document_id: document,
                quiz_id: quiz,
            };
            let results = cmd_results(&store, filter).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }

        Commands::Db { action } => {
            handle_db_action(&config, action, json).await?;
        }
    }

    Ok(())
}

async fn handle_init(config: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // A .toml path names the config file; any other path names its directory
    let (base_dir, config_path) = match config {
        Some(path) if path.extension().map_or(false, |e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path)
        }
        Some(dir) => (dir.clone(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    };

    let report = cmd_init(InitOptions {
        base_dir,
        config_path,
        force,
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_init_report(&report);
    }
    Ok(())
}

async fn handle_take(
    config: &Config,
    quiz_id: &str,
    username: String,
    practice: bool,
    json: bool,
) -> Result<()> {
    let sheets = open_sheets(config).await?;
    let repository =
        QuizRepository::open(sheets.clone(), RepositorySettings::from_config(config)?).await?;
    let quiz = repository.get(quiz_id).await?;

    // Quizzes outlive their documents; the filename is informational only
    let chunks = open_chunk_store(config).await?;
    let filename = chunks
        .get_document(&quiz.document_id)
        .await?
        .map(|d| d.filename)
        .unwrap_or_default();

    let judge: Arc<dyn Completer> = Arc::from(create_judge(config)?);
    let mut session = QuizSession::new(
        quiz,
        AnswerValidator::new(judge),
        ResultStore::open(sheets).await?,
        SessionOptions {
            username,
            filename,
            offset: config.session.offset()?,
            practice,
        },
    )?;

    let stdin = std::io::stdin();
    let outcome = cmd_take(&mut session, stdin.lock(), std::io::stdout()).await?;
    let Some(outcome) = outcome else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.result)?);
    } else {
        print_take_outcome(&outcome, practice);
    }
    Ok(())
}

async fn handle_db_action(config: &Config, action: DbAction, json: bool) -> Result<()> {
    match action {
        DbAction::Init => {
            cmd_db_init(config).await?;
            if json {
                println!(r#"{{"status": "ok", "message": "Collection and database initialized"}}"#);
            } else {
                println!("✓ Qdrant collection and local database initialized");
            }
        }
        DbAction::Status => {
            let status = cmd_db_status(config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_db_status(&status);
            }
        }
        DbAction::Reset { yes } => {
            if !yes {
                eprintln!("⚠️  This will delete ALL documents, quizzes and results!");
                eprintln!("Run with --yes to confirm.");
                std::process::exit(1);
            }
            cmd_db_reset(config).await?;
            if json {
                println!(r#"{{"status": "ok", "message": "All data reset"}}"#);
            } else {
                println!("✓ Collection recreated and worksheets cleared");
            }
        }
    }

    Ok(())
}

async fn open_repository(config: &Config) -> Result<QuizRepository> {
    QuizRepository::open(
        open_sheets(config).await?,
        RepositorySettings::from_config(config)?,
    )
    .await
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        debug!("Config file not found: {}", config_path.display());
        return Err(Error::NotInitialized);
    }

    Config::load(&config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_upload_help_lists_supported_formats() {
        let cli = Cli::command();
        let upload = cli.find_subcommand("upload").unwrap();
        let about = upload.get_about().unwrap().to_string();
        assert!(about.contains("pdf"));
        assert!(about.contains("docx is not supported"));
    }
}
